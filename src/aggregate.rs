use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;

use crate::{
    accumulate::{Accumulator, AccumulateError, Averaged},
    catalog::{list_patterns, Catalog, CatalogError},
    grid::{Region, ScanGrid},
    pattern::{Pattern, PatternError},
    CancelToken,
};

#[derive(thiserror::Error, Debug)]
pub enum AggregateError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Accumulate(#[from] AccumulateError),
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("aggregation cancelled")]
    Cancelled,
}

/// What to do when a resolved index has no matching image file
///
/// `Skip` is the historical behavior of the acquisition pipeline: the
/// gap is logged and the average undercounts. `Fail` aborts the
/// affected sample instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    #[default]
    Skip,
    Fail,
}

/// A labelled sub-region of the scan grid
#[derive(Debug, Clone)]
pub struct Sample {
    pub id: String,
    pub region: Region,
}
impl Sample {
    pub fn new<S: Into<String>>(id: S, region: Region) -> Self {
        Self {
            id: id.into(),
            region,
        }
    }
}

/// Files written for one successfully averaged sample
#[derive(Debug)]
pub struct SampleReport {
    pub id: String,
    pub image: PathBuf,
    pub manifest: PathBuf,
    pub contributors: usize,
}

/// Per-sample result of a grid aggregation batch
///
/// Samples are isolated: one failing sample never aborts the others.
#[derive(Debug)]
pub struct SampleOutcome {
    pub id: String,
    pub result: Result<SampleReport, AggregateError>,
}

/// Multi-sample grid aggregation driver
///
/// For every sample, resolves its region to the covering image indices,
/// sums the located patterns, and writes one averaged TIFF plus one
/// provenance manifest under `sample_{id}/`.
pub struct GridAverage {
    grid: ScanGrid,
    samples: Vec<Sample>,
    input: PathBuf,
    output: PathBuf,
    experiment: String,
    missing: MissingPolicy,
    cancel: CancelToken,
}
impl GridAverage {
    pub fn new(grid: ScanGrid) -> Self {
        Self {
            grid,
            samples: Vec::new(),
            input: PathBuf::from("."),
            output: PathBuf::from("."),
            experiment: String::new(),
            missing: MissingPolicy::default(),
            cancel: CancelToken::new(),
        }
    }
    pub fn samples(self, samples: Vec<Sample>) -> Self {
        Self { samples, ..self }
    }
    pub fn input_dir<P: Into<PathBuf>>(self, input: P) -> Self {
        Self {
            input: input.into(),
            ..self
        }
    }
    pub fn output_root<P: Into<PathBuf>>(self, output: P) -> Self {
        Self {
            output: output.into(),
            ..self
        }
    }
    pub fn experiment<S: Into<String>>(self, experiment: S) -> Self {
        Self {
            experiment: experiment.into(),
            ..self
        }
    }
    pub fn missing(self, missing: MissingPolicy) -> Self {
        Self { missing, ..self }
    }
    pub fn cancel_token(self, cancel: CancelToken) -> Self {
        Self { cancel, ..self }
    }

    /// Runs every sample, in parallel, against one shared listing
    ///
    /// Fails outright only when the input directory cannot be listed;
    /// anything after that is reported per sample.
    pub fn run(&self) -> Result<Vec<SampleOutcome>, AggregateError> {
        let listing = list_patterns(&self.input)?;
        log::info!(
            "{} diffraction patterns under '{}'",
            listing.len(),
            self.input.display()
        );
        let catalog = Catalog::index(&listing);
        let pb = ProgressBar::new(self.samples.len() as u64);
        Ok(self
            .samples
            .par_iter()
            .progress_with(pb)
            .map(|sample| SampleOutcome {
                id: sample.id.clone(),
                result: self.average_sample(sample, &catalog),
            })
            .collect())
    }

    fn average_sample(
        &self,
        sample: &Sample,
        catalog: &Catalog,
    ) -> Result<SampleReport, AggregateError> {
        let mut accumulator: Option<Accumulator> = None;
        for index in sample.region.indices(&self.grid) {
            if self.cancel.is_cancelled() {
                return Err(AggregateError::Cancelled);
            }
            let path = match catalog.locate(index) {
                Ok(path) => path,
                Err(err @ CatalogError::Missing { .. }) => match self.missing {
                    MissingPolicy::Skip => {
                        log::warn!("sample {}: {err}, skipping", sample.id);
                        continue;
                    }
                    MissingPolicy::Fail => return Err(err.into()),
                },
                Err(err) => return Err(err.into()),
            };
            let pattern = Pattern::read(path)?;
            accumulator
                .get_or_insert_with(|| Accumulator::like(&pattern))
                .add(&pattern, path)?;
        }
        let averaged = accumulator
            .ok_or(AccumulateError::Empty)?
            .finalize()?;
        self.write_sample(sample, averaged)
    }

    fn write_sample(
        &self,
        sample: &Sample,
        averaged: Averaged,
    ) -> Result<SampleReport, AggregateError> {
        let dir = self.output.join(format!("sample_{}", sample.id));
        create_output_dir(&dir)?;

        let image = dir.join(format!("{}_summed1.tiff", self.experiment));
        averaged.pattern.write(&image)?;
        log::info!("written summed image '{}'", image.display());

        let manifest = dir.join(format!("sample_{}_image_list.txt", sample.id));
        write_manifest(&manifest, &sample.id, &averaged.sources)?;
        log::info!("written image list '{}'", manifest.display());

        Ok(SampleReport {
            id: sample.id.clone(),
            image,
            manifest,
            contributors: averaged.sources.len(),
        })
    }
}

/// Whole-series averager, for runs with no spatial sub-selection
///
/// Same accumulate/finalize contract as the grid driver, but over the
/// entire directory listing. Writes the averaged TIFF only; provenance
/// comes back to the caller with the report.
pub struct SeriesAverage {
    input: PathBuf,
    output: PathBuf,
    experiment: String,
    cancel: CancelToken,
}

#[derive(Debug)]
pub struct SeriesReport {
    pub image: PathBuf,
    pub averaged: Averaged,
}

impl SeriesAverage {
    pub fn new() -> Self {
        Self {
            input: PathBuf::from("."),
            output: PathBuf::from("."),
            experiment: String::new(),
            cancel: CancelToken::new(),
        }
    }
    pub fn input_dir<P: Into<PathBuf>>(self, input: P) -> Self {
        Self {
            input: input.into(),
            ..self
        }
    }
    pub fn output_root<P: Into<PathBuf>>(self, output: P) -> Self {
        Self {
            output: output.into(),
            ..self
        }
    }
    pub fn experiment<S: Into<String>>(self, experiment: S) -> Self {
        Self {
            experiment: experiment.into(),
            ..self
        }
    }
    pub fn cancel_token(self, cancel: CancelToken) -> Self {
        Self { cancel, ..self }
    }

    pub fn run(&self) -> Result<SeriesReport, AggregateError> {
        let listing = list_patterns(&self.input)?;
        log::info!(
            "{} diffraction patterns under '{}'",
            listing.len(),
            self.input.display()
        );
        let averaged = average_series(&listing, &self.cancel)?;

        create_output_dir(&self.output)?;
        let image = self.output.join(format!("{}_summed1.tiff", self.experiment));
        averaged.pattern.write(&image)?;
        log::info!("written summed image '{}'", image.display());
        Ok(SeriesReport { image, averaged })
    }
}

impl Default for SeriesAverage {
    fn default() -> Self {
        Self::new()
    }
}

/// Averages an explicit list of image paths
pub fn average_series(
    paths: &[PathBuf],
    cancel: &CancelToken,
) -> Result<Averaged, AggregateError> {
    let mut accumulator: Option<Accumulator> = None;
    for path in paths {
        if cancel.is_cancelled() {
            return Err(AggregateError::Cancelled);
        }
        let pattern = Pattern::read(path)?;
        accumulator
            .get_or_insert_with(|| Accumulator::like(&pattern))
            .add(&pattern, path)?;
    }
    Ok(accumulator.ok_or(AccumulateError::Empty)?.finalize()?)
}

/// Idempotent: an already-existing output directory is not an error
fn create_output_dir(dir: &Path) -> Result<(), AggregateError> {
    let existed = dir.is_dir();
    fs::create_dir_all(dir).map_err(|source| AggregateError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    if existed {
        log::debug!("folder '{}' already exists", dir.display());
    } else {
        log::info!("created folder '{}'", dir.display());
    }
    Ok(())
}

fn write_manifest(path: &Path, id: &str, sources: &[PathBuf]) -> Result<(), AggregateError> {
    let io_err = |source| AggregateError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(path).map_err(io_err)?;
    writeln!(
        file,
        "The summed tiff image for sample {id} was created from the average intensity of the following diffraction pattern images... "
    )
    .map_err(io_err)?;
    for source in sources {
        writeln!(file, "{}", source.display()).map_err(io_err)?;
    }
    Ok(())
}
