use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    aggregate::Sample,
    grid::{GridError, Region, ScanGrid},
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid experiment number range {start}..={end} step {step}")]
    Numbers { start: u64, end: u64, step: u64 },
    #[error(
        "sample lists disagree: {ids} ids, {starts} start points, {ends} end points"
    )]
    LengthMismatch {
        ids: usize,
        starts: usize,
        ends: usize,
    },
    #[error("sample {id}: {source}")]
    Sample { id: String, source: GridError },
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("configuration section [{section}] is required for this operation")]
    MissingSection { section: &'static str },
}

/// Experiment number range, expanded to `start..=end` by `step`
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct Experiment {
    pub start: u64,
    pub end: u64,
    pub step: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Paths {
    /// Directory of the acquired image series; may contain an
    /// `{experiment_number}` placeholder
    pub input: String,
    /// Root for summed images and manifests; may contain an
    /// `{experiment_number}` placeholder
    pub output: String,
    /// Background reference image for the subtraction pass
    pub reference: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GridInfo {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub sample_ids: Vec<String>,
    #[serde(default)]
    pub start_points: Vec<(u32, u32)>,
    #[serde(default)]
    pub end_points: Vec<(u32, u32)>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct Intensity {
    /// Intensity maximum for rendering summed patterns
    pub max: i32,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct Subtract {
    /// Scale applied to the reference before subtraction
    pub multiplier: i32,
}

/// Typed run configuration, validated once at load time
///
/// Replaces the free-form mapping the acquisition scripts used to
/// carry: every key is named, typed and checked before any image I/O
/// happens.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub experiment: Experiment,
    pub paths: Paths,
    pub grid: GridInfo,
    pub intensity: Option<Intensity>,
    pub subtract: Option<Subtract>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.experiment_numbers()?;
        let grid = self.scan_grid()?;
        self.samples(&grid)?;
        Ok(())
    }

    pub fn experiment_numbers(&self) -> Result<Vec<u64>, ConfigError> {
        let Experiment { start, end, step } = self.experiment;
        if step == 0 || start > end {
            return Err(ConfigError::Numbers { start, end, step });
        }
        Ok((start..=end).step_by(step as usize).collect())
    }

    pub fn scan_grid(&self) -> Result<ScanGrid, ConfigError> {
        Ok(ScanGrid::new(self.grid.width, self.grid.height)?)
    }

    /// The labelled sample regions, index-aligned across the three lists
    pub fn samples(&self, grid: &ScanGrid) -> Result<Vec<Sample>, ConfigError> {
        let GridInfo {
            sample_ids,
            start_points,
            end_points,
            ..
        } = &self.grid;
        if sample_ids.len() != start_points.len() || sample_ids.len() != end_points.len() {
            return Err(ConfigError::LengthMismatch {
                ids: sample_ids.len(),
                starts: start_points.len(),
                ends: end_points.len(),
            });
        }
        sample_ids
            .iter()
            .zip(start_points.iter().zip(end_points))
            .map(|(id, (&start, &end))| {
                let region = Region::new(start, end, grid).map_err(|source| {
                    ConfigError::Sample {
                        id: id.clone(),
                        source,
                    }
                })?;
                Ok(Sample::new(id.clone(), region))
            })
            .collect()
    }

    pub fn input_for(&self, experiment_number: u64) -> PathBuf {
        substitute(&self.paths.input, experiment_number)
    }
    pub fn output_for(&self, experiment_number: u64) -> PathBuf {
        substitute(&self.paths.output, experiment_number)
    }
    pub fn reference(&self) -> Result<PathBuf, ConfigError> {
        self.paths
            .reference
            .as_ref()
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingSection { section: "paths.reference" })
    }
    pub fn intensity_max(&self) -> Result<i32, ConfigError> {
        self.intensity
            .map(|i| i.max)
            .ok_or(ConfigError::MissingSection { section: "intensity" })
    }
    pub fn multiplier(&self) -> i32 {
        self.subtract.map(|s| s.multiplier).unwrap_or(1)
    }
}

fn substitute(template: &str, experiment_number: u64) -> PathBuf {
    PathBuf::from(template.replace("{experiment_number}", &experiment_number.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
        [experiment]
        start = 103845
        end = 103855
        step = 5

        [paths]
        input = "/data/{experiment_number}/"
        output = "/processed/{experiment_number}/"

        [grid]
        width = 3
        height = 2
        sample_ids = ["1", "2"]
        start_points = [[0, 0], [2, 0]]
        end_points = [[1, 1], [2, 1]]

        [intensity]
        max = 5000
    "#;

    fn parse(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn expands_experiment_numbers() {
        let config = parse(TOML);
        config.validate().unwrap();
        assert_eq!(
            config.experiment_numbers().unwrap(),
            vec![103845, 103850, 103855]
        );
    }

    #[test]
    fn substitutes_experiment_number_into_paths() {
        let config = parse(TOML);
        assert_eq!(config.input_for(103845), PathBuf::from("/data/103845/"));
        assert_eq!(
            config.output_for(103850),
            PathBuf::from("/processed/103850/")
        );
    }

    #[test]
    fn builds_aligned_samples() {
        let config = parse(TOML);
        let grid = config.scan_grid().unwrap();
        let samples = config.samples(&grid).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].id, "1");
        assert_eq!(samples[1].region.start(), (2, 0));
    }

    #[test]
    fn rejects_misaligned_sample_lists() {
        let config = parse(&TOML.replace(
            r#"sample_ids = ["1", "2"]"#,
            r#"sample_ids = ["1"]"#,
        ));
        let grid = config.scan_grid().unwrap();
        assert!(matches!(
            config.samples(&grid),
            Err(ConfigError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn rejects_out_of_bounds_region_with_sample_context() {
        let config = parse(&TOML.replace("end_points = [[1, 1], [2, 1]]", "end_points = [[5, 1], [2, 1]]"));
        let grid = config.scan_grid().unwrap();
        match config.samples(&grid) {
            Err(ConfigError::Sample { id, .. }) => assert_eq!(id, "1"),
            other => panic!("expected sample error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_step() {
        let mut config = parse(TOML);
        config.experiment.step = 0;
        assert!(matches!(
            config.experiment_numbers(),
            Err(ConfigError::Numbers { .. })
        ));
    }

    #[test]
    fn missing_sections_are_named() {
        let config = parse(TOML);
        assert_eq!(config.intensity_max().unwrap(), 5000);
        assert!(matches!(
            config.reference(),
            Err(ConfigError::MissingSection {
                section: "paths.reference"
            })
        ));
        assert_eq!(config.multiplier(), 1);
    }
}
