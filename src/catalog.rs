use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use glob::glob;
use regex::Regex;

use crate::grid::{ImageIndex, INDEX_TOKEN_WIDTH};

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("invalid listing pattern for {path}")]
    Pattern {
        path: PathBuf,
        source: glob::PatternError,
    },
    #[error("failed to read directory entry")]
    Glob(#[from] glob::GlobError),
    #[error("no image file matches index {index}")]
    Missing { index: ImageIndex },
    #[error("index {index} matches {} files: {paths:?}", paths.len())]
    Ambiguous {
        index: ImageIndex,
        paths: Vec<PathBuf>,
    },
}

/// Sorted listing of the diffraction pattern images in a directory
///
/// The acquisition software names every image with a zero-padded
/// sequence number, so the series is globbed as `0*.tif*`.
pub fn list_patterns<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, CatalogError> {
    let dir = dir.as_ref();
    let pattern = dir.join("0*.tif*");
    let entries = glob(pattern.to_string_lossy().as_ref()).map_err(|source| {
        CatalogError::Pattern {
            path: dir.to_path_buf(),
            source,
        }
    })?;
    let mut paths = entries.collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

/// One-pass index of a directory listing, resolving image indices to paths
///
/// An image index matches a file when its zero-padded decimal token
/// occurs anywhere in the filename. The catalog records every
/// fixed-width digit window of every filename up front, so each lookup
/// is a single map probe instead of a scan of the full listing.
pub struct Catalog {
    tokens: BTreeMap<String, Vec<PathBuf>>,
}
impl Catalog {
    pub fn index(listing: &[PathBuf]) -> Self {
        let digits = Regex::new(r"[0-9]+").unwrap();
        let mut tokens: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for path in listing {
            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            // every fixed-width window of every digit run, deduplicated
            // per file so "00123_00123.tiff" claims each token once
            let mut seen = BTreeSet::new();
            for run in digits.find_iter(&name) {
                let run = run.as_str();
                if run.len() < INDEX_TOKEN_WIDTH {
                    continue;
                }
                for start in 0..=run.len() - INDEX_TOKEN_WIDTH {
                    seen.insert(run[start..start + INDEX_TOKEN_WIDTH].to_string());
                }
            }
            for token in seen {
                tokens.entry(token).or_default().push(path.clone());
            }
        }
        Self { tokens }
    }

    /// Path of the image with the given index
    ///
    /// `Missing` when no filename carries the token, `Ambiguous` when
    /// more than one does; an ambiguous token means an unrelated
    /// filename contains the sequence number as a substring and is
    /// reported rather than resolved arbitrarily.
    pub fn locate(&self, index: ImageIndex) -> Result<&Path, CatalogError> {
        match self.tokens.get(&index.token()).map(Vec::as_slice) {
            None | Some([]) => Err(CatalogError::Missing { index }),
            Some([path]) => Ok(path),
            Some(paths) => Err(CatalogError::Ambiguous {
                index,
                paths: paths.to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::ScanGrid;

    fn index(n: u32) -> ImageIndex {
        let grid = ScanGrid::new(n, 1).unwrap();
        ImageIndex::at(n - 1, 0, &grid).unwrap()
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn locates_by_zero_padded_token() {
        let catalog = Catalog::index(&paths(&[
            "data/00001.tiff",
            "data/00002.tiff",
            "data/00010.tiff",
        ]));
        assert_eq!(
            catalog.locate(index(2)).unwrap(),
            Path::new("data/00002.tiff")
        );
        assert!(matches!(
            catalog.locate(index(3)),
            Err(CatalogError::Missing { .. })
        ));
    }

    #[test]
    fn token_matches_anywhere_in_the_filename() {
        let catalog = Catalog::index(&paths(&["data/pilatus_00042_scan.tiff"]));
        assert_eq!(
            catalog.locate(index(42)).unwrap(),
            Path::new("data/pilatus_00042_scan.tiff")
        );
    }

    #[test]
    fn longer_digit_runs_expose_every_window() {
        // "0001234" contains the 5 digit windows 00012, 00123 and 01234
        let catalog = Catalog::index(&paths(&["data/0001234.tiff"]));
        assert!(catalog.locate(index(12)).is_ok());
        assert!(catalog.locate(index(123)).is_ok());
        assert!(catalog.locate(index(1234)).is_ok());
    }

    #[test]
    fn cross_contamination_is_reported_not_resolved() {
        // an unrelated filename carrying 00007 as a substring must not
        // silently win or lose against the real image
        let catalog = Catalog::index(&paths(&[
            "data/00007.tiff",
            "data/beamline_run_1000070.tiff",
        ]));
        assert!(matches!(
            catalog.locate(index(7)),
            Err(CatalogError::Ambiguous { ref paths, .. }) if paths.len() == 2
        ));
    }

    #[test]
    fn duplicate_token_within_one_name_counts_once() {
        let catalog = Catalog::index(&paths(&["data/00005_copy_00005.tiff"]));
        assert!(catalog.locate(index(5)).is_ok());
    }
}
