use std::path::PathBuf;

use crate::{
    grid::ScanGrid,
    pattern::{Pattern, PatternError},
};

#[derive(thiserror::Error, Debug)]
pub enum IntensityError {
    #[error("no images to survey")]
    Empty,
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("{count} surveyed images cannot fill a {width}x{height} grid")]
    GridMismatch {
        count: usize,
        width: u32,
        height: u32,
    },
}

/// Per-image maximum and mean intensity over a series
///
/// The raw numbers a rendering collaborator needs to draw intensity
/// maps: one value per image in listing order, plus the `(v_min, v_max)`
/// color range for each map.
pub struct IntensitySurvey {
    maxima: Vec<i32>,
    means: Vec<f64>,
}
impl IntensitySurvey {
    pub fn of(paths: &[PathBuf]) -> Result<Self, IntensityError> {
        if paths.is_empty() {
            return Err(IntensityError::Empty);
        }
        let mut maxima = Vec::with_capacity(paths.len());
        let mut means = Vec::with_capacity(paths.len());
        for path in paths {
            let pattern = Pattern::read(path)?;
            maxima.push(pattern.max());
            means.push(pattern.mean());
        }
        Ok(Self { maxima, means })
    }

    pub fn maxima(&self) -> &[i32] {
        &self.maxima
    }
    pub fn means(&self) -> &[f64] {
        &self.means
    }
    pub fn len(&self) -> usize {
        self.maxima.len()
    }
    pub fn is_empty(&self) -> bool {
        self.maxima.is_empty()
    }

    /// Color range for the maximum intensity map
    pub fn max_range(&self) -> (i32, i32) {
        let lo = self.maxima.iter().copied().min().unwrap_or(0);
        let hi = self.maxima.iter().copied().max().unwrap_or(0);
        (lo, hi)
    }
    /// Color range for the average intensity map
    pub fn mean_range(&self) -> (f64, f64) {
        let lo = self.means.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = self.means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (lo, hi)
    }
    /// Average intensity over every image of the series
    pub fn grand_mean(&self) -> f64 {
        self.means.iter().sum::<f64>() / self.means.len() as f64
    }

    /// Reshapes the per-image values onto the scan grid, row-major
    pub fn into_grid(self, grid: &ScanGrid) -> Result<(GridMap, GridMap), IntensityError> {
        if self.len() != grid.len() as usize {
            return Err(IntensityError::GridMismatch {
                count: self.len(),
                width: grid.width(),
                height: grid.height(),
            });
        }
        let maxima = GridMap {
            grid: *grid,
            values: self.maxima.iter().map(|&v| v as f64).collect(),
        };
        let means = GridMap {
            grid: *grid,
            values: self.means,
        };
        Ok((maxima, means))
    }
}

/// Scalar field over the scan grid, one value per measurement point
pub struct GridMap {
    grid: ScanGrid,
    values: Vec<f64>,
}
impl GridMap {
    pub fn grid(&self) -> &ScanGrid {
        &self.grid
    }
    pub fn values(&self) -> &[f64] {
        &self.values
    }
    pub fn range(&self) -> (f64, f64) {
        let lo = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (lo, hi)
    }
    /// Value at grid point (x, y)
    pub fn at(&self, x: u32, y: u32) -> f64 {
        self.values[(x + y * self.grid.width()) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survey_of_fixture_series() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (k, value) in [10, 20, 60].iter().enumerate() {
            let path = dir.path().join(format!("{:05}.tiff", k + 1));
            Pattern::constant(2, 2, *value).write(&path).unwrap();
            paths.push(path);
        }
        let survey = IntensitySurvey::of(&paths).unwrap();
        assert_eq!(survey.maxima(), &[10, 20, 60]);
        assert_eq!(survey.max_range(), (10, 60));
        assert_eq!(survey.mean_range(), (10f64, 60f64));
        assert_eq!(survey.grand_mean(), 30f64);

        let grid = ScanGrid::new(3, 1).unwrap();
        let (maxima, means) = survey.into_grid(&grid).unwrap();
        assert_eq!(maxima.at(2, 0), 60f64);
        assert_eq!(means.range(), (10f64, 60f64));
    }

    #[test]
    fn empty_series_is_an_error() {
        assert!(matches!(
            IntensitySurvey::of(&[]),
            Err(IntensityError::Empty)
        ));
    }

    #[test]
    fn grid_reshape_requires_a_full_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00001.tiff");
        Pattern::constant(1, 1, 1).write(&path).unwrap();
        let survey = IntensitySurvey::of(&[path]).unwrap();
        let grid = ScanGrid::new(2, 2).unwrap();
        assert!(matches!(
            survey.into_grid(&grid),
            Err(IntensityError::GridMismatch { .. })
        ));
    }
}
