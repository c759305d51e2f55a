use std::fmt;

/// Width of the zero-padded numeric token in diffraction image filenames
pub const INDEX_TOKEN_WIDTH: usize = 5;

#[derive(thiserror::Error, Debug)]
pub enum GridError {
    #[error("scan grid dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
    #[error("point ({x},{y}) lies outside the {width}x{height} scan grid")]
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },
    #[error("region start ({x0},{y0}) must not exceed end ({x1},{y1})")]
    Inverted { x0: u32, y0: u32, x1: u32, y1: u32 },
}

/// Spatial (X,Y) measurement grid the diffraction patterns were acquired on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanGrid {
    width: u32,
    height: u32,
}
impl ScanGrid {
    pub fn new(width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::ZeroDimension { width, height });
        }
        Ok(Self { width, height })
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    /// Total number of measurement points, also the largest valid image index
    pub fn len(&self) -> u32 {
        self.width * self.height
    }
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }
}

/// 1-based sequential image file number
///
/// Patterns are numbered left-to-right then top-to-bottom, matching the
/// acquisition order of the instrument: `index = (x + 1) + y * width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageIndex(u32);
impl ImageIndex {
    pub fn at(x: u32, y: u32, grid: &ScanGrid) -> Result<Self, GridError> {
        if !grid.contains(x, y) {
            return Err(GridError::OutOfBounds {
                x,
                y,
                width: grid.width,
                height: grid.height,
            });
        }
        Ok(Self((x + 1) + y * grid.width))
    }
    pub fn get(&self) -> u32 {
        self.0
    }
    /// Zero-padded filename token, e.g. index 123 -> "00123"
    pub fn token(&self) -> String {
        format!("{:0width$}", self.0, width = INDEX_TOKEN_WIDTH)
    }
}
impl fmt::Display for ImageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Inclusive rectangular sub-area of the scan grid, in grid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    start: (u32, u32),
    end: (u32, u32),
}
impl Region {
    /// Both corners are included in the scan
    pub fn new(start: (u32, u32), end: (u32, u32), grid: &ScanGrid) -> Result<Self, GridError> {
        for &(x, y) in &[start, end] {
            if !grid.contains(x, y) {
                return Err(GridError::OutOfBounds {
                    x,
                    y,
                    width: grid.width,
                    height: grid.height,
                });
            }
        }
        if start.0 > end.0 || start.1 > end.1 {
            return Err(GridError::Inverted {
                x0: start.0,
                y0: start.1,
                x1: end.0,
                y1: end.1,
            });
        }
        Ok(Self { start, end })
    }
    pub fn start(&self) -> (u32, u32) {
        self.start
    }
    pub fn end(&self) -> (u32, u32) {
        self.end
    }
    /// Image indices covering the region, in row-major acquisition order
    pub fn indices<'a>(&self, grid: &'a ScanGrid) -> impl Iterator<Item = ImageIndex> + 'a {
        let (x0, y0) = self.start;
        let (x1, y1) = self.end;
        let width = grid.width;
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| ImageIndex((x + 1) + y * width)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_one_based_row_major() {
        let grid = ScanGrid::new(97, 25).unwrap();
        assert_eq!(ImageIndex::at(0, 0, &grid).unwrap().get(), 1);
        assert_eq!(ImageIndex::at(96, 0, &grid).unwrap().get(), 97);
        assert_eq!(ImageIndex::at(0, 1, &grid).unwrap().get(), 98);
        assert_eq!(ImageIndex::at(96, 24, &grid).unwrap().get(), grid.len());
    }

    #[test]
    fn token_is_zero_padded() {
        let grid = ScanGrid::new(10, 10).unwrap();
        let index = ImageIndex::at(2, 1, &grid).unwrap();
        assert_eq!(index.token(), "00013");
    }

    #[test]
    fn region_indices_increase_without_duplicates() {
        let grid = ScanGrid::new(7, 5).unwrap();
        let region = Region::new((1, 1), (5, 3), &grid).unwrap();
        let indices: Vec<u32> = region.indices(&grid).map(|i| i.get()).collect();
        assert_eq!(indices.len(), 5 * 3);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn two_by_two_region_on_three_wide_grid() {
        let grid = ScanGrid::new(3, 2).unwrap();
        let region = Region::new((0, 0), (1, 1), &grid).unwrap();
        let indices: Vec<u32> = region.indices(&grid).map(|i| i.get()).collect();
        assert_eq!(indices, vec![1, 2, 4, 5]);
    }

    #[test]
    fn single_point_region() {
        let grid = ScanGrid::new(3, 3).unwrap();
        let region = Region::new((2, 2), (2, 2), &grid).unwrap();
        assert_eq!(region.indices(&grid).count(), 1);
    }

    #[test]
    fn rejects_inverted_and_out_of_bounds_regions() {
        let grid = ScanGrid::new(4, 4).unwrap();
        assert!(Region::new((2, 2), (1, 3), &grid).is_err());
        assert!(Region::new((0, 0), (4, 0), &grid).is_err());
        assert!(ScanGrid::new(0, 4).is_err());
    }
}
