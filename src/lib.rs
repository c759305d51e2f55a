//! Summing & mapping of synchrotron X-ray diffraction pattern images
//!
//! Diffraction patterns are acquired as sequentially numbered TIFF
//! files over a 2D spatial measurement grid. This crate maps
//! rectangular grid sub-regions to their image files, sums the
//! selected patterns pixel-wise, writes averaged images with full
//! provenance manifests, subtracts scaled background references, and
//! surveys per-image intensities for map rendering (feature `plot`).

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

pub mod accumulate;
pub mod aggregate;
pub mod catalog;
pub mod config;
mod error;
pub mod grid;
pub mod intensity;
pub mod pattern;
#[cfg(feature = "plot")]
pub mod render;
pub mod subtract;

pub use accumulate::{Accumulator, Averaged};
pub use aggregate::{GridAverage, MissingPolicy, Sample, SeriesAverage};
pub use catalog::{list_patterns, Catalog};
pub use config::Config;
pub use error::Error;
pub use grid::{ImageIndex, Region, ScanGrid};
pub use intensity::{GridMap, IntensitySurvey};
pub use pattern::Pattern;
pub use subtract::Subtraction;

/// Cooperative cancellation for long batch runs
///
/// Checked between images: a cancelled aggregation stops before its
/// next read and never finalizes or writes a partial sum.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
