//! Statistical reductions over pixels, windows and raster collections
//!
//! - **aggregate**: pixel-wise reduction across a collection of rasters
//! - **block**: downsampling by reducing square native blocks
//! - **focal**: moving window statistics

mod aggregate;
mod block;
mod focal;

pub use aggregate::Aggregate;
pub use block::{BlockMethod, BlockStatistics};
pub use focal::{FOCAL_STATISTICS, FocalStatistics};
