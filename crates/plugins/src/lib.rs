//! # rasterfn plugins
//!
//! Raster functions implementing the [`RasterFunction`](rasterfn_core::RasterFunction)
//! contract.
//!
//! ## Available Categories
//!
//! - **imagery**: NDVI, grayscale, spectral unmixing, two-raster arithmetic
//! - **terrain**: Hillshade, contour lines
//! - **statistics**: Aggregation across rasters, block and focal statistics
//! - **conversion**: Per-month rates, heat index, wind chill
//! - **metadata**: Key metadata overrides
//! - **random**: Uniform random samples
//!
//! Plugins do no I/O and spawn no threads; a host drives them tile by tile.

mod bind;
pub mod catalog;
pub mod conversion;
pub mod imagery;
pub mod metadata;
pub mod random;
mod reduce;
pub mod statistics;
pub mod terrain;

#[cfg(test)]
mod test_support;

pub use catalog::{Category, PluginEntry, build_catalog};
pub use reduce::{AGGREGATION_METHODS, Reducer};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::{Category, PluginEntry, build_catalog, create};
    pub use crate::conversion::{HeatIndex, PerSecondToPerMonth, WindChill};
    pub use crate::imagery::{Arithmetic, Grayscale, LinearSpectralUnmixing, Ndvi};
    pub use crate::metadata::KeyMetadataOverride;
    pub use crate::random::Random;
    pub use crate::statistics::{Aggregate, BlockStatistics, FocalStatistics};
    pub use crate::terrain::{Contour, Hillshade};
    pub use rasterfn_core::prelude::*;
}
