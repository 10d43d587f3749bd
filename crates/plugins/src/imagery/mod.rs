//! Imagery functions
//!
//! Spectral indices, band combinations and pixel arithmetic:
//! - NDVI with raw, scaled and colormapped output
//! - Grayscale from three RGB bands
//! - Linear spectral unmixing against endmember signatures
//! - Two-raster arithmetic over no-data sentinels

mod arithmetic;
mod grayscale;
mod ndvi;
mod unmixing;

pub use arithmetic::{Arithmetic, Operation};
pub use grayscale::{GrayWeights, Grayscale};
pub use ndvi::{Ndvi, NdviOutput};
pub use unmixing::{Endmembers, LinearSpectralUnmixing};
