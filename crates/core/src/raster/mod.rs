//! Raster value types: pixel types, typed tile buffers, footprints and
//! static raster descriptions

mod array;
mod element;
mod extent;
mod info;
pub mod neighborhood;

pub use array::{IntoPixelData, IntoPixelDataExt, PixelArray, PixelData};
pub use element::{PixelType, RasterElement};
pub use extent::{CellSize, Extent};
pub use info::{BandStatistics, Colormap, Histogram, RasterInfo};
pub use neighborhood::Neighborhood;
