//! # rasterfn core
//!
//! Value types and the plugin trait shared by rasterfn plugins and hosts.
//!
//! This crate provides:
//! - `RasterInfo`: static description of a raster
//! - `PixelArray` / `PixelBlock`: typed per-tile buffers
//! - `Parameter` / `Scalars`: parameter schema and binding
//! - `Configuration`: host flags returned by a plugin
//! - `KeyMetadata`: dataset and band level attributes
//! - `RasterFunction`: the five-call plugin contract

pub mod block;
pub mod config;
pub mod crs;
pub mod error;
pub mod function;
pub mod metadata;
pub mod params;
pub mod raster;

pub use block::{BlockInput, PixelBlock, RasterPixels, TileProperties, TileRequest};
pub use config::{Configuration, Inherit, Invalidate};
pub use crs::SpatialReference;
pub use error::{Error, Result};
pub use function::{
    InputInfo, InputRaster, LicenseStatus, MetadataQuery, ProductInfo, RasterFunction, RefineArgs,
};
pub use metadata::{DatasetMetadata, KeyMetadata, MetaValue, MetadataScope};
pub use params::{DataType, ParamValue, Parameter, Scalars, bind_scalars};
pub use raster::{CellSize, Extent, PixelArray, PixelType, RasterElement, RasterInfo};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::block::{PixelBlock, RasterPixels, TileRequest};
    pub use crate::config::{Configuration, Inherit, Invalidate};
    pub use crate::crs::SpatialReference;
    pub use crate::error::{Error, Result};
    pub use crate::function::{
        InputRaster, LicenseStatus, MetadataQuery, ProductInfo, RasterFunction, RefineArgs,
    };
    pub use crate::metadata::{KeyMetadata, MetaValue, MetadataScope, names};
    pub use crate::params::{Parameter, Scalars};
    pub use crate::raster::{CellSize, Extent, PixelArray, PixelType, RasterInfo};
}
