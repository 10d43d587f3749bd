//! The raster function trait and the arguments of each protocol call

use crate::block::{PixelBlock, TileRequest};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::metadata::{DatasetMetadata, KeyMetadata, MetadataScope};
use crate::params::{Parameter, Scalars};
use crate::raster::RasterInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Host product descriptor passed to [`RasterFunction::is_licensed`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductInfo {
    pub product_name: String,
    pub version: String,
    pub product_level: Option<String>,
    /// Licensed extensions available to the host
    pub extensions: Vec<String>,
}

impl Default for ProductInfo {
    fn default() -> Self {
        Self {
            product_name: "rasterfn-host".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            product_level: None,
            extensions: Vec::new(),
        }
    }
}

impl ProductInfo {
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(name))
    }
}

/// Answer to a license query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseStatus {
    pub ok_to_run: bool,
    pub message: Option<String>,
    pub product_level: Option<String>,
    pub extension: Option<String>,
}

impl LicenseStatus {
    pub fn ok() -> Self {
        Self {
            ok_to_run: true,
            message: None,
            product_level: None,
            extension: None,
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            ok_to_run: false,
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn requiring_extension(mut self, extension: &str) -> Self {
        self.extension = Some(extension.to_string());
        self
    }
}

/// Static description and key metadata of one bound input
#[derive(Debug, Clone, PartialEq)]
pub struct InputRaster {
    pub info: RasterInfo,
    pub metadata: DatasetMetadata,
}

impl InputRaster {
    pub fn new(info: RasterInfo) -> Self {
        Self {
            info,
            metadata: DatasetMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: DatasetMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Input information bound to a raster parameter
#[derive(Debug, Clone, PartialEq)]
pub enum InputInfo {
    Raster(InputRaster),
    Rasters(Vec<InputRaster>),
}

impl InputInfo {
    /// Every raster behind this binding, in order
    pub fn all(&self) -> &[InputRaster] {
        match self {
            InputInfo::Raster(r) => std::slice::from_ref(r),
            InputInfo::Rasters(rs) => rs,
        }
    }
}

/// Arguments of the output-info refinement call
#[derive(Debug, Clone)]
pub struct RefineArgs<'a> {
    pub scalars: &'a Scalars,
    pub inputs: &'a BTreeMap<String, InputInfo>,
    /// Provisional output description derived by the host
    pub output_info: RasterInfo,
}

impl<'a> RefineArgs<'a> {
    pub fn raster(&self, name: &str) -> Result<&'a InputRaster> {
        match self.inputs.get(name) {
            Some(InputInfo::Raster(r)) => Ok(r),
            Some(InputInfo::Rasters(_)) => Err(Error::Protocol(format!(
                "`{name}` is a raster collection, not a single raster"
            ))),
            None => Err(Error::Protocol(format!("no raster info bound for `{name}`"))),
        }
    }

    pub fn rasters(&self, name: &str) -> Result<&'a [InputRaster]> {
        self.inputs
            .get(name)
            .map(InputInfo::all)
            .ok_or_else(|| Error::Protocol(format!("no raster info bound for `{name}`")))
    }
}

/// A key metadata query: which names, at which level
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataQuery {
    /// Names being asked for; empty means all
    pub names: Vec<String>,
    pub scope: MetadataScope,
}

impl MetadataQuery {
    pub fn dataset(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_lowercase()).collect(),
            scope: MetadataScope::Dataset,
        }
    }

    pub fn band(band: usize, names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_lowercase()).collect(),
            scope: MetadataScope::Band(band),
        }
    }

    /// Whether `name` is among the requested names
    pub fn wants(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

/// A raster processing plugin.
///
/// The host calls, in order: [`parameter_info`](Self::parameter_info),
/// [`configuration`](Self::configuration) once,
/// [`update_raster_info`](Self::update_raster_info) once, then any number of
/// [`update_pixels`](Self::update_pixels) and
/// [`update_key_metadata`](Self::update_key_metadata) calls. Only the two
/// setup calls may change the plugin; tile and metadata calls see it
/// immutably so no state carries from one tile to the next.
pub trait RasterFunction: Send {
    /// Short display name
    fn name(&self) -> &'static str;

    /// One-line description of what the function computes
    fn description(&self) -> &'static str;

    /// Whether the host product may run this function
    fn is_licensed(&self, _product: &ProductInfo) -> LicenseStatus {
        LicenseStatus::ok()
    }

    /// Ordered parameter declarations
    fn parameter_info(&self) -> Vec<Parameter>;

    /// Host flags, given the bound scalars
    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration>;

    /// Refine the provisional output description and latch scalar state
    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo>;

    /// Compute one output tile into `block`
    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()>;

    /// Override key metadata answers; the default passes them through
    fn update_key_metadata(
        &self,
        _query: &MetadataQuery,
        metadata: KeyMetadata,
    ) -> Result<KeyMetadata> {
        Ok(metadata)
    }
}
