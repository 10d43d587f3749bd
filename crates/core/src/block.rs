//! Per-tile payload handed to a plugin kernel

use crate::crs::SpatialReference;
use crate::error::{Error, Result};
use crate::metadata::KeyMetadata;
use crate::raster::{CellSize, Extent, PixelArray, PixelType};
use ndarray::Array3;
use std::collections::BTreeMap;

/// Properties of the requested output tile
#[derive(Debug, Clone, PartialEq)]
pub struct TileProperties {
    /// Map extent of the unpadded tile
    pub extent: Extent,
    pub cell_size: CellSize,
    pub pixel_type: PixelType,
    pub no_data: Option<f64>,
    pub spatial_reference: SpatialReference,
    pub width: usize,
    pub height: usize,
}

/// One tile request: where, how large, and in what representation
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    /// Top-left corner `(col, row)` in output pixel coordinates
    pub tlc: (usize, usize),
    /// `(bands, rows, cols)` of the output block
    pub shape: (usize, usize, usize),
    pub props: TileProperties,
}

impl TileRequest {
    pub fn bands(&self) -> usize {
        self.shape.0
    }

    pub fn rows(&self) -> usize {
        self.shape.1
    }

    pub fn cols(&self) -> usize {
        self.shape.2
    }

    /// Output no-data value, or 0 when the output has none
    pub fn fill_value(&self) -> f64 {
        self.props.no_data.unwrap_or(0.0)
    }
}

/// Pixels, optional mask and key metadata of one bound input
#[derive(Debug, Clone, PartialEq)]
pub struct RasterPixels {
    pub pixels: PixelArray,
    /// `1` = valid, `0` = invalid; same shape as `pixels`
    pub mask: Option<Array3<u8>>,
    pub key_metadata: KeyMetadata,
}

impl RasterPixels {
    pub fn new(pixels: PixelArray) -> Self {
        Self {
            pixels,
            mask: None,
            key_metadata: KeyMetadata::new(),
        }
    }

    pub fn with_mask(mut self, mask: Array3<u8>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_key_metadata(mut self, key_metadata: KeyMetadata) -> Self {
        self.key_metadata = key_metadata;
        self
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.pixels.shape()
    }

    /// Pixel values widened to `f64`
    pub fn values(&self) -> Array3<f64> {
        self.pixels.to_f64()
    }

    /// The delivered mask, or an all-valid one when none was delivered
    pub fn mask_or_valid(&self) -> Array3<u8> {
        match &self.mask {
            Some(m) => m.clone(),
            None => Array3::ones(self.pixels.shape()),
        }
    }
}

/// A bound input as the kernel sees it
#[derive(Debug, Clone, PartialEq)]
pub enum BlockInput {
    Raster(RasterPixels),
    Rasters(Vec<RasterPixels>),
}

/// Mutable per-tile payload: named inputs plus the outputs to fill
#[derive(Debug, Clone, Default)]
pub struct PixelBlock {
    inputs: BTreeMap<String, BlockInput>,
    output_pixels: Option<PixelArray>,
    output_mask: Option<Array3<u8>>,
}

impl PixelBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_raster(&mut self, name: &str, input: RasterPixels) {
        self.inputs.insert(name.to_string(), BlockInput::Raster(input));
    }

    pub fn insert_rasters(&mut self, name: &str, inputs: Vec<RasterPixels>) {
        self.inputs.insert(name.to_string(), BlockInput::Rasters(inputs));
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }

    pub fn input(&self, name: &str) -> Option<&BlockInput> {
        self.inputs.get(name)
    }

    /// The single raster bound to `name`
    pub fn raster(&self, name: &str) -> Result<&RasterPixels> {
        match self.inputs.get(name) {
            Some(BlockInput::Raster(r)) => Ok(r),
            Some(BlockInput::Rasters(_)) => Err(Error::Protocol(format!(
                "`{name}` is a raster collection, not a single raster"
            ))),
            None => Err(Error::Protocol(format!("no pixels delivered for `{name}`"))),
        }
    }

    /// The raster collection bound to `name`
    pub fn rasters(&self, name: &str) -> Result<&[RasterPixels]> {
        match self.inputs.get(name) {
            Some(BlockInput::Rasters(r)) => Ok(r),
            Some(BlockInput::Raster(r)) => Ok(std::slice::from_ref(r)),
            None => Err(Error::Protocol(format!("no pixels delivered for `{name}`"))),
        }
    }

    pub fn set_output(&mut self, pixels: PixelArray) {
        self.output_pixels = Some(pixels);
    }

    /// Convert `values` to the requested pixel type and store them
    pub fn set_output_values(&mut self, request: &TileRequest, values: &Array3<f64>) {
        self.output_pixels = Some(PixelArray::from_f64(request.props.pixel_type, values));
    }

    pub fn set_output_mask(&mut self, mask: Array3<u8>) {
        self.output_mask = Some(mask);
    }

    pub fn output_pixels(&self) -> Option<&PixelArray> {
        self.output_pixels.as_ref()
    }

    pub fn output_mask(&self) -> Option<&Array3<u8>> {
        self.output_mask.as_ref()
    }

    /// Move the outputs out, leaving the block empty of them
    pub fn take_outputs(&mut self) -> (Option<PixelArray>, Option<Array3<u8>>) {
        (self.output_pixels.take(), self.output_mask.take())
    }
}
