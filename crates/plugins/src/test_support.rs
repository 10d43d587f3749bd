//! Fixtures for driving a single plugin through its lifecycle in unit tests

use ndarray::Array3;
use rasterfn_core::prelude::*;
use rasterfn_core::{InputInfo, ParamValue, bind_scalars};
use std::collections::BTreeMap;

/// A `rows x cols` raster at unit cell size anchored at the origin
pub fn info(bands: usize, pixel_type: PixelType, rows: usize, cols: usize) -> RasterInfo {
    RasterInfo::new(
        bands,
        pixel_type,
        Extent::new(0.0, 0.0, cols as f64, rows as f64),
        CellSize::square(1.0),
        SpatialReference::from_epsg(32633),
    )
}

pub fn scalars(plugin: &dyn RasterFunction, pairs: &[(&str, ParamValue)]) -> Result<Scalars> {
    let supplied: BTreeMap<String, ParamValue> =
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    bind_scalars(&plugin.parameter_info(), &supplied)
}

/// Run configuration and refinement; the provisional output is the first
/// input's info with the presented band count
pub fn setup(
    plugin: &mut dyn RasterFunction,
    pairs: &[(&str, ParamValue)],
    inputs: Vec<(&str, InputInfo)>,
) -> Result<(Configuration, RasterInfo)> {
    let scalars = scalars(plugin, pairs)?;
    let config = plugin.configuration(&scalars)?;
    let inputs: BTreeMap<String, InputInfo> =
        inputs.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    let mut provisional = inputs
        .values()
        .next()
        .and_then(|i| i.all().first())
        .map(|r| r.info.clone())
        .unwrap_or_else(RasterInfo::neutral);
    provisional.set_band_count(config.presented_bands(provisional.band_count));
    let info = plugin.update_raster_info(RefineArgs {
        scalars: &scalars,
        inputs: &inputs,
        output_info: provisional,
    })?;
    Ok((config, info))
}

pub fn single(info: RasterInfo) -> InputInfo {
    InputInfo::Raster(InputRaster::new(info))
}

/// A request for the whole of `info`, `rows x cols` at its cell size
pub fn request(info: &RasterInfo, rows: usize, cols: usize) -> TileRequest {
    TileRequest {
        tlc: (0, 0),
        shape: (info.band_count, rows, cols),
        props: rasterfn_core::TileProperties {
            extent: info.extent.tile((0, 0), rows, cols, info.cell_size),
            cell_size: info.cell_size,
            pixel_type: info.pixel_type,
            no_data: info.no_data_for(0),
            spatial_reference: info.spatial_reference.clone(),
            width: cols,
            height: rows,
        },
    }
}

pub fn pixels(
    pixel_type: PixelType,
    values: Array3<f64>,
    mask: Option<Array3<u8>>,
) -> RasterPixels {
    let px = RasterPixels::new(PixelArray::from_f64(pixel_type, &values));
    match mask {
        Some(m) => px.with_mask(m),
        None => px,
    }
}

/// Output pixels and mask as `f64` / `u8` arrays
pub fn outputs(block: &PixelBlock) -> (Array3<f64>, Option<Array3<u8>>) {
    let px = block
        .output_pixels()
        .map(|p| p.to_f64())
        .expect("kernel wrote no output pixels");
    (px, block.output_mask().cloned())
}
