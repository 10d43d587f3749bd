//! Shared fixtures for the host integration tests
#![allow(dead_code)]

use ndarray::Array3;
use rasterfn_core::prelude::*;
use rasterfn_core::DatasetMetadata;
use rasterfn_host::{HostOptions, InMemoryRaster, ProcessingMode, RasterSource};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness; `RUST_LOG` filters it
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn options() -> HostOptions {
    HostOptions {
        tile_size: 4,
        mode: ProcessingMode::Sequential,
        ..HostOptions::default()
    }
}

/// A `rows x cols` grid at unit cell size with its upper-left corner at
/// `(0, rows)`
pub fn grid(bands: usize, pixel_type: PixelType, rows: usize, cols: usize) -> RasterInfo {
    RasterInfo::new(
        bands,
        pixel_type,
        Extent::new(0.0, 0.0, cols as f64, rows as f64),
        CellSize::square(1.0),
        SpatialReference::from_epsg(32633),
    )
}

pub fn raster(info: RasterInfo, values: Array3<f64>) -> Arc<dyn RasterSource> {
    InMemoryRaster::from_values(info, &values)
        .expect("fixture raster")
        .shared()
}

pub fn masked(info: RasterInfo, values: Array3<f64>, mask: Array3<u8>) -> Arc<dyn RasterSource> {
    InMemoryRaster::from_values(info, &values)
        .and_then(|r| r.with_mask(mask))
        .expect("fixture raster")
        .shared()
}

pub fn with_metadata(
    info: RasterInfo,
    values: Array3<f64>,
    metadata: KeyMetadata,
) -> Arc<dyn RasterSource> {
    InMemoryRaster::from_values(info, &values)
        .expect("fixture raster")
        .with_metadata(DatasetMetadata::new(metadata))
        .shared()
}

pub fn plugin(id: &str) -> Box<dyn RasterFunction> {
    rasterfn_plugins::catalog::create(id)
        .unwrap_or_else(|| panic!("no plugin `{id}` in the catalog"))
}
