//! # rasterfn host
//!
//! A reference host that drives raster function plugins through their
//! lifecycle.
//!
//! This crate provides:
//! - `Session`: licensing, binding, configuration and refinement, then tile
//!   and key metadata requests against one plugin instance
//! - Provisional output info derived from the primary input
//! - Padded, nearest-neighbour input windows with mask delivery
//! - Tiled rendering of a whole output raster
//! - Parallel rendering of independent sessions using Rayon
//!
//! Pixels are read from in-memory rasters through the `RasterSource` trait;
//! the host performs no I/O.

mod bindings;
mod derive;
pub mod options;
pub mod session;
pub mod source;
pub mod strategy;
pub mod tiled;
pub mod window;

pub use bindings::{Bindings, RasterBinding};
pub use derive::derive_output_info;
pub use options::HostOptions;
pub use session::{COMPOSITE_RASTERS, RenderedRaster, RenderedTile, Session};
pub use source::{InMemoryRaster, RasterSource};
pub use strategy::{ParallelStrategy, ProcessingMode, render_sessions};
pub use tiled::{Tile, TileIterator};
pub use window::Window;
