//! # rasterfn colormap
//!
//! Colour ramps for raster function outputs: building the four-array
//! indexed colormap a function attaches to its output info, and rendering
//! output tiles to RGBA either through that colormap or through a ramp.
//!
//! ## Usage
//!
//! ```ignore
//! use rasterfn_colormap::{ColorScheme, ramp_colormap};
//!
//! let colormap = ramp_colormap(ColorScheme::Ndvi, 0..=200);
//! ```

mod indexed;
mod render;
mod scheme;

pub use indexed::ramp_colormap;
pub use render::{ColormapParams, auto_params, indexed_to_rgba, ramp_to_rgba};
pub use scheme::{ColorScheme, Rgb, evaluate};
