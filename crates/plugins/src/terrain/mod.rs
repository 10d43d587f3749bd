//! Terrain analysis functions
//!
//! Both functions read a single elevation band through a padded window.

mod contour;
mod hillshade;

pub use contour::{Contour, ContourMode};
pub use hillshade::Hillshade;
