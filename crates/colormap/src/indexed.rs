//! Indexed colormaps built from colour ramps

use crate::scheme::{ColorScheme, Rgb, evaluate};
use rasterfn_core::raster::Colormap;
use std::ops::RangeInclusive;

/// Build a four-array colormap assigning a ramp colour to every integer in
/// `values`, spread evenly from the first to the last ramp colour.
pub fn ramp_colormap(scheme: ColorScheme, values: RangeInclusive<i32>) -> Colormap {
    let (lo, hi) = (*values.start(), *values.end());
    let span = (hi - lo).max(1) as f64;
    let mut cm = Colormap::default();
    for v in values {
        let Rgb { r, g, b } = evaluate(scheme, (v - lo) as f64 / span);
        cm.values.push(v);
        cm.red.push(r);
        cm.green.push(g);
        cm.blue.push(b);
    }
    cm
}
