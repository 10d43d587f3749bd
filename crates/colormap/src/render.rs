//! Rendering function outputs to RGBA buffers

use crate::scheme::{ColorScheme, Rgb, evaluate};
use ndarray::{Array3, ArrayView2, Axis};
use rasterfn_core::raster::{Colormap, PixelArray};

/// Parameters for ramp rendering.
#[derive(Debug, Clone)]
pub struct ColormapParams {
    pub scheme: ColorScheme,
    /// Value mapped to the start of the ramp; lower values clamp
    pub min: f64,
    /// Value mapped to the end of the ramp; higher values clamp
    pub max: f64,
    /// Colour of invalid pixels (RGBA). Default: fully transparent.
    pub nodata_color: [u8; 4],
}

impl ColormapParams {
    pub fn new(scheme: ColorScheme) -> Self {
        Self::with_range(scheme, 0.0, 1.0)
    }

    pub fn with_range(scheme: ColorScheme, min: f64, max: f64) -> Self {
        Self {
            scheme,
            min,
            max,
            nodata_color: [0, 0, 0, 0],
        }
    }
}

fn band_view<'a>(values: &'a Array3<f64>, band: usize) -> ArrayView2<'a, f64> {
    values.index_axis(Axis(0), band.min(values.dim().0.saturating_sub(1)))
}

fn is_valid(mask: Option<&Array3<u8>>, band: usize, r: usize, c: usize) -> bool {
    mask.is_none_or(|m| {
        let b = band.min(m.dim().0.saturating_sub(1));
        m[[b, r, c]] != 0
    })
}

/// Scan the valid pixels of `band` for the ramp range.
///
/// A band with no finite valid values gets `[0, 1]`; a constant band gets
/// `[v, v + 1]`.
pub fn auto_params(
    pixels: &PixelArray,
    mask: Option<&Array3<u8>>,
    band: usize,
    scheme: ColorScheme,
) -> ColormapParams {
    let values = pixels.to_f64();
    let view = band_view(&values, band);
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for ((r, c), &v) in view.indexed_iter() {
        if v.is_finite() && is_valid(mask, band, r, c) {
            min = min.min(v);
            max = max.max(v);
        }
    }

    if !min.is_finite() || !max.is_finite() {
        min = 0.0;
        max = 1.0;
    } else if (max - min).abs() < f64::EPSILON {
        max = min + 1.0;
    }

    ColormapParams::with_range(scheme, min, max)
}

/// Render one band through a colour ramp.
///
/// Returns `rows * cols * 4` bytes in row-major order. Invalid and
/// non-finite pixels get `params.nodata_color`.
pub fn ramp_to_rgba(
    pixels: &PixelArray,
    mask: Option<&Array3<u8>>,
    band: usize,
    params: &ColormapParams,
) -> Vec<u8> {
    let values = pixels.to_f64();
    let view = band_view(&values, band);
    let range = params.max - params.min;
    let inv_range = if range.abs() > f64::EPSILON { 1.0 / range } else { 1.0 };

    let mut rgba = Vec::with_capacity(view.len() * 4);
    for ((r, c), &v) in view.indexed_iter() {
        if v.is_finite() && is_valid(mask, band, r, c) {
            let Rgb { r, g, b } = evaluate(params.scheme, (v - params.min) * inv_range);
            rgba.extend_from_slice(&[r, g, b, 255]);
        } else {
            rgba.extend_from_slice(&params.nodata_color);
        }
    }
    rgba
}

/// Render band 0 of an indexed output through its colormap.
///
/// Values absent from the colormap render transparent, as do invalid pixels.
pub fn indexed_to_rgba(
    pixels: &PixelArray,
    mask: Option<&Array3<u8>>,
    colormap: &Colormap,
) -> Vec<u8> {
    let values = pixels.to_f64();
    let view = band_view(&values, 0);
    let mut rgba = Vec::with_capacity(view.len() * 4);
    for ((r, c), &v) in view.indexed_iter() {
        let entry = (v.is_finite() && is_valid(mask, 0, r, c))
            .then(|| colormap.lookup(v.round() as i32))
            .flatten();
        match entry {
            Some([red, green, blue]) => rgba.extend_from_slice(&[red, green, blue, 255]),
            None => rgba.extend_from_slice(&[0, 0, 0, 0]),
        }
    }
    rgba
}
