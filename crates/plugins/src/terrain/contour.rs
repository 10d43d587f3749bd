//! Contour lines over a Gaussian-smoothed surface
//!
//! Each tile is smoothed with a normalized Gaussian stamp, then a cell is
//! marked with a contour level when that level crosses between the cell
//! and its right or bottom neighbor. Cells on no contour are masked out.
//! In smoothing-only mode the smoothed surface itself is returned.

use ndarray::{Array2, Array3, ArrayView2, Axis};
use rasterfn_core::prelude::*;
use rasterfn_core::raster::neighborhood::and_over_window;
use tracing::debug;

use crate::bind::whole_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContourMode {
    #[default]
    Lines,
    SmoothingOnly,
}

impl ContourMode {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "contour lines" => Ok(ContourMode::Lines),
            "smoothing only" => Ok(ContourMode::SmoothingOnly),
            other => Err(Error::binding("mode", format!("unknown mode `{other}`"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Contour {
    mode: ContourMode,
    /// Elevation difference between successive contour lines
    interval: f64,
    /// Contours are generated at `base + n * interval`
    base: f64,
    /// Smoothing radius in cells; 0 disables smoothing
    radius: usize,
}

impl Default for Contour {
    fn default() -> Self {
        Self {
            mode: ContourMode::Lines,
            interval: 10.0,
            base: 0.0,
            radius: 1,
        }
    }
}

impl Contour {
    fn padding(&self) -> usize {
        match self.mode {
            ContourMode::Lines => self.radius + 1,
            ContourMode::SmoothingOnly => self.radius,
        }
    }
}

/// Normalized Gaussian stamp of half-width `radius`, sigma `radius / 2`
fn gaussian_kernel(radius: usize) -> Array2<f64> {
    let size = 2 * radius + 1;
    if radius == 0 {
        return Array2::ones((1, 1));
    }
    let sigma = radius as f64 / 2.0;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let r = radius as f64;
    let mut kernel = Array2::from_shape_fn((size, size), |(i, j)| {
        let (dr, dc) = (i as f64 - r, j as f64 - r);
        (-(dr * dr + dc * dc) / two_sigma_sq).exp()
    });
    let sum = kernel.sum();
    kernel /= sum;
    kernel
}

/// Smooth `values` with `kernel`, weighting valid cells only.
///
/// Output position `(i, j)` is centered on input `(i + k, j + k)`; cells
/// without any valid neighbor come out NaN.
fn smooth(
    values: ArrayView2<'_, f64>,
    valid: ArrayView2<'_, u8>,
    kernel: &Array2<f64>,
) -> Array2<f64> {
    let k = kernel.nrows() / 2;
    let (rows, cols) = values.dim();
    let (out_rows, out_cols) = (rows.saturating_sub(2 * k), cols.saturating_sub(2 * k));
    Array2::from_shape_fn((out_rows, out_cols), |(i, j)| {
        let mut sum = 0.0;
        let mut wsum = 0.0;
        for ((di, dj), &w) in kernel.indexed_iter() {
            if valid[[i + di, j + dj]] != 0 {
                sum += values[[i + di, j + dj]] * w;
                wsum += w;
            }
        }
        if wsum > 0.0 { sum / wsum } else { f64::NAN }
    })
}

/// Contour level crossed between two elevations, if any
fn contour_crossing(a: f64, b: f64, interval: f64, base: f64) -> Option<f64> {
    let lo = a.min(b);
    let hi = a.max(b);
    let first_level = ((lo - base) / interval).ceil() * interval + base;
    (first_level >= lo && first_level <= hi && (hi - lo) > 1e-15).then_some(first_level)
}

impl RasterFunction for Contour {
    fn name(&self) -> &'static str {
        "Contour"
    }

    fn description(&self) -> &'static str {
        "Contour lines from a smoothed elevation surface"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("raster", "DEM"),
            Parameter::string("mode", "Mode")
                .domain(&["Contour Lines", "Smoothing Only"])
                .default("Contour Lines"),
            Parameter::numeric("interval", "Contour Interval").default(10.0),
            Parameter::numeric("base", "Base Contour").default(0.0),
            Parameter::numeric("radius", "Smoothing Radius")
                .default(1)
                .describe("Gaussian smoothing half-width in cells; 0 disables smoothing"),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.mode = ContourMode::parse(scalars.text("mode")?)?;
        self.interval = scalars.number("interval")?;
        self.base = scalars.number("base")?;
        self.radius = whole_number(scalars, "radius", 0)?;
        if self.interval <= 0.0 || !self.interval.is_finite() {
            return Err(Error::binding("interval", "contour interval must be > 0"));
        }

        Ok(Configuration::new()
            .extract_bands(vec![0])
            .inherit(Inherit::DIMENSIONS | Inherit::RESAMPLING)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM)
            .padding(self.padding())
            .input_mask(true)
            .resampling(true))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let mut info = args.output_info;
        info.set_band_count(1);
        info.pixel_type = PixelType::F32;
        info.no_data = None;
        debug!(
            mode = ?self.mode,
            interval = self.interval,
            radius = self.radius,
            "contour refined"
        );
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let input = block.raster("raster")?;
        let (rows, cols) = (request.rows(), request.cols());
        let p = self.padding();
        let expected = (1, rows + 2 * p, cols + 2 * p);
        if input.shape() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: input.shape(),
            });
        }

        let values = input.values();
        let valid = input.mask_or_valid();
        let mut mask = and_over_window(valid.view(), p)?;
        let smoothed = smooth(
            values.index_axis(Axis(0), 0),
            valid.index_axis(Axis(0), 0),
            &gaussian_kernel(self.radius),
        );

        let mut out = Array3::<f64>::zeros((1, rows, cols));
        // Offset of output (0, 0) inside the smoothed grid
        let o = p - self.radius;
        for r in 0..rows {
            for c in 0..cols {
                if mask[[0, r, c]] == 0 {
                    continue;
                }
                let v = smoothed[[r + o, c + o]];
                match self.mode {
                    ContourMode::SmoothingOnly => out[[0, r, c]] = v,
                    ContourMode::Lines => {
                        let crossing = |next: f64| {
                            contour_crossing(v, next, self.interval, self.base)
                        };
                        let level = crossing(smoothed[[r + o, c + o + 1]])
                            .or_else(|| crossing(smoothed[[r + o + 1, c + o]]));
                        match level {
                            Some(level) => out[[0, r, c]] = level,
                            None => mask[[0, r, c]] = 0,
                        }
                    }
                }
            }
        }

        block.set_output_values(request, &out);
        block.set_output_mask(mask);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use approx::assert_relative_eq;
    use rasterfn_core::ParamValue;

    fn run(pairs: &[(&str, ParamValue)], dem: Array3<f64>, n: usize) -> (Array3<f64>, Array3<u8>) {
        let mut plugin = Contour::default();
        let inputs = vec![("raster", single(info(1, PixelType::F32, n, n)))];
        let (_, out_info) = setup(&mut plugin, pairs, inputs).unwrap();
        let mut block = PixelBlock::new();
        block.insert_raster("raster", pixels(PixelType::F32, dem, None));
        plugin.update_pixels(&request(&out_info, n, n), &mut block).unwrap();
        let (px, mask) = outputs(&block);
        (px, mask.unwrap())
    }

    #[test]
    fn test_contour_crossing() {
        assert_eq!(contour_crossing(5.0, 15.0, 10.0, 0.0), Some(10.0));
        assert_eq!(contour_crossing(11.0, 19.0, 10.0, 0.0), None);
        assert_eq!(contour_crossing(10.0, 10.0, 10.0, 0.0), None);
        assert_eq!(contour_crossing(3.0, 8.0, 5.0, 2.0), Some(7.0));
    }

    #[test]
    fn test_kernel_is_normalized() {
        assert_relative_eq!(gaussian_kernel(2).sum(), 1.0, epsilon = 1e-12);
        assert_eq!(gaussian_kernel(0), Array2::<f64>::ones((1, 1)));
    }

    #[test]
    fn test_lines_on_a_ramp() {
        // Padding 1, so output row r sits on input row r + 1 = 4 * (r + 1)
        let dem = Array3::from_shape_fn((1, 6, 6), |(_, r, _)| r as f64 * 4.0);
        let (px, mask) = run(&[("radius", 0.into())], dem, 4);
        for c in 0..4 {
            assert_eq!(mask[[0, 0, c]], 0);
            assert_eq!((mask[[0, 1, c]], px[[0, 1, c]]), (1, 10.0));
            assert_eq!(mask[[0, 2, c]], 0);
            assert_eq!((mask[[0, 3, c]], px[[0, 3, c]]), (1, 20.0));
        }
    }

    #[test]
    fn test_smoothing_only_preserves_flat() {
        let (px, mask) = run(
            &[("mode", "Smoothing Only".into()), ("radius", 2.into())],
            Array3::from_elem((1, 8, 8), 42.0),
            4,
        );
        assert_eq!(mask.sum(), 16);
        for v in px.iter() {
            assert_relative_eq!(*v, 42.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut plugin = Contour::default();
        let s = scalars(&plugin, &[("interval", 0.0.into())]).unwrap();
        assert!(plugin.configuration(&s).is_err());
    }
}
