//! Hillshade (shaded relief) calculation
//!
//! Creates a shaded relief visualization from a DEM based on
//! illumination angle and direction. Gradients use Horn's 3x3 method at the
//! requested cell size, so each tile asks for a one-pixel halo.

use ndarray::{Array3, ArrayView2, s};
use rasterfn_core::prelude::*;
use rasterfn_core::raster::neighborhood::and_over_window;
use std::f64::consts::PI;

/// Hillshade algorithm
#[derive(Debug, Clone)]
pub struct Hillshade {
    /// Sun azimuth in degrees (0 = North, clockwise)
    azimuth: f64,
    /// Sun altitude in degrees above horizon (0-90)
    altitude: f64,
    /// Vertical exaggeration
    z_factor: f64,
}

impl Default for Hillshade {
    fn default() -> Self {
        Self {
            azimuth: 315.0,
            altitude: 45.0,
            z_factor: 1.0,
        }
    }
}

/// Illumination geometry precomputed from the sun position
struct Illumination {
    azimuth: f64,
    cos_zenith: f64,
    sin_zenith: f64,
}

impl Illumination {
    fn new(azimuth_deg: f64, altitude_deg: f64) -> Self {
        let zenith = (90.0 - altitude_deg).to_radians();
        Self {
            azimuth: (360.0 - azimuth_deg + 90.0).to_radians(),
            cos_zenith: zenith.cos(),
            sin_zenith: zenith.sin(),
        }
    }

    /// Shade in [0, 1] for the given surface gradients
    fn shade(&self, dz_dx: f64, dz_dy: f64) -> f64 {
        let slope = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan();
        let aspect = if dz_dx.abs() < 1e-10 && dz_dy.abs() < 1e-10 {
            0.0
        } else {
            let a = dz_dy.atan2(-dz_dx);
            if a < 0.0 { 2.0 * PI + a } else { a }
        };
        let shade = self.cos_zenith * slope.cos()
            + self.sin_zenith * slope.sin() * (self.azimuth - aspect).cos();
        shade.clamp(0.0, 1.0)
    }
}

impl RasterFunction for Hillshade {
    fn name(&self) -> &'static str {
        "Hillshade"
    }

    fn description(&self) -> &'static str {
        "Calculate shaded relief from a DEM"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("raster", "DEM")
                .describe("Elevation raster; only the first band is used"),
            Parameter::numeric("azimuth", "Azimuth")
                .default(315.0)
                .describe("Sun azimuth in degrees clockwise from north"),
            Parameter::numeric("altitude", "Altitude")
                .default(45.0)
                .describe("Sun altitude in degrees above the horizon"),
            Parameter::numeric("zfactor", "Z Factor").default(1.0),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.azimuth = scalars.number("azimuth")?;
        self.altitude = scalars.number("altitude")?;
        self.z_factor = scalars.number("zfactor")?;
        if !(0.0..=90.0).contains(&self.altitude) {
            return Err(Error::binding("altitude", format!("{} is outside 0..=90", self.altitude)));
        }
        if self.z_factor <= 0.0 {
            return Err(Error::binding("zfactor", "must be positive"));
        }

        Ok(Configuration::new()
            .extract_bands(vec![0])
            .inherit(Inherit::DIMENSIONS | Inherit::RESAMPLING)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM | Invalidate::KEY_METADATA)
            .padding(1)
            .input_mask(true)
            .resampling(true))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let mut info = args.output_info;
        info.set_band_count(1);
        info.pixel_type = PixelType::U8;
        info.no_data = None;
        info.set_statistics_range(0.0, 255.0);
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let input = block.raster("raster")?;
        let (rows, cols) = (request.rows(), request.cols());
        let expected = (1, rows + 2, cols + 2);
        if input.shape() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: input.shape(),
            });
        }

        let dem = input.values();
        let mask = and_over_window(input.mask_or_valid().view(), 1)?;
        let sun = Illumination::new(self.azimuth, self.altitude);
        let cell = request.props.cell_size;
        let (eight_dx, eight_dy) = (8.0 * cell.x, 8.0 * cell.y);

        let mut out = Array3::<f64>::zeros((1, rows, cols));
        for row in 0..rows {
            for col in 0..cols {
                if mask[[0, row, col]] == 0 {
                    continue;
                }
                // 3x3 window: a b c / d e f / g h i
                let w: ArrayView2<f64> = dem.slice(s![0, row..row + 3, col..col + 3]);
                let (a, b, c) = (w[[0, 0]], w[[0, 1]], w[[0, 2]]);
                let (d, f) = (w[[1, 0]], w[[1, 2]]);
                let (g, h, i) = (w[[2, 0]], w[[2, 1]], w[[2, 2]]);

                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_dx * self.z_factor;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_dy * self.z_factor;
                out[[0, row, col]] = (sun.shade(dz_dx, dz_dy) * 255.0).round();
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

    fn run(
        dem: Array3<f64>,
        mask: Option<Array3<u8>>,
        pairs: &[(&str, rasterfn_core::ParamValue)],
    ) -> (Array3<f64>, Array3<u8>) {
        let mut plugin = Hillshade::default();
        let inputs = vec![("raster", single(info(1, PixelType::F32, 4, 4)))];
        let (config, out_info) = setup(&mut plugin, pairs, inputs).unwrap();
        assert_eq!(config.padding, 1);
        assert_eq!(out_info.pixel_type, PixelType::U8);

        let mut block = PixelBlock::new();
        block.insert_raster("raster", pixels(PixelType::F32, dem, mask));
        plugin.update_pixels(&request(&out_info, 4, 4), &mut block).unwrap();
        let (px, mask) = outputs(&block);
        (px, mask.unwrap())
    }

    #[test]
    fn test_hillshade_flat() {
        let (px, mask) = run(Array3::from_elem((1, 6, 6), 100.0), None, &[]);
        // cos(45 deg) * 255
        assert!(px.iter().all(|&v| v == 180.0));
        assert_eq!(mask.sum(), 16);
    }

    #[test]
    fn test_slope_facing_the_sun_is_brighter() {
        // rises to the south-east, so it faces the default north-west sun
        let toward = Array3::from_shape_fn((1, 6, 6), |(_, r, c)| (r + c) as f64 * 10.0);
        let away = toward.mapv(|z| 100.0 - z);
        let (lit, _) = run(toward, None, &[]);
        let (shaded, _) = run(away, None, &[]);
        assert!(lit.iter().all(|&v| v == 193.0), "{lit:?}");
        assert!(shaded.iter().all(|&v| v < 180.0), "{shaded:?}");
        assert!(lit.iter().zip(shaded.iter()).all(|(l, s)| l > s));
    }

    #[test]
    fn test_hillshade_range() {
        let dem =
            Array3::from_shape_fn((1, 6, 6), |(_, r, c)| ((r * 7 + c * 13) % 11) as f64 * 25.0);
        let (px, _) = run(dem, None, &[("zfactor", 3.0.into())]);
        assert!(px.iter().all(|&v| (0.0..=255.0).contains(&v)));
    }

    #[test]
    fn test_invalid_neighbor_masks_window() {
        let mut m = Array3::<u8>::ones((1, 6, 6));
        m[[0, 0, 0]] = 0;
        let (px, mask) = run(Array3::from_elem((1, 6, 6), 5.0), Some(m), &[]);
        assert_eq!(mask[[0, 0, 0]], 0);
        assert_eq!(px[[0, 0, 0]], 0.0);
        assert_eq!(mask.sum(), 15);
    }

    #[test]
    fn test_rejects_bad_altitude() {
        let mut plugin = Hillshade::default();
        let err = setup(
            &mut plugin,
            &[("altitude", 95.0.into())],
            vec![("raster", single(info(1, PixelType::F32, 4, 4)))],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Binding { .. }));
    }
}
