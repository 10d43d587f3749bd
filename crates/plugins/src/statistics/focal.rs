//! Focal (moving window) statistics
//!
//! Computes a statistic within a window centered on each cell. The window
//! is square, or circular when `circular` is set; its radius is also the
//! tile padding.

use ndarray::Array3;
use rasterfn_core::prelude::*;
use rasterfn_core::raster::neighborhood::{Neighborhood, and_over_window};

use crate::bind::whole_number;
use crate::reduce::Reducer;

/// Statistic names accepted by `statistic`
pub const FOCAL_STATISTICS: &[&str] = &[
    "Mean",
    "Minimum",
    "Maximum",
    "Range",
    "Standard Deviation",
    "Sum",
    "Median",
];

#[derive(Debug, Clone)]
pub struct FocalStatistics {
    neighborhood: Neighborhood,
    statistic: Reducer,
}

impl Default for FocalStatistics {
    fn default() -> Self {
        Self {
            neighborhood: Neighborhood::Square(1),
            statistic: Reducer::Mean,
        }
    }
}

impl RasterFunction for FocalStatistics {
    fn name(&self) -> &'static str {
        "Focal Statistics"
    }

    fn description(&self) -> &'static str {
        "Moving window statistics over each band"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("raster", "Raster"),
            Parameter::numeric("radius", "Radius")
                .default(1)
                .describe("Window half-width in cells"),
            Parameter::string("statistic", "Statistic")
                .domain(FOCAL_STATISTICS)
                .default("Mean"),
            Parameter::boolean("circular", "Circular Window").default(false),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        let radius = whole_number(scalars, "radius", 1)?;
        self.statistic = Reducer::parse(scalars.text("statistic")?)?;
        self.neighborhood = if scalars.flag("circular")? {
            Neighborhood::Circle(radius)
        } else {
            Neighborhood::Square(radius)
        };
        Ok(Configuration::new()
            .inherit(Inherit::DIMENSIONS)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM)
            .padding(radius)
            .input_mask(true)
            .resampling(false))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let mut info = args.output_info;
        info.pixel_type = PixelType::F32;
        info.no_data = None;
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let input = block.raster("raster")?;
        let k = self.neighborhood.radius();
        let (bands, rows, cols) = request.shape;
        let expected = (bands, rows + 2 * k, cols + 2 * k);
        if input.shape() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: input.shape(),
            });
        }

        let values = input.values();
        let mask = and_over_window(input.mask_or_valid().view(), k)?;
        let offsets = self.neighborhood.offsets();
        let mut out = Array3::<f64>::zeros(request.shape);
        let mut window = Vec::with_capacity(offsets.len());
        for ((b, r, c), o) in out.indexed_iter_mut() {
            if mask[[b, r, c]] == 0 {
                continue;
            }
            // (r + k, c + k) is the window center in the padded block
            window.clear();
            window.extend(offsets.iter().map(|&(dr, dc)| {
                let rr = (r + k) as isize + dr;
                let cc = (c + k) as isize + dc;
                values[[b, rr as usize, cc as usize]]
            }));
            *o = self.statistic.apply(&mut window).unwrap_or(0.0);
        }

        block.set_output_values(request, &out);
        block.set_output_mask(mask);
        Ok(())
    }
}
