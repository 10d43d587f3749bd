//! RGB to single-band grayscale

use ndarray::{Array3, Axis, Zip};
use rasterfn_core::prelude::*;
use rasterfn_core::raster::neighborhood::collapse_bands;

/// Channel weights for the conversion
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GrayWeights {
    /// ITU-R BT.601 luma
    #[default]
    Luminance,
    Average,
}

impl GrayWeights {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "luminance" => Ok(GrayWeights::Luminance),
            "average" => Ok(GrayWeights::Average),
            other => Err(Error::binding("weights", format!("unknown weighting `{other}`"))),
        }
    }

    fn coefficients(&self) -> [f64; 3] {
        match self {
            GrayWeights::Luminance => [0.299, 0.587, 0.114],
            GrayWeights::Average => [1.0 / 3.0; 3],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Grayscale {
    weights: GrayWeights,
}

impl RasterFunction for Grayscale {
    fn name(&self) -> &'static str {
        "Grayscale"
    }

    fn description(&self) -> &'static str {
        "Converts a three-band RGB raster to one band of brightness"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("raster", "RGB Raster")
                .bands(3)
                .describe("Three-band raster in red, green, blue order"),
            Parameter::string("weights", "Weights")
                .domain(&["Luminance", "Average"])
                .default("Luminance"),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.weights = GrayWeights::parse(scalars.text("weights")?)?;
        Ok(Configuration::new()
            .inherit(Inherit::DIMENSIONS | Inherit::RESAMPLING)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM)
            .input_mask(true)
            .resampling(true))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let bands = args.raster("raster")?.info.band_count;
        if bands != 3 {
            return Err(Error::binding(
                "raster",
                format!("expected a 3-band RGB raster, got {bands} bands"),
            ));
        }
        let mut info = args.output_info;
        info.set_band_count(1);
        info.pixel_type = PixelType::U8;
        info.no_data = None;
        info.set_statistics_range(0.0, 255.0);
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let input = block.raster("raster")?;
        let rgb = input.values();
        if rgb.dim().0 != 3 {
            return Err(Error::Protocol(format!("expected 3 bands, got {}", rgb.dim().0)));
        }
        let [wr, wg, wb] = self.weights.coefficients();
        let mask = collapse_bands(input.mask_or_valid().view());
        let mut out = Array3::<f64>::zeros(mask.dim());

        Zip::from(out.index_axis_mut(Axis(0), 0))
            .and(rgb.index_axis(Axis(0), 0))
            .and(rgb.index_axis(Axis(0), 1))
            .and(rgb.index_axis(Axis(0), 2))
            .for_each(|o, &r, &g, &b| *o = wr * r + wg * g + wb * b);

        block.set_output_values(request, &out);
        block.set_output_mask(mask);
        Ok(())
    }
}
