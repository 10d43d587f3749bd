//! Normalized Difference Vegetation Index
//!
//! `NDVI = (NIR - Red) / (NIR + Red)`, in [-1, 1]. The scaled forms map it
//! to `100 * NDVI + 100`, an unsigned byte in [0, 200].

use crate::bind::band_index;
use ndarray::{Array3, Axis, Zip};
use rasterfn_colormap::{ColorScheme, ramp_colormap};
use rasterfn_core::prelude::*;
use rasterfn_core::raster::neighborhood::collapse_bands;
use tracing::debug;

/// How NDVI values are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NdviOutput {
    /// 32-bit float in [-1, 1]
    #[default]
    Raw,
    /// Unsigned byte `100 * NDVI + 100`
    Grayscale,
    /// Same values as `Grayscale`, with an NDVI colormap attached
    Colormap,
}

impl NdviOutput {
    fn parse(method: &str) -> Result<Self> {
        match method {
            "raw" => Ok(NdviOutput::Raw),
            "grayscale" => Ok(NdviOutput::Grayscale),
            "colormap" => Ok(NdviOutput::Colormap),
            other => Err(Error::binding("method", format!("unknown output `{other}`"))),
        }
    }

    fn scale(&self, ndvi: f64) -> f64 {
        match self {
            NdviOutput::Raw => ndvi,
            NdviOutput::Grayscale | NdviOutput::Colormap => 100.0 * ndvi + 100.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ndvi {
    output: NdviOutput,
    /// Zero-based (red, nir) band indices
    bands: (usize, usize),
}

impl RasterFunction for Ndvi {
    fn name(&self) -> &'static str {
        "NDVI"
    }

    fn description(&self) -> &'static str {
        "Normalized Difference Vegetation Index from red and near-infrared bands"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("raster", "Raster")
                .describe("Multispectral raster with red and near-infrared bands"),
            Parameter::numeric("red", "Red Band Index")
                .default(1)
                .describe("1-based index of the red band"),
            Parameter::numeric("ir", "Infrared Band Index")
                .default(2)
                .describe("1-based index of the near-infrared band"),
            Parameter::string("method", "Output")
                .domain(&["Raw", "Grayscale", "Colormap"])
                .default("Raw"),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.bands = (band_index(scalars, "red")?, band_index(scalars, "ir")?);
        self.output = NdviOutput::parse(scalars.text("method")?)?;

        Ok(Configuration::new()
            .extract_bands(vec![self.bands.0, self.bands.1])
            .inherit(Inherit::DIMENSIONS | Inherit::RESAMPLING)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM)
            .input_mask(true)
            .resampling(true))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let input = args.raster("raster")?;
        let available = input.info.band_count;
        let (red, ir) = self.bands;
        if red.max(ir) >= available {
            return Err(Error::Compatibility(format!(
                "band {} requested from a {available}-band raster",
                red.max(ir) + 1
            )));
        }

        let mut info = args.output_info;
        info.set_band_count(1);
        info.no_data = None;
        match self.output {
            NdviOutput::Raw => {
                info.pixel_type = PixelType::F32;
                info.set_statistics_range(-1.0, 1.0);
            }
            NdviOutput::Grayscale | NdviOutput::Colormap => {
                info.pixel_type = PixelType::U8;
                info.set_statistics_range(0.0, 200.0);
            }
        }
        if self.output == NdviOutput::Colormap {
            info.colormap = Some(ramp_colormap(ColorScheme::Ndvi, 0..=200));
        }
        debug!(output = ?self.output, red, ir, "ndvi refined");
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let input = block.raster("raster")?;
        let values = input.values();
        if values.dim().0 != 2 {
            return Err(Error::Protocol(format!(
                "expected the red and infrared bands, got {} bands",
                values.dim().0
            )));
        }
        let mut mask = collapse_bands(input.mask_or_valid().view());
        let mut out = Array3::<f64>::zeros(mask.dim());
        let output = self.output;

        Zip::from(out.index_axis_mut(Axis(0), 0))
            .and(mask.index_axis_mut(Axis(0), 0))
            .and(values.index_axis(Axis(0), 0))
            .and(values.index_axis(Axis(0), 1))
            .for_each(|o, m, &red, &nir| {
                let sum = nir + red;
                if *m == 0 || sum.abs() < 1e-10 {
                    *m = 0;
                    return;
                }
                *o = output.scale((nir - red) / sum);
            });

        block.set_output_values(request, &out);
        block.set_output_mask(mask);
        Ok(())
    }

    fn update_key_metadata(
        &self,
        query: &MetadataQuery,
        mut metadata: KeyMetadata,
    ) -> Result<KeyMetadata> {
        match query.scope {
            MetadataScope::Dataset => {
                if query.wants(names::DATA_TYPE) {
                    metadata.insert(names::DATA_TYPE, "Processed");
                }
            }
            MetadataScope::Band(0) => {
                metadata.insert(names::BAND_NAME, "NDVI");
                metadata.reset(names::WAVELENGTH_MIN);
                metadata.reset(names::WAVELENGTH_MAX);
            }
            MetadataScope::Band(_) => {}
        }
        Ok(metadata)
    }
}
