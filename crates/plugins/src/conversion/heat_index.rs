//! Heat index (apparent temperature) from air temperature and relative humidity
//!
//! Follows the NWS procedure: the simple Steadman estimate, replaced by the
//! Rothfusz regression with its low- and high-humidity adjustments once the
//! estimate reaches 80 degF.

use ndarray::Zip;
use rasterfn_core::prelude::*;

use super::paired;
use super::units::{TEMPERATURE_UNITS, Temperature};

#[derive(Debug, Clone, Default)]
pub struct HeatIndex {
    units: Temperature,
    output_units: Temperature,
}

/// Heat index in degF for temperature `t` (degF) and relative humidity `rh` (%)
pub fn heat_index(t: f64, rh: f64) -> f64 {
    let simple = 0.5 * (t + 61.0 + (t - 68.0) * 1.2 + rh * 0.094);
    if (simple + t) / 2.0 < 80.0 {
        return simple;
    }

    let mut hi = rothfusz(t, rh);
    if rh < 13.0 && (80.0..=112.0).contains(&t) {
        hi -= ((13.0 - rh) / 4.0) * ((17.0 - (t - 95.0).abs()) / 17.0).sqrt();
    } else if rh > 85.0 && (80.0..=87.0).contains(&t) {
        hi += ((rh - 85.0) / 10.0) * ((87.0 - t) / 5.0);
    }
    hi
}

fn rothfusz(t: f64, rh: f64) -> f64 {
    -42.379 + 2.04901523 * t + 10.14333127 * rh
        - 0.22475541 * t * rh
        - 0.00683783 * t * t
        - 0.05481717 * rh * rh
        + 0.00122874 * t * t * rh
        + 0.00085282 * t * rh * rh
        - 0.00000199 * t * t * rh * rh
}

impl RasterFunction for HeatIndex {
    fn name(&self) -> &'static str {
        "Heat Index"
    }

    fn description(&self) -> &'static str {
        "Apparent temperature from air temperature and relative humidity"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("temperature", "Temperature Raster"),
            Parameter::raster("rh", "Relative Humidity Raster")
                .describe("Relative humidity in percent"),
            Parameter::string("units", "Temperature Units")
                .domain(TEMPERATURE_UNITS)
                .default("Fahrenheit"),
            Parameter::string("outputunits", "Output Units")
                .domain(TEMPERATURE_UNITS)
                .default("Fahrenheit"),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.units = Temperature::parse("units", scalars.text("units")?)?;
        self.output_units = Temperature::parse("outputunits", scalars.text("outputunits")?)?;
        Ok(Configuration::new()
            .extract_bands(vec![0])
            .inherit(Inherit::DIMENSIONS | Inherit::RESAMPLING)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM)
            .input_mask(true)
            .resampling(true))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let mut info = args.output_info;
        info.set_band_count(1);
        info.pixel_type = PixelType::F32;
        info.no_data = None;
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let (mut t, rh, mask) = paired(block, request, "temperature", "rh")?;
        Zip::from(&mut t).and(&rh).and(&mask).for_each(|t, &rh, &m| {
            *t = if m != 0 {
                let f = self.units.to_fahrenheit(*t);
                self.output_units.from_fahrenheit(heat_index(f, rh))
            } else {
                0.0
            };
        });
        block.set_output_values(request, &t);
        block.set_output_mask(mask);
        Ok(())
    }

    fn update_key_metadata(
        &self,
        query: &MetadataQuery,
        mut metadata: KeyMetadata,
    ) -> Result<KeyMetadata> {
        if query.scope == MetadataScope::Dataset {
            metadata.insert(names::VARIABLE, "HeatIndex");
            metadata.insert(names::UNIT, self.output_units.symbol());
        }
        Ok(metadata)
    }
}
