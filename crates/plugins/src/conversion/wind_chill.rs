//! Wind chill from air temperature and wind speed (NWS 2001 formula)

use ndarray::Zip;
use rasterfn_core::prelude::*;

use super::paired;
use super::units::{TEMPERATURE_UNITS, Temperature, WIND_UNITS, WindSpeed};

#[derive(Debug, Clone, Default)]
pub struct WindChill {
    temp_units: Temperature,
    wind_units: WindSpeed,
    output_units: Temperature,
}

/// Wind chill in degF for temperature `t` (degF) and wind speed `v` (mph).
///
/// Defined for `t <= 50` and `v >= 3`; outside that range the air
/// temperature is returned unchanged.
pub fn wind_chill(t: f64, v: f64) -> f64 {
    if t > 50.0 || v < 3.0 {
        return t;
    }
    let vp = v.powf(0.16);
    35.74 + 0.6215 * t - 35.75 * vp + 0.4275 * t * vp
}

impl RasterFunction for WindChill {
    fn name(&self) -> &'static str {
        "Wind Chill"
    }

    fn description(&self) -> &'static str {
        "Apparent temperature from air temperature and wind speed"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("temperature", "Temperature Raster"),
            Parameter::raster("windspeed", "Wind Speed Raster"),
            Parameter::string("tempunits", "Temperature Units")
                .domain(TEMPERATURE_UNITS)
                .default("Fahrenheit"),
            Parameter::string("windunits", "Wind Speed Units")
                .domain(WIND_UNITS)
                .default("mi/h"),
            Parameter::string("outputunits", "Output Units")
                .domain(TEMPERATURE_UNITS)
                .default("Fahrenheit"),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.temp_units = Temperature::parse("tempunits", scalars.text("tempunits")?)?;
        self.wind_units = WindSpeed::parse("windunits", scalars.text("windunits")?)?;
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
        let (mut t, wind, mask) = paired(block, request, "temperature", "windspeed")?;
        Zip::from(&mut t).and(&wind).and(&mask).for_each(|t, &w, &m| {
            *t = if m != 0 {
                let wc = wind_chill(self.temp_units.to_fahrenheit(*t), self.wind_units.to_mph(w));
                self.output_units.from_fahrenheit(wc)
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
            metadata.insert(names::VARIABLE, "WindChill");
            metadata.insert(names::UNIT, self.output_units.symbol());
        }
        Ok(metadata)
    }
}
