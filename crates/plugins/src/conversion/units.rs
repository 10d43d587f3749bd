//! Temperature and wind speed units

use rasterfn_core::{Error, Result};

pub const TEMPERATURE_UNITS: &[&str] = &["Celsius", "Fahrenheit", "Kelvin"];
pub const WIND_UNITS: &[&str] = &["mi/h", "kph", "m/s", "knots", "fps"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Temperature {
    Celsius,
    #[default]
    Fahrenheit,
    Kelvin,
}

impl Temperature {
    pub fn parse(param: &str, name: &str) -> Result<Self> {
        match name {
            "celsius" => Ok(Temperature::Celsius),
            "fahrenheit" => Ok(Temperature::Fahrenheit),
            "kelvin" => Ok(Temperature::Kelvin),
            other => Err(Error::binding(param, format!("unknown temperature unit `{other}`"))),
        }
    }

    pub fn to_fahrenheit(&self, t: f64) -> f64 {
        match self {
            Temperature::Celsius => t * 9.0 / 5.0 + 32.0,
            Temperature::Fahrenheit => t,
            Temperature::Kelvin => (t - 273.15) * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn from_fahrenheit(&self, f: f64) -> f64 {
        match self {
            Temperature::Celsius => (f - 32.0) * 5.0 / 9.0,
            Temperature::Fahrenheit => f,
            Temperature::Kelvin => (f - 32.0) * 5.0 / 9.0 + 273.15,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Temperature::Celsius => "degC",
            Temperature::Fahrenheit => "degF",
            Temperature::Kelvin => "K",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindSpeed {
    #[default]
    MilesPerHour,
    Kph,
    MetersPerSecond,
    Knots,
    FeetPerSecond,
}

impl WindSpeed {
    pub fn parse(param: &str, name: &str) -> Result<Self> {
        match name {
            "mi/h" => Ok(WindSpeed::MilesPerHour),
            "kph" => Ok(WindSpeed::Kph),
            "m/s" => Ok(WindSpeed::MetersPerSecond),
            "knots" => Ok(WindSpeed::Knots),
            "fps" => Ok(WindSpeed::FeetPerSecond),
            other => Err(Error::binding(param, format!("unknown wind speed unit `{other}`"))),
        }
    }

    pub fn to_mph(&self, v: f64) -> f64 {
        match self {
            WindSpeed::MilesPerHour => v,
            WindSpeed::Kph => v / 1.609344,
            WindSpeed::MetersPerSecond => v * 2.2369363,
            WindSpeed::Knots => v * 1.150779,
            WindSpeed::FeetPerSecond => v * 0.6818182,
        }
    }
}
