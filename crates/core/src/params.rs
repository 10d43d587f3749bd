//! Parameter schema and scalar binding
//!
//! A plugin declares its inputs as an ordered list of [`Parameter`]s. The
//! host collects values for them and binds the scalar ones with
//! [`bind_scalars`]; raster inputs are bound by the host itself.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Data type of a declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Numeric,
    String,
    Raster,
    Rasters,
    Boolean,
}

impl DataType {
    pub fn is_raster(&self) -> bool {
        matches!(self, DataType::Raster | DataType::Rasters)
    }
}

/// A scalar value supplied for, or defaulted by, a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Number(v) => write!(f, "{v}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Declaration of one plugin input slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub data_type: DataType,
    /// Default value, used when the host supplies none
    pub value: Option<ParamValue>,
    pub required: bool,
    pub display_name: String,
    pub description: String,
    /// Allowed strings (only for `DataType::String`)
    pub domain: Option<Vec<String>>,
    /// Fixed band count a raster input must present to the kernel
    pub bands: Option<usize>,
}

impl Parameter {
    fn of(name: &str, display_name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            value: None,
            required: false,
            display_name: display_name.to_string(),
            description: String::new(),
            domain: None,
            bands: None,
        }
    }

    pub fn numeric(name: &str, display_name: &str) -> Self {
        Self::of(name, display_name, DataType::Numeric)
    }

    pub fn string(name: &str, display_name: &str) -> Self {
        Self::of(name, display_name, DataType::String)
    }

    pub fn boolean(name: &str, display_name: &str) -> Self {
        Self::of(name, display_name, DataType::Boolean)
    }

    /// A single required raster input
    pub fn raster(name: &str, display_name: &str) -> Self {
        Self::of(name, display_name, DataType::Raster).required()
    }

    /// An ordered collection of raster inputs
    pub fn rasters(name: &str, display_name: &str) -> Self {
        Self::of(name, display_name, DataType::Rasters).required()
    }

    pub fn default(mut self, value: impl Into<ParamValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn domain<S: AsRef<str>>(mut self, values: &[S]) -> Self {
        self.domain = Some(values.iter().map(|v| v.as_ref().to_string()).collect());
        self
    }

    /// Require a raster input with exactly `count` bands
    pub fn bands(mut self, count: usize) -> Self {
        self.bands = Some(count);
        self
    }

    /// Check the declaration itself: domains only on strings, and a
    /// default that belongs to the domain.
    pub fn validate(&self) -> Result<()> {
        let Some(domain) = &self.domain else {
            return Ok(());
        };
        if self.data_type != DataType::String {
            return Err(Error::binding(
                &self.name,
                format!("a domain is only allowed on string parameters, not {:?}", self.data_type),
            ));
        }
        if let Some(default) = &self.value {
            let text = default.to_string();
            if !domain.iter().any(|d| d.eq_ignore_ascii_case(&text)) {
                return Err(Error::binding(
                    &self.name,
                    format!("default `{text}` is not in its own domain {domain:?}"),
                ));
            }
        }
        Ok(())
    }

    /// Normalize and type-check one supplied value
    fn coerce(&self, value: &ParamValue) -> Result<ParamValue> {
        match (self.data_type, value) {
            (DataType::Numeric, ParamValue::Number(v)) => Ok(ParamValue::Number(*v)),
            (DataType::Numeric, ParamValue::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(ParamValue::Number)
                .map_err(|_| Error::binding(&self.name, format!("`{s}` is not a number"))),
            (DataType::Boolean, ParamValue::Bool(b)) => Ok(ParamValue::Bool(*b)),
            (DataType::Boolean, ParamValue::Number(v)) if *v == 0.0 || *v == 1.0 => {
                Ok(ParamValue::Bool(*v == 1.0))
            }
            (DataType::Boolean, ParamValue::Text(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(ParamValue::Bool(true)),
                "false" => Ok(ParamValue::Bool(false)),
                _ => Err(Error::binding(&self.name, format!("`{s}` is not a boolean"))),
            },
            (DataType::String, v) => {
                let text = v.to_string();
                match &self.domain {
                    Some(domain) => {
                        if domain.iter().any(|d| d.eq_ignore_ascii_case(text.trim())) {
                            Ok(ParamValue::Text(text.trim().to_lowercase()))
                        } else {
                            Err(Error::binding(
                                &self.name,
                                format!("`{text}` is not one of {domain:?}"),
                            ))
                        }
                    }
                    None => Ok(ParamValue::Text(text)),
                }
            }
            (DataType::Raster | DataType::Rasters, v) => Err(Error::binding(
                &self.name,
                format!("expected a raster, got scalar `{v}`"),
            )),
            (expected, v) => Err(Error::binding(
                &self.name,
                format!("expected {expected:?}, got `{v}`"),
            )),
        }
    }
}

/// Bound scalar values, keyed by parameter name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scalars(BTreeMap<String, ParamValue>);

impl Scalars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Numeric value of `name`
    pub fn number(&self, name: &str) -> Result<f64> {
        match self.get(name) {
            Some(ParamValue::Number(v)) => Ok(*v),
            Some(other) => Err(Error::binding(name, format!("`{other}` is not a number"))),
            None => Err(Error::binding(name, "no value bound")),
        }
    }

    /// Numeric value of `name`, or `None` when unbound
    pub fn number_opt(&self, name: &str) -> Result<Option<f64>> {
        if self.contains(name) {
            self.number(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Text value of `name` (domain values are already lowercase)
    pub fn text(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(ParamValue::Text(s)) => Ok(s),
            Some(other) => Err(Error::binding(name, format!("`{other}` is not a string"))),
            None => Err(Error::binding(name, "no value bound")),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            Some(ParamValue::Bool(b)) => Ok(*b),
            Some(other) => Err(Error::binding(name, format!("`{other}` is not a boolean"))),
            None => Err(Error::binding(name, "no value bound")),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, ParamValue)> for Scalars {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Scalars(iter.into_iter().collect())
    }
}

/// Bind host-supplied scalar values against a schema.
///
/// Missing optional scalars resolve to their default; a missing required
/// scalar, an unknown name, or a value outside its domain fails the whole
/// binding. Raster parameters are skipped here.
pub fn bind_scalars(
    schema: &[Parameter],
    supplied: &BTreeMap<String, ParamValue>,
) -> Result<Scalars> {
    for name in supplied.keys() {
        let Some(param) = schema.iter().find(|p| &p.name == name) else {
            return Err(Error::binding(name, "not declared by this function"));
        };
        if param.data_type.is_raster() {
            return Err(Error::binding(name, "raster parameters cannot take scalar values"));
        }
    }

    let mut bound = Scalars::new();
    for param in schema.iter().filter(|p| !p.data_type.is_raster()) {
        match supplied.get(&param.name).or(param.value.as_ref()) {
            Some(value) => {
                let value = param.coerce(value)?;
                bound.0.insert(param.name.clone(), value);
            }
            None if param.required => {
                return Err(Error::binding(&param.name, "required parameter has no value"));
            }
            None => {}
        }
    }
    Ok(bound)
}
