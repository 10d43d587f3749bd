//! Key metadata: loosely typed dataset- and band-level attributes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known key metadata names
pub mod names {
    pub const DATA_TYPE: &str = "datatype";
    pub const BAND_NAME: &str = "bandname";
    pub const WAVELENGTH_MIN: &str = "wavelengthmin";
    pub const WAVELENGTH_MAX: &str = "wavelengthmax";
    pub const ACQUISITION_DATE: &str = "acquisitiondate";
    pub const STD_TIME: &str = "stdtime";
    pub const SENSOR_NAME: &str = "sensorname";
    pub const SUN_AZIMUTH: &str = "sunazimuth";
    pub const SUN_ELEVATION: &str = "sunelevation";
    pub const CLOUD_COVER: &str = "cloudcover";
    pub const VARIABLE: &str = "variable";
    pub const UNIT: &str = "unit";
}

/// A key metadata value: scalar, string, small tuple, or unset
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Unset; writing it resets the field
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<MetaValue>),
}

impl MetaValue {
    pub fn is_null(&self) -> bool {
        matches!(self, MetaValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Number(v) => Some(*v),
            MetaValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Null => f.write_str("null"),
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Number(v) => write!(f, "{v}"),
            MetaValue::Text(s) => f.write_str(s),
            MetaValue::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Number(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

/// Mapping from lowercase name to value.
///
/// Keys are lowercased on every insert and lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyMetadata(BTreeMap<String, MetaValue>);

impl KeyMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&MetaValue> {
        self.0.get(&name.to_lowercase())
    }

    /// Value of `name` unless it is absent or unset
    pub fn get_set(&self, name: &str) -> Option<&MetaValue> {
        self.get(name).filter(|v| !v.is_null())
    }

    pub fn insert(&mut self, name: &str, value: impl Into<MetaValue>) -> Option<MetaValue> {
        self.0.insert(name.to_lowercase(), value.into())
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<MetaValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Mark `name` as unset
    pub fn reset(&mut self, name: &str) {
        self.0.insert(name.to_lowercase(), MetaValue::Null);
    }

    pub fn remove(&mut self, name: &str) -> Option<MetaValue> {
        self.0.remove(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keep only `names`; an empty list keeps everything
    pub fn filtered(&self, names: &[String]) -> KeyMetadata {
        if names.is_empty() {
            return self.clone();
        }
        let wanted: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
        KeyMetadata(
            self.0
                .iter()
                .filter(|(k, _)| wanted.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Drop every unset entry
    pub fn without_nulls(mut self) -> KeyMetadata {
        self.0.retain(|_, v| !v.is_null());
        self
    }
}

impl FromIterator<(String, MetaValue)> for KeyMetadata {
    fn from_iter<I: IntoIterator<Item = (String, MetaValue)>>(iter: I) -> Self {
        KeyMetadata(iter.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect())
    }
}

/// Where a metadata query is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataScope {
    Dataset,
    Band(usize),
}

impl MetadataScope {
    /// From the wire band index: `-1` is the dataset, `n >= 0` a band
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            -1 => Some(MetadataScope::Dataset),
            n if n >= 0 => Some(MetadataScope::Band(n as usize)),
            _ => None,
        }
    }

    pub fn index(&self) -> i64 {
        match self {
            MetadataScope::Dataset => -1,
            MetadataScope::Band(n) => *n as i64,
        }
    }
}

/// Dataset-level metadata plus one map per band
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub dataset: KeyMetadata,
    pub bands: Vec<KeyMetadata>,
}

impl DatasetMetadata {
    pub fn new(dataset: KeyMetadata) -> Self {
        Self {
            dataset,
            bands: Vec::new(),
        }
    }

    /// Map for `scope`; an unknown band yields an empty map
    pub fn scoped(&self, scope: MetadataScope) -> KeyMetadata {
        match scope {
            MetadataScope::Dataset => self.dataset.clone(),
            MetadataScope::Band(n) => self.bands.get(n).cloned().unwrap_or_default(),
        }
    }

    /// Metadata of the bands listed, in order
    pub fn select_bands(&self, bands: &[usize]) -> DatasetMetadata {
        DatasetMetadata {
            dataset: self.dataset.clone(),
            bands: bands
                .iter()
                .map(|&b| self.bands.get(b).cloned().unwrap_or_default())
                .collect(),
        }
    }
}
