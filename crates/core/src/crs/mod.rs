//! Spatial reference handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Spatial reference of a raster, identified by its EPSG code.
///
/// Projection math lives in the host; plugins only compare references.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpatialReference {
    /// EPSG code (0 = unknown)
    pub epsg: i32,
    /// WKT representation, when the host supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkt: Option<String>,
}

impl SpatialReference {
    /// Create a spatial reference from an EPSG code
    pub fn from_epsg(code: i32) -> Self {
        Self {
            epsg: code,
            wkt: None,
        }
    }

    /// WGS84 geographic (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    pub fn is_known(&self) -> bool {
        self.epsg > 0 || self.wkt.is_some()
    }

    /// Check if two references describe the same system
    pub fn is_equivalent(&self, other: &SpatialReference) -> bool {
        if self.epsg > 0 && other.epsg > 0 {
            return self.epsg == other.epsg;
        }
        match (&self.wkt, &other.wkt) {
            (Some(a), Some(b)) => a == b,
            _ => !self.is_known() && !other.is_known(),
        }
    }

    /// String identifier for log messages
    pub fn identifier(&self) -> String {
        if self.epsg > 0 {
            return format!("EPSG:{}", self.epsg);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", wkt.chars().take(50).collect::<String>());
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}
