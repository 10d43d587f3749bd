//! Host-side knobs

use crate::strategy::ProcessingMode;
use rasterfn_core::{ProductInfo, Result};
use serde::{Deserialize, Serialize};

/// Options of the reference host.
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostOptions {
    /// Edge length, in output pixels, of the tiles used by `render`
    pub tile_size: usize,
    /// How independent sessions are scheduled
    pub mode: ProcessingMode,
    /// Product descriptor handed to license checks
    pub product: ProductInfo,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            tile_size: 256,
            mode: ProcessingMode::default(),
            product: ProductInfo::default(),
        }
    }
}

impl HostOptions {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
