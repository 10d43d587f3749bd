//! Configuration a plugin returns once its scalars are bound

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Output properties copied from the primary input
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Inherit: u8 {
        const PIXEL_TYPE = 0b0001;
        const NO_DATA    = 0b0010;
        /// Cell size, extent and spatial reference
        const DIMENSIONS = 0b0100;
        const RESAMPLING = 0b1000;
    }
}

bitflags! {
    /// Parent dataset properties the host must discard because the
    /// plugin changes pixel values
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Invalidate: u8 {
        const XFORM        = 0b0001;
        const STATISTICS   = 0b0010;
        const HISTOGRAM    = 0b0100;
        const KEY_METADATA = 0b1000;
    }
}

impl Default for Inherit {
    fn default() -> Self {
        Inherit::all()
    }
}

impl Default for Invalidate {
    fn default() -> Self {
        Invalidate::empty()
    }
}

/// Flags telling the host how to feed a plugin.
///
/// The defaults inherit everything, invalidate nothing, and request
/// unpadded, mask-less blocks at native resolution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Zero-based bands to pull from every input, in kernel order
    pub extract_bands: Option<Vec<usize>>,
    /// Present a `rasters` parameter as one band-stacked raster
    pub composite_rasters: bool,
    pub inherit_properties: Inherit,
    pub invalidate_properties: Invalidate,
    /// Halo in kernel pixels added to every side of each tile
    pub padding: usize,
    /// Deliver a mask array with every input
    pub input_mask: bool,
    /// Accept blocks at requested (non-native) resolution
    pub resampling: bool,
    /// Key metadata names to prefetch
    pub key_metadata: Vec<String>,
    pub supports_band_selection: bool,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extract_bands(mut self, bands: Vec<usize>) -> Self {
        self.extract_bands = Some(bands);
        self
    }

    pub fn composite_rasters(mut self, on: bool) -> Self {
        self.composite_rasters = on;
        self
    }

    pub fn inherit(mut self, flags: Inherit) -> Self {
        self.inherit_properties = flags;
        self
    }

    pub fn invalidate(mut self, flags: Invalidate) -> Self {
        self.invalidate_properties = flags;
        self
    }

    pub fn padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub fn input_mask(mut self, on: bool) -> Self {
        self.input_mask = on;
        self
    }

    pub fn resampling(mut self, on: bool) -> Self {
        self.resampling = on;
        self
    }

    pub fn key_metadata<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.key_metadata = names.iter().map(|n| n.as_ref().to_lowercase()).collect();
        self
    }

    pub fn band_selection(mut self, on: bool) -> Self {
        self.supports_band_selection = on;
        self
    }

    /// Band count the kernel sees for an input of `native` bands
    pub fn presented_bands(&self, native: usize) -> usize {
        self.extract_bands.as_ref().map_or(native, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Configuration::default();
        assert_eq!(c.inherit_properties, Inherit::all());
        assert!(c.invalidate_properties.is_empty());
        assert_eq!(c.padding, 0);
        assert!(!c.input_mask);
        assert!(!c.resampling);
        assert_eq!(c.presented_bands(4), 4);
    }

    #[test]
    fn test_builder() {
        let c = Configuration::new()
            .extract_bands(vec![2, 3])
            .inherit(Inherit::DIMENSIONS | Inherit::NO_DATA)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM)
            .padding(1)
            .input_mask(true)
            .key_metadata(&["StdTime", "AcquisitionDate"]);
        assert!(!c.inherit_properties.contains(Inherit::PIXEL_TYPE));
        assert_eq!(c.invalidate_properties.bits(), 6);
        assert_eq!(c.presented_bands(4), 2);
        assert_eq!(c.key_metadata, vec!["stdtime", "acquisitiondate"]);
    }

    #[test]
    fn test_wire_bits() {
        assert_eq!(Inherit::all().bits(), 15);
        assert_eq!(Inherit::from_bits_truncate(5), Inherit::PIXEL_TYPE | Inherit::DIMENSIONS);
        assert_eq!(Invalidate::KEY_METADATA.bits(), 8);
    }
}
