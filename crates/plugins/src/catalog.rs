//! Plugin catalog
//!
//! Each entry names a plugin, files it under a category, and carries a
//! factory producing a fresh instance for every session.

use rasterfn_core::RasterFunction;

use crate::conversion::{HeatIndex, PerSecondToPerMonth, WindChill};
use crate::imagery::{Arithmetic, Grayscale, LinearSpectralUnmixing, Ndvi};
use crate::metadata::KeyMetadataOverride;
use crate::random::Random;
use crate::statistics::{Aggregate, BlockStatistics, FocalStatistics};
use crate::terrain::{Contour, Hillshade};

/// Category of plugins (maps to a catalog tree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Imagery,
    Terrain,
    Statistics,
    Conversion,
    Metadata,
    Synthetic,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Imagery => "Imagery",
            Self::Terrain => "Terrain",
            Self::Statistics => "Statistics",
            Self::Conversion => "Conversion",
            Self::Metadata => "Metadata",
            Self::Synthetic => "Synthetic",
        }
    }

    pub const ALL: &[Category] = &[
        Self::Imagery,
        Self::Terrain,
        Self::Statistics,
        Self::Conversion,
        Self::Metadata,
        Self::Synthetic,
    ];
}

/// A plugin entry in the catalog
#[derive(Debug, Clone)]
pub struct PluginEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub factory: fn() -> Box<dyn RasterFunction>,
}

impl PluginEntry {
    fn of<T: RasterFunction + Default + 'static>(id: &'static str, category: Category) -> Self {
        let instance = T::default();
        Self {
            id,
            name: instance.name(),
            category,
            description: instance.description(),
            factory: boxed::<T>,
        }
    }

    /// A fresh, unconfigured instance
    pub fn create(&self) -> Box<dyn RasterFunction> {
        (self.factory)()
    }
}

fn boxed<T: RasterFunction + Default + 'static>() -> Box<dyn RasterFunction> {
    Box::new(T::default())
}

/// Build the plugin catalog
pub fn build_catalog() -> Vec<PluginEntry> {
    use Category::*;
    vec![
        PluginEntry::of::<Ndvi>("ndvi", Imagery),
        PluginEntry::of::<Grayscale>("grayscale", Imagery),
        PluginEntry::of::<LinearSpectralUnmixing>("linear_spectral_unmixing", Imagery),
        PluginEntry::of::<Arithmetic>("arithmetic", Imagery),
        PluginEntry::of::<Hillshade>("hillshade", Terrain),
        PluginEntry::of::<Contour>("contour", Terrain),
        PluginEntry::of::<Aggregate>("aggregate", Statistics),
        PluginEntry::of::<BlockStatistics>("block_statistics", Statistics),
        PluginEntry::of::<FocalStatistics>("focal_statistics", Statistics),
        PluginEntry::of::<PerSecondToPerMonth>("per_second_to_per_month", Conversion),
        PluginEntry::of::<HeatIndex>("heat_index", Conversion),
        PluginEntry::of::<WindChill>("wind_chill", Conversion),
        PluginEntry::of::<KeyMetadataOverride>("key_metadata", Metadata),
        PluginEntry::of::<Random>("random", Synthetic),
    ]
}

/// Instantiate the plugin registered under `id`
pub fn create(id: &str) -> Option<Box<dyn RasterFunction>> {
    build_catalog()
        .into_iter()
        .find(|e| e.id == id)
        .map(|e| e.create())
}
