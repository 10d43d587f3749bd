//! Values a caller binds to a plugin's parameters

use rasterfn_core::params::DataType;
use rasterfn_core::{Configuration, Error, ParamValue, Parameter, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::source::RasterSource;

/// A raster or an ordered raster collection bound to one parameter
#[derive(Debug, Clone)]
pub enum RasterBinding {
    Raster(Arc<dyn RasterSource>),
    Rasters(Vec<Arc<dyn RasterSource>>),
}

impl RasterBinding {
    /// Every source behind this binding, in order
    pub fn all(&self) -> &[Arc<dyn RasterSource>] {
        match self {
            RasterBinding::Raster(r) => std::slice::from_ref(r),
            RasterBinding::Rasters(rs) => rs,
        }
    }
}

/// Scalar and raster values keyed by parameter name
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub(crate) scalars: BTreeMap<String, ParamValue>,
    pub(crate) rasters: BTreeMap<String, RasterBinding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.scalars.insert(name.to_string(), value.into());
        self
    }

    pub fn raster(mut self, name: &str, source: Arc<dyn RasterSource>) -> Self {
        self.rasters.insert(name.to_string(), RasterBinding::Raster(source));
        self
    }

    pub fn rasters(mut self, name: &str, sources: Vec<Arc<dyn RasterSource>>) -> Self {
        self.rasters.insert(name.to_string(), RasterBinding::Rasters(sources));
        self
    }

    /// Match the bound rasters against the raster parameters of `schema`.
    ///
    /// A single raster bound to a collection parameter becomes a collection
    /// of one.
    pub(crate) fn bind_rasters(
        &self,
        schema: &[Parameter],
    ) -> Result<BTreeMap<String, RasterBinding>> {
        for name in self.rasters.keys() {
            match schema.iter().find(|p| &p.name == name) {
                None => return Err(Error::binding(name, "not declared by this function")),
                Some(p) if !p.data_type.is_raster() => {
                    return Err(Error::binding(name, "scalar parameters cannot take rasters"));
                }
                Some(_) => {}
            }
        }

        let mut bound = BTreeMap::new();
        for param in schema.iter().filter(|p| p.data_type.is_raster()) {
            let binding = match (param.data_type, self.rasters.get(&param.name)) {
                (_, None) if param.required => {
                    return Err(Error::binding(&param.name, "required raster is not bound"));
                }
                (_, None) => continue,
                (DataType::Raster, Some(RasterBinding::Rasters(_))) => {
                    return Err(Error::binding(
                        &param.name,
                        "expects a single raster, got a collection",
                    ));
                }
                (_, Some(RasterBinding::Rasters(rs))) if rs.is_empty() => {
                    return Err(Error::binding(&param.name, "raster collection is empty"));
                }
                (DataType::Rasters, Some(RasterBinding::Raster(r))) => {
                    RasterBinding::Rasters(vec![r.clone()])
                }
                (_, Some(b)) => b.clone(),
            };
            bound.insert(param.name.clone(), binding);
        }
        Ok(bound)
    }
}

/// Check every bound raster against the configuration: extracted band
/// indices must exist and a declared band count must be met.
pub(crate) fn check_bands(
    schema: &[Parameter],
    rasters: &BTreeMap<String, RasterBinding>,
    config: &Configuration,
) -> Result<()> {
    for param in schema {
        let Some(binding) = rasters.get(&param.name) else {
            continue;
        };
        for source in binding.all() {
            let info = source.info();
            info.validate()?;
            let native = info.band_count;
            if let Some(extract) = &config.extract_bands
                && let Some(&band) = extract.iter().find(|&&b| b >= native)
            {
                return Err(Error::Compatibility(format!(
                    "`{}` has {native} bands, cannot extract band index {band}",
                    param.name
                )));
            }
            if !config.input_mask && source.has_mask() {
                let delivered =
                    config.extract_bands.clone().unwrap_or_else(|| (0..native).collect());
                if let Some(&band) = delivered.iter().find(|&&b| info.no_data_for(b).is_none()) {
                    return Err(Error::Compatibility(format!(
                        "`{}` is masked but band {band} has no no-data value to carry the mask",
                        param.name
                    )));
                }
            }
            let presented = config.presented_bands(native);
            if let Some(expected) = param.bands
                && presented != expected
            {
                return Err(Error::binding(
                    &param.name,
                    format!("expects {expected} bands, got {presented}"),
                ));
            }
        }
    }
    Ok(())
}
