//! Key metadata override: pixels pass through, selected fields are replaced

use rasterfn_core::prelude::*;

/// Replacement for one field; `Reset` clears it
#[derive(Debug, Clone, PartialEq)]
enum Override {
    Set(String),
    Reset,
}

impl Override {
    fn from_scalar(scalars: &Scalars, name: &str) -> Result<Option<Self>> {
        if !scalars.contains(name) {
            return Ok(None);
        }
        let text = scalars.text(name)?.trim();
        Ok(Some(if text.is_empty() {
            Override::Reset
        } else {
            Override::Set(text.to_string())
        }))
    }

    fn apply(&self, metadata: &mut KeyMetadata, name: &str) {
        match self {
            Override::Set(v) => {
                metadata.insert(name, v.as_str());
            }
            Override::Reset => metadata.reset(name),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyMetadataOverride {
    dataset: Vec<(&'static str, Override)>,
    band_names: Option<Vec<String>>,
}

impl RasterFunction for KeyMetadataOverride {
    fn name(&self) -> &'static str {
        "Key Metadata"
    }

    fn description(&self) -> &'static str {
        "Overrides dataset and band key metadata, leaving pixels unchanged"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("raster", "Raster"),
            Parameter::string("datatype", "Data Type")
                .describe("e.g. Processed or Scientific; empty resets the field"),
            Parameter::string("variable", "Variable"),
            Parameter::string("unit", "Unit"),
            Parameter::string("bandnames", "Band Names").describe("Comma-separated, one per band"),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.dataset.clear();
        for name in [names::DATA_TYPE, names::VARIABLE, names::UNIT] {
            if let Some(o) = Override::from_scalar(scalars, name)? {
                self.dataset.push((name, o));
            }
        }
        self.band_names = if scalars.contains("bandnames") {
            Some(
                scalars
                    .text("bandnames")?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            )
        } else {
            None
        };

        Ok(Configuration::new()
            .input_mask(true)
            .resampling(true)
            .band_selection(true))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let info = args.output_info;
        if let Some(band_names) = &self.band_names
            && band_names.len() > info.band_count
        {
            return Err(Error::Compatibility(format!(
                "{} band names for {} bands",
                band_names.len(),
                info.band_count
            )));
        }
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let input = block.raster("raster")?;
        let values = input.values();
        let mask = input.mask.clone();
        block.set_output_values(request, &values);
        if let Some(mask) = mask {
            block.set_output_mask(mask);
        }
        Ok(())
    }

    fn update_key_metadata(
        &self,
        query: &MetadataQuery,
        mut metadata: KeyMetadata,
    ) -> Result<KeyMetadata> {
        match query.scope {
            MetadataScope::Dataset => {
                for (name, o) in &self.dataset {
                    o.apply(&mut metadata, name);
                }
            }
            MetadataScope::Band(n) => {
                if let Some(name) = self.band_names.as_ref().and_then(|b| b.get(n)) {
                    let o = if name.is_empty() {
                        Override::Reset
                    } else {
                        Override::Set(name.clone())
                    };
                    o.apply(&mut metadata, names::BAND_NAME);
                }
            }
        }
        Ok(metadata)
    }
}
