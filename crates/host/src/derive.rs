//! Provisional output description handed to refinement

use rasterfn_core::{Configuration, Inherit, Invalidate, RasterInfo};

/// Derive the provisional output info from the primary input.
///
/// `band_count` is the number of bands the kernel will see from the primary
/// binding: extracted bands, or the sum over a composited collection.
/// Statistics, histogram, colormap and attribute table always start empty.
pub fn derive_output_info(
    primary: Option<&RasterInfo>,
    band_count: usize,
    config: &Configuration,
) -> RasterInfo {
    let mut info = RasterInfo::neutral();
    info.band_selection = config.supports_band_selection;
    let Some(primary) = primary else {
        return info;
    };

    let inherit = config.inherit_properties;
    info.set_band_count(band_count);

    if inherit.contains(Inherit::PIXEL_TYPE) {
        info.pixel_type = primary.pixel_type;
    }
    let has_no_data = primary.no_data.as_ref().is_some_and(|nd| !nd.is_empty());
    if inherit.contains(Inherit::NO_DATA) && has_no_data {
        let source_band =
            |b: usize| config.extract_bands.as_ref().and_then(|e| e.get(b).copied()).unwrap_or(b);
        info.no_data = Some(
            (0..band_count)
                .map(|b| primary.no_data_for(source_band(b)).unwrap_or_default())
                .collect(),
        );
    }
    if inherit.contains(Inherit::DIMENSIONS) {
        info.cell_size = primary.cell_size;
        info.extent = primary.extent;
        info.native_extent = primary.native_extent;
        info.spatial_reference = primary.spatial_reference.clone();
        info.native_spatial_reference = primary.native_spatial_reference.clone();
        info.origin = primary.origin;
        info.level_of_details = primary.level_of_details;
    }
    if inherit.contains(Inherit::RESAMPLING) {
        info.resampling = primary.resampling;
    }
    if !config.invalidate_properties.contains(Invalidate::XFORM) {
        info.geodata_xform = primary.geodata_xform.clone();
    }
    info
}
