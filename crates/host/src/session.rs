//! One plugin instance driven through its lifecycle

use ndarray::{Array3, ArrayView3, Axis, s};
use rasterfn_colormap::{ColorScheme, auto_params, indexed_to_rgba, ramp_to_rgba};
use rasterfn_core::prelude::*;
use rasterfn_core::{DatasetMetadata, InputInfo, TileProperties, bind_scalars};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::bindings::{Bindings, RasterBinding, check_bands};
use crate::derive::derive_output_info;
use crate::options::HostOptions;
use crate::source::RasterSource;
use crate::tiled::TileIterator;
use crate::window::Window;

/// Input name under which a composited collection is delivered
pub const COMPOSITE_RASTERS: &str = "compositeRasters";

/// Write the no-data value of each delivered band wherever `mask` is 0, so
/// a kernel without a mask channel sees invalid pixels as the sentinel
fn sentinel_channel(
    pixels: PixelArray,
    mask: &Array3<u8>,
    info: &RasterInfo,
    bands: &[usize],
) -> PixelArray {
    let mut values = pixels.to_f64();
    for (i, &band) in bands.iter().enumerate() {
        let Some(no_data) = info.no_data_for(band) else {
            continue;
        };
        values
            .index_axis_mut(Axis(0), i)
            .zip_mut_with(&mask.index_axis(Axis(0), i), |v, &m| {
                if m == 0 {
                    *v = no_data;
                }
            });
    }
    PixelArray::from_f64(pixels.pixel_type(), &values)
}

/// Result of one tile request
#[derive(Debug)]
pub struct RenderedTile {
    pub tlc: (usize, usize),
    pub pixels: PixelArray,
    /// `1` = valid, `0` = invalid
    pub mask: Array3<u8>,
    /// Why the tile was rendered as no-data, if it was
    pub failure: Option<Error>,
}

/// A whole output raster assembled from tiles
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRaster {
    pub info: RasterInfo,
    pub pixels: PixelArray,
    pub mask: Array3<u8>,
    /// Top-left corners of the tiles that failed
    pub failed_tiles: Vec<(usize, usize)>,
}

impl RenderedRaster {
    /// RGBA bytes of band 0: through the output colormap when there is one,
    /// else through `scheme` stretched over the valid values
    pub fn to_rgba(&self, scheme: ColorScheme) -> Vec<u8> {
        match &self.info.colormap {
            Some(colormap) => indexed_to_rgba(&self.pixels, Some(&self.mask), colormap),
            None => {
                let params = auto_params(&self.pixels, Some(&self.mask), 0, scheme);
                ramp_to_rgba(&self.pixels, Some(&self.mask), 0, &params)
            }
        }
    }
}

/// A configured and refined plugin instance, ready for tile and metadata
/// requests.
pub struct Session {
    plugin: Box<dyn RasterFunction>,
    scalars: Scalars,
    config: Configuration,
    rasters: BTreeMap<String, RasterBinding>,
    inputs: BTreeMap<String, InputInfo>,
    primary: Option<String>,
    provisional: RasterInfo,
    output_info: RasterInfo,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("plugin", &self.plugin.name())
            .field("config", &self.config)
            .field("output_info", &self.output_info)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Run the setup half of the lifecycle.
    ///
    /// Licensing, binding, configuration and refinement happen here; any
    /// failure aborts the session before a tile can be requested.
    pub fn open(
        mut plugin: Box<dyn RasterFunction>,
        bindings: Bindings,
        options: &HostOptions,
    ) -> Result<Self> {
        let name = plugin.name();
        let status = plugin.is_licensed(&options.product);
        if !status.ok_to_run {
            let message = status.message.unwrap_or_else(|| {
                format!("{name} cannot run on {}", options.product.product_name)
            });
            return Err(Error::License(message));
        }

        let schema = plugin.parameter_info();
        for param in &schema {
            param.validate()?;
        }
        let scalars = bind_scalars(&schema, &bindings.scalars)?;
        let rasters = bindings.bind_rasters(&schema)?;

        let config = plugin.configuration(&scalars)?;
        debug!(
            plugin = name,
            padding = config.padding,
            input_mask = config.input_mask,
            resampling = config.resampling,
            extract_bands = ?config.extract_bands,
            "configured"
        );
        check_bands(&schema, &rasters, &config)?;

        let inputs: BTreeMap<String, InputInfo> = rasters
            .iter()
            .map(|(name, binding)| (name.clone(), input_info(binding)))
            .collect();
        let primary = schema
            .iter()
            .find(|p| p.data_type.is_raster() && rasters.contains_key(&p.name))
            .map(|p| p.name.clone());
        let provisional = provisional_info(primary.as_ref().and_then(|p| rasters.get(p)), &config);

        let mut session = Self {
            plugin,
            scalars,
            config,
            rasters,
            inputs,
            primary,
            output_info: provisional.clone(),
            provisional,
        };
        session.output_info = session.refine()?;
        info!(
            plugin = name,
            bands = session.output_info.band_count,
            pixel_type = session.output_info.pixel_type.name(),
            rows = session.output_info.height(),
            cols = session.output_info.width(),
            "session opened"
        );
        Ok(session)
    }

    /// Ask the plugin to refine the provisional output info again, with the
    /// same scalars and inputs
    pub fn refine(&mut self) -> Result<RasterInfo> {
        let info = self.plugin.update_raster_info(RefineArgs {
            scalars: &self.scalars,
            inputs: &self.inputs,
            output_info: self.provisional.clone(),
        })?;
        info.validate()?;
        Ok(info)
    }

    pub fn plugin_name(&self) -> &'static str {
        self.plugin.name()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn scalars(&self) -> &Scalars {
        &self.scalars
    }

    pub fn output_info(&self) -> &RasterInfo {
        &self.output_info
    }

    /// The primary input's info as the host reports it, with invalidated
    /// properties dropped
    pub fn parent_info(&self) -> Option<RasterInfo> {
        let mut info = self.primary_source()?.info().clone();
        let invalid = self.config.invalidate_properties;
        if invalid.contains(Invalidate::STATISTICS) {
            info.statistics = None;
        }
        if invalid.contains(Invalidate::HISTOGRAM) {
            info.histogram = None;
        }
        if invalid.contains(Invalidate::XFORM) {
            info.geodata_xform = None;
        }
        Some(info)
    }

    fn primary_source(&self) -> Option<&dyn RasterSource> {
        let binding = self.rasters.get(self.primary.as_deref()?)?;
        binding.all().first().map(|s| s.as_ref())
    }

    /// Properties of the tile at `tlc = (col, row)`
    pub fn tile_request(&self, tlc: (usize, usize), rows: usize, cols: usize) -> TileRequest {
        let info = &self.output_info;
        TileRequest {
            tlc,
            shape: (info.band_count, rows, cols),
            props: TileProperties {
                extent: info.extent.tile(tlc, rows, cols, info.cell_size),
                cell_size: info.cell_size,
                pixel_type: info.pixel_type,
                no_data: info.no_data_for(0),
                spatial_reference: info.spatial_reference.clone(),
                width: cols,
                height: rows,
            },
        }
    }

    /// Compute one tile.
    ///
    /// A kernel error or a malformed output never escapes: the tile comes
    /// back filled with no-data, fully masked, and carries the failure.
    pub fn update_pixels(&self, tlc: (usize, usize), rows: usize, cols: usize) -> RenderedTile {
        let request = self.tile_request(tlc, rows, cols);
        let outcome = self.block_for(&request).and_then(|mut block| {
            self.plugin.update_pixels(&request, &mut block)?;
            self.checked_outputs(&request, &mut block)
        });

        match outcome {
            Ok((pixels, mask)) => RenderedTile {
                tlc,
                pixels,
                mask,
                failure: None,
            },
            Err(e) => {
                warn!(plugin = self.plugin.name(), ?tlc, error = %e, "tile rendered as no-data");
                RenderedTile {
                    tlc,
                    pixels: PixelArray::filled(
                        request.props.pixel_type,
                        request.shape,
                        request.fill_value(),
                    ),
                    mask: Array3::zeros(request.shape),
                    failure: Some(e),
                }
            }
        }
    }

    fn block_for(&self, request: &TileRequest) -> Result<PixelBlock> {
        let mut block = PixelBlock::new();
        for (name, binding) in &self.rasters {
            match binding {
                RasterBinding::Raster(source) => {
                    block.insert_raster(name, self.deliver(source.as_ref(), request))
                }
                RasterBinding::Rasters(sources) => {
                    let delivered: Vec<RasterPixels> =
                        sources.iter().map(|s| self.deliver(s.as_ref(), request)).collect();
                    if self.config.composite_rasters {
                        block.insert_raster(COMPOSITE_RASTERS, composite(&delivered)?);
                    }
                    block.insert_rasters(name, delivered);
                }
            }
        }
        Ok(block)
    }

    /// Sample the padded window of one input and package it for the kernel
    fn deliver(&self, source: &dyn RasterSource, request: &TileRequest) -> RasterPixels {
        let info = source.info();
        let window = Window::for_request(
            request,
            info.cell_size,
            self.config.padding,
            self.config.resampling,
        );
        let bands = self
            .config
            .extract_bands
            .clone()
            .unwrap_or_else(|| (0..info.band_count).collect());
        let (pixels, mask) = window.sample(source, &bands);

        let delivered = if self.config.input_mask {
            RasterPixels::new(pixels).with_mask(mask)
        } else {
            RasterPixels::new(sentinel_channel(pixels, &mask, info, &bands))
        };
        delivered.with_key_metadata(source.metadata().dataset.filtered(&self.config.key_metadata))
    }

    /// Validate what the kernel wrote and fill in a missing mask
    fn checked_outputs(
        &self,
        request: &TileRequest,
        block: &mut PixelBlock,
    ) -> Result<(PixelArray, Array3<u8>)> {
        let (pixels, mask) = block.take_outputs();
        let pixels = pixels.ok_or_else(|| Error::Protocol("kernel wrote no output pixels".into()))?;
        if pixels.shape() != request.shape {
            return Err(Error::SizeMismatch {
                expected: request.shape,
                actual: pixels.shape(),
            });
        }
        if pixels.pixel_type() != request.props.pixel_type {
            return Err(Error::Protocol(format!(
                "kernel wrote {} pixels for a {} tile",
                pixels.pixel_type().name(),
                request.props.pixel_type.name()
            )));
        }

        let mask = match mask {
            Some(mask) if mask.dim() != request.shape => {
                return Err(Error::SizeMismatch {
                    expected: request.shape,
                    actual: mask.dim(),
                });
            }
            Some(mask) => mask,
            None => self.fallback_mask(&pixels),
        };
        Ok((pixels, mask))
    }

    /// Mask of a tile whose kernel wrote none: the inherited sentinel
    /// marks invalid pixels, otherwise every pixel is valid
    fn fallback_mask(&self, pixels: &PixelArray) -> Array3<u8> {
        let uses_sentinel =
            !self.config.input_mask && self.config.inherit_properties.contains(Inherit::NO_DATA);
        match (&self.output_info.no_data, uses_sentinel) {
            (Some(_), true) => {
                let pixel_type = pixels.pixel_type();
                let sentinels: Vec<Option<f64>> = (0..pixels.bands())
                    .map(|b| self.output_info.no_data_for(b).map(|nd| pixel_type.quantize(nd)))
                    .collect();
                let values = pixels.to_f64();
                Array3::from_shape_fn(values.dim(), |(b, r, c)| {
                    let v = values[[b, r, c]];
                    u8::from(!v.is_nan() && sentinels[b] != Some(v))
                })
            }
            _ => Array3::ones(pixels.shape()),
        }
    }

    /// Render the whole output grid tile by tile
    pub fn render(&self, tile_size: usize) -> RenderedRaster {
        let info = &self.output_info;
        let (rows, cols) = (info.height(), info.width());
        let shape = (info.band_count, rows, cols);
        let mut values = Array3::<f64>::zeros(shape);
        let mut mask = Array3::<u8>::zeros(shape);
        let mut failed_tiles = Vec::new();

        for tile in TileIterator::new(rows, cols, tile_size) {
            let rendered = self.update_pixels(tile.tlc(), tile.rows, tile.cols);
            values
                .slice_mut(s![.., tile.row_range(), tile.col_range()])
                .assign(&rendered.pixels.to_f64());
            mask.slice_mut(s![.., tile.row_range(), tile.col_range()])
                .assign(&rendered.mask);
            if rendered.failure.is_some() {
                failed_tiles.push(rendered.tlc);
            }
        }

        debug!(plugin = self.plugin.name(), rows, cols, failed = failed_tiles.len(), "rendered");
        RenderedRaster {
            info: info.clone(),
            pixels: PixelArray::from_f64(info.pixel_type, &values),
            mask,
            failed_tiles,
        }
    }

    /// Answer a key metadata query.
    ///
    /// `band_index` is `-1` for the dataset and a zero-based band otherwise.
    /// The plugin sees the primary input's metadata for that scope, filtered
    /// to `names` (empty = all), unless it invalidated key metadata.
    pub fn key_metadata(&self, names: &[&str], band_index: i64) -> Result<KeyMetadata> {
        let scope = MetadataScope::from_index(band_index)
            .ok_or_else(|| Error::Metadata(format!("invalid band index {band_index}")))?;
        let query = MetadataQuery {
            names: names.iter().map(|n| n.to_lowercase()).collect(),
            scope,
        };
        let current = if self.config.invalidate_properties.contains(Invalidate::KEY_METADATA) {
            KeyMetadata::new()
        } else {
            self.parent_metadata().scoped(scope).filtered(&query.names)
        };

        let answer = self
            .plugin
            .update_key_metadata(&query, current)
            .map_err(|e| match e {
                Error::Metadata(_) => e,
                other => Error::Metadata(other.to_string()),
            })?;
        Ok(answer.without_nulls())
    }

    fn parent_metadata(&self) -> DatasetMetadata {
        let Some(source) = self.primary_source() else {
            return DatasetMetadata::default();
        };
        match &self.config.extract_bands {
            Some(bands) => source.metadata().select_bands(bands),
            None => source.metadata().clone(),
        }
    }
}

fn input_info(binding: &RasterBinding) -> InputInfo {
    let described = |s: &std::sync::Arc<dyn RasterSource>| {
        InputRaster::new(s.info().clone()).with_metadata(s.metadata().clone())
    };
    match binding {
        RasterBinding::Raster(s) => InputInfo::Raster(described(s)),
        RasterBinding::Rasters(ss) => InputInfo::Rasters(ss.iter().map(described).collect()),
    }
}

fn provisional_info(primary: Option<&RasterBinding>, config: &Configuration) -> RasterInfo {
    let Some(first) = primary.and_then(|b| b.all().first()) else {
        return derive_output_info(None, 1, config);
    };
    let band_count = match primary {
        Some(RasterBinding::Rasters(sources)) if config.composite_rasters => sources
            .iter()
            .map(|s| config.presented_bands(s.info().band_count))
            .sum(),
        _ => config.presented_bands(first.info().band_count),
    };
    derive_output_info(Some(first.info()), band_count, config)
}

/// Stack a delivered collection along the band axis
fn composite(parts: &[RasterPixels]) -> Result<RasterPixels> {
    let Some(first) = parts.first() else {
        return Err(Error::Protocol("cannot composite an empty collection".into()));
    };
    let arrays: Vec<&PixelArray> = parts.iter().map(|p| &p.pixels).collect();
    let mut stacked = RasterPixels::new(PixelArray::stack(first.pixels.pixel_type(), &arrays)?);
    let masks: Option<Vec<ArrayView3<'_, u8>>> =
        parts.iter().map(|p| p.mask.as_ref().map(|m| m.view())).collect();
    if let Some(masks) = masks {
        stacked = stacked.with_mask(ndarray::concatenate(Axis(0), &masks)?);
    }
    Ok(stacked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryRaster;
    use rasterfn_core::ParamValue;
    use std::sync::Arc;

    /// Doubles its single input; fails on tiles whose top-left column is odd
    #[derive(Default)]
    struct Doubler {
        refinements: usize,
    }

    impl RasterFunction for Doubler {
        fn name(&self) -> &'static str {
            "Doubler"
        }

        fn description(&self) -> &'static str {
            "test double"
        }

        fn is_licensed(&self, product: &ProductInfo) -> LicenseStatus {
            if product.has_extension("denied") {
                LicenseStatus::denied("extension conflict")
            } else {
                LicenseStatus::ok()
            }
        }

        fn parameter_info(&self) -> Vec<Parameter> {
            vec![
                Parameter::raster("raster", "Raster"),
                Parameter::string("shape", "Output Shape")
                    .domain(&["Good", "Wrong"])
                    .default("Good"),
            ]
        }

        fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
            let padding = if scalars.text("shape")? == "wrong" { 1 } else { 0 };
            Ok(Configuration::new()
                .padding(padding)
                .input_mask(true)
                .invalidate(Invalidate::STATISTICS | Invalidate::KEY_METADATA))
        }

        fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
            self.refinements += 1;
            Ok(args.output_info)
        }

        fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
            if request.tlc.0 % 2 == 1 {
                return Err(Error::Kernel("odd column".into()));
            }
            let input = block.raster("raster")?;
            let doubled = input.values() * 2.0;
            let mask = input.mask_or_valid();
            block.set_output_values(request, &doubled);
            block.set_output_mask(mask);
            Ok(())
        }
    }

    fn source() -> Arc<dyn RasterSource> {
        let mut info = RasterInfo::new(
            1,
            PixelType::F32,
            Extent::new(0.0, 0.0, 4.0, 2.0),
            CellSize::square(1.0),
            SpatialReference::from_epsg(32633),
        );
        info.set_statistics_range(0.0, 7.0);
        let values = Array3::from_shape_fn((1, 2, 4), |(_, r, c)| (r * 4 + c) as f64);
        let metadata = DatasetMetadata::new(KeyMetadata::new().with("sensorname", "Test"));
        InMemoryRaster::from_values(info, &values)
            .unwrap()
            .with_metadata(metadata)
            .shared()
    }

    fn open(shape: &str) -> Result<Session> {
        let bindings = Bindings::new()
            .raster("raster", source())
            .scalar("shape", ParamValue::from(shape));
        Session::open(Box::new(Doubler::default()), bindings, &HostOptions::default())
    }

    #[test]
    fn test_tile_failures_are_contained() {
        let session = open("Good").unwrap();
        let ok = session.update_pixels((0, 0), 2, 1);
        assert!(ok.failure.is_none());
        assert_eq!(ok.pixels.to_f64()[[0, 1, 0]], 8.0);

        let failed = session.update_pixels((1, 0), 2, 1);
        assert!(matches!(failed.failure, Some(Error::Kernel(_))));
        assert_eq!(failed.mask.sum(), 0);
        assert_eq!(failed.pixels.shape(), (1, 2, 1));
    }

    #[test]
    fn test_wrong_output_shape_is_a_failed_tile() {
        // Padding 1 makes the doubled block two pixels too large
        let session = open("Wrong").unwrap();
        let tile = session.update_pixels((0, 0), 2, 2);
        assert!(matches!(tile.failure, Some(Error::SizeMismatch { .. })));
    }

    #[test]
    fn test_render_records_failed_tiles() {
        let session = open("Good").unwrap();
        let rendered = session.render(1);
        assert_eq!(rendered.failed_tiles, vec![(1, 0), (3, 0), (1, 1), (3, 1)]);
        assert_eq!(rendered.mask.sum(), 4);
        assert_eq!(rendered.pixels.to_f64()[[0, 1, 2]], 12.0);
    }

    #[test]
    fn test_license_denied() {
        let mut options = HostOptions::default();
        options.product.extensions.push("denied".into());
        let err = Session::open(
            Box::new(Doubler::default()),
            Bindings::new().raster("raster", source()),
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, Error::License(m) if m == "extension conflict"));
    }

    #[test]
    fn test_invalidated_properties_are_hidden() {
        let session = open("Good").unwrap();
        assert!(session.parent_info().unwrap().statistics.is_none());
        assert!(session.key_metadata(&[], -1).unwrap().is_empty());
        assert!(matches!(session.key_metadata(&[], -2), Err(Error::Metadata(_))));
    }

    #[test]
    fn test_refine_is_repeatable() {
        let mut session = open("Good").unwrap();
        let again = session.refine().unwrap();
        assert_eq!(&again, session.output_info());
    }

    #[test]
    fn test_fallback_mask_uses_inherited_sentinel() {
        let session = Session {
            config: Configuration::new(),
            ..open("Good").unwrap()
        };
        let mut info = session.output_info.clone();
        info.set_no_data(Some(-1.0));
        let session = Session {
            output_info: info,
            ..session
        };
        let values = ndarray::array![[[1.0, -1.0], [f64::NAN, 2.0]]];
        let pixels = PixelArray::from_f64(PixelType::F32, &values);
        assert_eq!(session.fallback_mask(&pixels), ndarray::array![[[1, 0], [0, 1]]]);
    }

    #[test]
    fn test_composite_stacks_masks() {
        let part = |v: f64, m: u8| {
            RasterPixels::new(PixelArray::filled(PixelType::F32, (1, 2, 2), v))
                .with_mask(Array3::from_elem((1, 2, 2), m))
        };
        let stacked = composite(&[part(1.0, 1), part(2.0, 0)]).unwrap();
        assert_eq!(stacked.shape(), (2, 2, 2));
        assert_eq!(stacked.mask.as_ref().unwrap().sum(), 4);
        assert_eq!(stacked.values()[[1, 0, 0]], 2.0);
    }
}
