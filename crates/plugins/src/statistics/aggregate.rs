//! Pixel-wise reduction across a collection of co-registered rasters

use ndarray::{Array3, ArrayView3};
use rasterfn_core::prelude::*;
use rasterfn_core::raster::neighborhood::combine_masks;
use tracing::debug;

use crate::reduce::{AGGREGATION_METHODS, Reducer};

#[derive(Debug, Clone)]
pub struct Aggregate {
    reducer: Reducer,
}

impl Default for Aggregate {
    fn default() -> Self {
        Self {
            reducer: Reducer::Mean,
        }
    }
}

impl RasterFunction for Aggregate {
    fn name(&self) -> &'static str {
        "Aggregate"
    }

    fn description(&self) -> &'static str {
        "Reduces a collection of rasters to one raster, pixel by pixel"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::rasters("rasters", "Rasters")
                .describe("Rasters sharing a spatial reference and band count"),
            Parameter::string("method", "Method")
                .domain(AGGREGATION_METHODS)
                .default("Average"),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.reducer = Reducer::parse(scalars.text("method")?)?;
        Ok(Configuration::new()
            .inherit(Inherit::DIMENSIONS | Inherit::RESAMPLING)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM)
            .input_mask(true)
            .resampling(true))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let rasters = args.rasters("rasters")?;
        let Some(first) = rasters.first() else {
            return Err(Error::Compatibility("no rasters to aggregate".into()));
        };

        let mut union = first.info.extent;
        for (i, r) in rasters.iter().enumerate().skip(1) {
            if !r.info.spatial_reference.is_equivalent(&first.info.spatial_reference) {
                return Err(Error::Compatibility(format!(
                    "raster {i} is in {} but raster 0 is in {}",
                    r.info.spatial_reference, first.info.spatial_reference
                )));
            }
            if r.info.band_count != first.info.band_count {
                return Err(Error::Compatibility(format!(
                    "raster {i} has {} bands but raster 0 has {}",
                    r.info.band_count, first.info.band_count
                )));
            }
            union = union.union(&r.info.extent);
        }

        let mut info = args.output_info;
        let extent = union.snap_to_grid(info.cell_size);
        info.extent = extent;
        info.native_extent = Some(extent);
        info.origin = Some((extent.x_min, extent.y_max));
        info.set_band_count(first.info.band_count);
        info.pixel_type = PixelType::F32;
        info.no_data = None;
        debug!(inputs = rasters.len(), reducer = ?self.reducer, "aggregate refined");
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let inputs = block.rasters("rasters")?;
        let values: Vec<Array3<f64>> = inputs.iter().map(|r| r.values()).collect();
        let masks: Vec<Array3<u8>> = inputs.iter().map(|r| r.mask_or_valid()).collect();
        for v in &values {
            if v.dim() != request.shape {
                return Err(Error::SizeMismatch {
                    expected: request.shape,
                    actual: v.dim(),
                });
            }
        }

        let views: Vec<ArrayView3<'_, u8>> = masks.iter().map(|m| m.view()).collect();
        let mask = combine_masks(&views)?;
        let mut out = Array3::<f64>::zeros(request.shape);
        let mut stack = Vec::with_capacity(values.len());
        for ((b, r, c), o) in out.indexed_iter_mut() {
            if mask[[b, r, c]] == 0 {
                continue;
            }
            stack.clear();
            stack.extend(values.iter().map(|v| v[[b, r, c]]));
            *o = self.reducer.apply(&mut stack).unwrap_or(0.0);
        }

        block.set_output_values(request, &out);
        block.set_output_mask(mask);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use ndarray::array;
    use rasterfn_core::InputInfo;

    fn collection(extents: &[Extent]) -> InputInfo {
        InputInfo::Rasters(
            extents
                .iter()
                .map(|e| {
                    InputRaster::new(RasterInfo::new(
                        1,
                        PixelType::F32,
                        *e,
                        CellSize::square(10.0),
                        SpatialReference::from_epsg(32633),
                    ))
                })
                .collect(),
        )
    }

    fn block(mid_mask: Option<Array3<u8>>) -> PixelBlock {
        let mut block = PixelBlock::new();
        block.insert_rasters(
            "rasters",
            vec![
                pixels(
                    PixelType::F32,
                    array![[[1.0, 2.0], [3.0, 4.0]]],
                    Some(Array3::ones((1, 2, 2))),
                ),
                pixels(
                    PixelType::F32,
                    array![[[10.0, 20.0], [30.0, 40.0]]],
                    Some(mid_mask.unwrap_or_else(|| Array3::ones((1, 2, 2)))),
                ),
                pixels(
                    PixelType::F32,
                    array![[[100.0, 200.0], [300.0, 400.0]]],
                    Some(Array3::ones((1, 2, 2))),
                ),
            ],
        );
        block
    }

    fn session(method: &str) -> (Aggregate, RasterInfo) {
        let mut plugin = Aggregate::default();
        let e = Extent::new(0.0, 0.0, 20.0, 20.0);
        let (_, info) = setup(
            &mut plugin,
            &[("method", method.into())],
            vec![("rasters", collection(&[e, e, e]))],
        )
        .unwrap();
        (plugin, info)
    }

    #[test]
    fn test_median_of_three() {
        let (plugin, info) = session("Median");
        assert_eq!(info.pixel_type, PixelType::F32);
        let mut b = block(None);
        plugin.update_pixels(&request(&info, 2, 2), &mut b).unwrap();
        let (px, mask) = outputs(&b);
        assert_eq!(px, array![[[10.0, 20.0], [30.0, 40.0]]]);
        assert_eq!(mask.unwrap(), Array3::<u8>::ones((1, 2, 2)));
    }

    #[test]
    fn test_masked_input_masks_output() {
        let (plugin, info) = session("Median");
        let mut b = block(Some(array![[[0, 1], [1, 0]]]));
        plugin.update_pixels(&request(&info, 2, 2), &mut b).unwrap();
        let (_, mask) = outputs(&b);
        assert_eq!(mask.unwrap(), array![[[0u8, 1], [1, 0]]]);
    }

    #[test]
    fn test_sum() {
        let (plugin, info) = session("sum");
        let mut b = block(None);
        plugin.update_pixels(&request(&info, 2, 2), &mut b).unwrap();
        assert_eq!(outputs(&b).0, array![[[111.0, 222.0], [333.0, 444.0]]]);
    }

    #[test]
    fn test_extent_is_snapped_union() {
        let mut plugin = Aggregate::default();
        let (_, info) = setup(
            &mut plugin,
            &[],
            vec![(
                "rasters",
                collection(&[
                    Extent::new(0.0, 0.0, 20.0, 20.0),
                    Extent::new(15.0, -7.0, 45.0, 20.0),
                ]),
            )],
        )
        .unwrap();
        assert_eq!(info.extent, Extent::new(0.0, -10.0, 50.0, 20.0));
        assert_eq!((info.height(), info.width()), (3, 5));
    }

    #[test]
    fn test_rejects_mixed_spatial_references() {
        let mut plugin = Aggregate::default();
        let e = Extent::new(0.0, 0.0, 20.0, 20.0);
        let mut inputs = collection(&[e, e]);
        if let InputInfo::Rasters(rs) = &mut inputs {
            rs[1].info.spatial_reference = SpatialReference::from_epsg(4326);
        }
        let err = setup(&mut plugin, &[], vec![("rasters", inputs)]).unwrap_err();
        assert!(matches!(err, Error::Compatibility(_)));
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let (plugin, info) = session("Average");
        let mut b = block(None);
        assert!(matches!(
            plugin.update_pixels(&request(&info, 3, 3), &mut b),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
