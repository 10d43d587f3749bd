//! Block statistics: downsample by reducing `factor x factor` native blocks
//!
//! The output cell size is the input cell size times `factor`. Tiles are
//! computed from native-resolution windows, so the kernel sees exactly
//! `factor` input pixels per output pixel along each axis.

use ndarray::{Array3, s};
use rasterfn_core::prelude::*;
use tracing::debug;

use crate::bind::whole_number;
use crate::reduce::{AGGREGATION_METHODS, Reducer};

/// How one block collapses to a pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMethod {
    Reduce(Reducer),
    /// The block's center pixel
    Nearest,
}

impl BlockMethod {
    fn parse(name: &str) -> Result<Self> {
        if name.eq_ignore_ascii_case("nearest") {
            Ok(BlockMethod::Nearest)
        } else {
            Reducer::parse(name).map(BlockMethod::Reduce)
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlockStatistics {
    factor: usize,
    method: BlockMethod,
}

impl Default for BlockStatistics {
    fn default() -> Self {
        Self {
            factor: 2,
            method: BlockMethod::Reduce(Reducer::Mean),
        }
    }
}

impl RasterFunction for BlockStatistics {
    fn name(&self) -> &'static str {
        "Block Statistics"
    }

    fn description(&self) -> &'static str {
        "Downsamples a raster by reducing square blocks of native pixels"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        let mut methods = AGGREGATION_METHODS.to_vec();
        methods.push("Nearest");
        vec![
            Parameter::raster("raster", "Raster"),
            Parameter::numeric("factor", "Downsampling Factor")
                .default(2)
                .describe("Native pixels per output pixel along each axis"),
            Parameter::string("method", "Method").domain(&methods).default("Average"),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.factor = whole_number(scalars, "factor", 1)?;
        self.method = BlockMethod::parse(scalars.text("method")?)?;
        Ok(Configuration::new()
            .inherit(Inherit::DIMENSIONS)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM)
            .input_mask(true)
            .resampling(false))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let input = args.raster("raster")?;
        let mut info = args.output_info;
        info.cell_size = input.info.cell_size.scaled(self.factor as f64);
        let extent = input.info.extent.snap_to_grid(info.cell_size);
        info.extent = extent;
        info.native_extent = Some(extent);
        info.origin = Some((extent.x_min, extent.y_max));
        info.pixel_type = PixelType::F32;
        info.no_data = None;
        debug!(factor = self.factor, method = ?self.method, "block statistics refined");
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let input = block.raster("raster")?;
        let f = self.factor;
        let (bands, rows, cols) = request.shape;
        let expected = (bands, rows * f, cols * f);
        if input.shape() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: input.shape(),
            });
        }

        let values = input.values();
        let valid = input.mask_or_valid();
        let mut out = Array3::<f64>::zeros(request.shape);
        let mut mask = Array3::<u8>::zeros(request.shape);
        let mut buf = Vec::with_capacity(f * f);
        for ((b, r, c), o) in out.indexed_iter_mut() {
            let (r0, c0) = (r * f, c * f);
            let v = match self.method {
                BlockMethod::Nearest => {
                    let (rc, cc) = (r0 + f / 2, c0 + f / 2);
                    (valid[[b, rc, cc]] != 0).then(|| values[[b, rc, cc]])
                }
                BlockMethod::Reduce(reducer) => {
                    let window = valid.slice(s![b, r0..r0 + f, c0..c0 + f]);
                    if window.iter().all(|&m| m != 0) {
                        buf.clear();
                        buf.extend(values.slice(s![b, r0..r0 + f, c0..c0 + f]).iter().copied());
                        reducer.apply(&mut buf)
                    } else {
                        None
                    }
                }
            };
            if let Some(v) = v {
                *o = v;
                mask[[b, r, c]] = 1;
            }
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

    fn grid() -> Array3<f64> {
        Array3::from_shape_fn((1, 4, 4), |(_, r, c)| (r * 4 + c) as f64)
    }

    fn run(method: &str, mask: Option<Array3<u8>>) -> (RasterInfo, Array3<f64>, Array3<u8>) {
        let mut plugin = BlockStatistics::default();
        let (_, info) = setup(
            &mut plugin,
            &[("method", method.into())],
            vec![("raster", single(info(1, PixelType::I16, 4, 4)))],
        )
        .unwrap();
        let mut block = PixelBlock::new();
        block.insert_raster("raster", pixels(PixelType::I16, grid(), mask));
        plugin.update_pixels(&request(&info, 2, 2), &mut block).unwrap();
        let (px, mask) = outputs(&block);
        (info, px, mask.unwrap())
    }

    #[test]
    fn test_refined_grid() {
        let (info, _, _) = run("Average", None);
        assert_eq!(info.cell_size, CellSize::square(2.0));
        assert_eq!((info.height(), info.width()), (2, 2));
        assert_eq!(info.pixel_type, PixelType::F32);
    }

    #[test]
    fn test_block_mean_and_max() {
        let (_, px, mask) = run("Average", None);
        assert_eq!(px, array![[[2.5, 4.5], [10.5, 12.5]]]);
        assert_eq!(mask.sum(), 4);
        let (_, px, _) = run("Maximum", None);
        assert_eq!(px, array![[[5.0, 7.0], [13.0, 15.0]]]);
    }

    #[test]
    fn test_nearest_takes_center() {
        let (_, px, _) = run("Nearest", None);
        assert_eq!(px, array![[[5.0, 7.0], [13.0, 15.0]]]);
    }

    #[test]
    fn test_partial_block_is_masked() {
        let mut m = Array3::<u8>::ones((1, 4, 4));
        m[[0, 0, 1]] = 0;
        let (_, _, mask) = run("Sum", Some(m));
        assert_eq!(mask, array![[[0u8, 1], [1, 1]]]);
    }

    #[test]
    fn test_rejects_zero_factor() {
        let mut plugin = BlockStatistics::default();
        let s = scalars(&plugin, &[("factor", 0.into())]).unwrap();
        assert!(matches!(plugin.configuration(&s), Err(Error::Binding { .. })));
    }
}
