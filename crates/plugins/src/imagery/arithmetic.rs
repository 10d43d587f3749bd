//! Two-raster arithmetic over the no-data sentinel channel
//!
//! No masks are requested. Inputs equal to their no-data value, and results
//! that are not finite, are written as the output no-data value so the host
//! can recover validity from the sentinel.

use ndarray::{Array3, Axis};
use rasterfn_core::prelude::*;

/// Binary operations between rasters `a` and `b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    #[default]
    Plus,
    Minus,
    Multiply,
    Divide,
    Minimum,
    Maximum,
    Power,
}

impl Operation {
    pub const NAMES: &[&str] =
        &["Plus", "Minus", "Multiply", "Divide", "Minimum", "Maximum", "Power"];

    fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "plus" => Operation::Plus,
            "minus" => Operation::Minus,
            "multiply" => Operation::Multiply,
            "divide" => Operation::Divide,
            "minimum" => Operation::Minimum,
            "maximum" => Operation::Maximum,
            "power" => Operation::Power,
            other => {
                return Err(Error::binding("operation", format!("unknown operation `{other}`")));
            }
        })
    }

    fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            Operation::Plus => a + b,
            Operation::Minus => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => a / b,
            Operation::Minimum => a.min(b),
            Operation::Maximum => a.max(b),
            Operation::Power => a.powf(b),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Arithmetic {
    operation: Operation,
    pixel_type: Option<PixelType>,
    /// Per-band input sentinels, in each input's own pixel type
    no_data_a: Vec<Option<f64>>,
    no_data_b: Vec<Option<f64>>,
    no_data_out: Option<f64>,
}

fn sentinels(info: &RasterInfo) -> Vec<Option<f64>> {
    (0..info.band_count)
        .map(|b| info.no_data_for(b).map(|nd| info.pixel_type.quantize(nd)))
        .collect()
}

fn is_sentinel(value: f64, sentinel: Option<f64>) -> bool {
    sentinel.is_some_and(|nd| value == nd || (nd.is_nan() && value.is_nan()))
}

impl RasterFunction for Arithmetic {
    fn name(&self) -> &'static str {
        "Arithmetic"
    }

    fn description(&self) -> &'static str {
        "Applies an arithmetic operation to two rasters pixel by pixel"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("a", "Raster A"),
            Parameter::raster("b", "Raster B")
                .describe("Second operand; a single band is applied to every band of A"),
            Parameter::string("operation", "Operation")
                .domain(Operation::NAMES)
                .default("Plus"),
            Parameter::string("pixeltype", "Output Pixel Type")
                .domain(&PixelType::domain())
                .default(PixelType::F32.name()),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.operation = Operation::parse(scalars.text("operation")?)?;
        self.pixel_type = Some(scalars.text("pixeltype")?.parse()?);
        Ok(Configuration::new()
            .inherit(Inherit::DIMENSIONS | Inherit::NO_DATA | Inherit::RESAMPLING)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM)
            .input_mask(false)
            .resampling(true))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let a = &args.raster("a")?.info;
        let b = &args.raster("b")?.info;
        if b.band_count != 1 && b.band_count != a.band_count {
            return Err(Error::Compatibility(format!(
                "cannot combine {} bands with {} bands",
                a.band_count, b.band_count
            )));
        }
        if !a.spatial_reference.is_equivalent(&b.spatial_reference) {
            return Err(Error::Compatibility(format!(
                "inputs are in different spatial references ({} and {})",
                a.spatial_reference, b.spatial_reference
            )));
        }

        let pixel_type = self
            .pixel_type
            .ok_or_else(|| Error::Protocol("refinement before configuration".into()))?;
        let mut info = args.output_info;
        info.pixel_type = pixel_type;
        let inherited = info.no_data_for(0).or_else(|| b.no_data_for(0));
        if let Some(nd) = inherited
            && !nd.is_nan()
            && pixel_type.quantize(nd) != nd
        {
            return Err(Error::Compatibility(format!(
                "no-data value {nd} cannot be represented as {pixel_type}"
            )));
        }
        info.set_no_data(inherited);

        self.no_data_a = sentinels(a);
        self.no_data_b = sentinels(b);
        self.no_data_out = inherited;
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let a = block.raster("a")?.values();
        let b = block.raster("b")?.values();
        let (bands, rows, cols) = a.dim();
        if b.dim().1 != rows || b.dim().2 != cols {
            return Err(Error::SizeMismatch {
                expected: a.dim(),
                actual: b.dim(),
            });
        }

        let fill = self.no_data_out.unwrap_or(0.0);
        let mut out = Array3::<f64>::from_elem((bands, rows, cols), fill);
        let mut mask = Array3::<u8>::zeros((bands, rows, cols));
        for band in 0..bands {
            let b_band = if b.dim().0 == 1 { 0 } else { band };
            let nd_a = self.no_data_a.get(band).copied().flatten();
            let nd_b = self.no_data_b.get(b_band).copied().flatten();
            let av = a.index_axis(Axis(0), band);
            let bv = b.index_axis(Axis(0), b_band);
            for ((r, c), &x) in av.indexed_iter() {
                let y = bv[[r, c]];
                if is_sentinel(x, nd_a) || is_sentinel(y, nd_b) {
                    continue;
                }
                let v = self.operation.apply(x, y);
                if v.is_finite() {
                    out[[band, r, c]] = v;
                    mask[[band, r, c]] = 1;
                }
            }
        }

        block.set_output_values(request, &out);
        // Without an output sentinel validity can only travel in a mask
        if self.no_data_out.is_none() {
            block.set_output_mask(mask);
        }
        Ok(())
    }
}
