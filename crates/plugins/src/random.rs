//! Uniform random samples over an input footprint
//!
//! With a `seed`, every tile draws from a generator seeded by the seed and
//! the tile's top-left corner, so a tile renders the same each time it is
//! requested. Without one, samples come from OS entropy.

use ndarray::Array3;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rasterfn_core::prelude::*;

#[derive(Debug, Clone)]
pub struct Random {
    seed: Option<u64>,
    min: f64,
    max: f64,
}

impl Default for Random {
    fn default() -> Self {
        Self {
            seed: None,
            min: 0.0,
            max: 1.0,
        }
    }
}

impl Random {
    fn rng_for(&self, tlc: (usize, usize)) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ ((tlc.0 as u64) << 32 | tlc.1 as u64)),
            None => StdRng::from_entropy(),
        }
    }
}

impl RasterFunction for Random {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn description(&self) -> &'static str {
        "Uniform random values over the footprint of an input raster"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("raster", "Footprint Raster")
                .describe("Defines extent, cell size and valid pixels of the output"),
            Parameter::numeric("seed", "Seed").describe("Makes the output reproducible"),
            Parameter::numeric("min", "Minimum").default(0.0),
            Parameter::numeric("max", "Maximum").default(1.0),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.min = scalars.number("min")?;
        self.max = scalars.number("max")?;
        if !(self.min.is_finite() && self.max.is_finite()) || self.min >= self.max {
            return Err(Error::binding(
                "max",
                format!("need min < max, got [{}, {}]", self.min, self.max),
            ));
        }
        self.seed = scalars.number_opt("seed")?.map(|s| s as u64);

        Ok(Configuration::new()
            .extract_bands(vec![0])
            .inherit(Inherit::DIMENSIONS | Inherit::RESAMPLING)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM | Invalidate::KEY_METADATA)
            .input_mask(true)
            .resampling(true))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let mut info = args.output_info;
        info.set_band_count(1);
        info.pixel_type = PixelType::F32;
        info.no_data = None;
        info.set_statistics_range(self.min, self.max);
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let mask = block.raster("raster")?.mask_or_valid();
        if mask.dim() != request.shape {
            return Err(Error::SizeMismatch {
                expected: request.shape,
                actual: mask.dim(),
            });
        }

        let uniform = Uniform::new(self.min, self.max);
        let mut rng = self.rng_for(request.tlc);
        let mut out = Array3::<f64>::zeros(request.shape);
        for (o, &m) in out.iter_mut().zip(mask.iter()) {
            // draw for every pixel so masked pixels do not shift the stream
            let v = rng.sample(uniform);
            if m != 0 {
                *o = v;
            }
        }

        block.set_output_values(request, &out);
        block.set_output_mask(mask);
        Ok(())
    }
}
