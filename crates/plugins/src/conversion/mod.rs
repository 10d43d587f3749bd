//! Unit and rate conversions
//!
//! - **per_month**: per-second rates to per-month totals
//! - **heat_index**: apparent temperature from temperature and humidity
//! - **wind_chill**: apparent temperature from temperature and wind speed

mod heat_index;
mod per_month;
mod units;
mod wind_chill;

pub use heat_index::HeatIndex;
pub use per_month::PerSecondToPerMonth;
pub use units::{TEMPERATURE_UNITS, Temperature, WIND_UNITS, WindSpeed};
pub use wind_chill::WindChill;

use ndarray::Array3;
use rasterfn_core::raster::neighborhood::combine_masks;
use rasterfn_core::{Error, PixelBlock, Result, TileRequest};

/// Values of two single-band inputs plus the AND of their masks
pub(crate) fn paired(
    block: &PixelBlock,
    request: &TileRequest,
    first: &str,
    second: &str,
) -> Result<(Array3<f64>, Array3<f64>, Array3<u8>)> {
    let a = block.raster(first)?;
    let b = block.raster(second)?;
    for shape in [a.shape(), b.shape()] {
        if shape != request.shape {
            return Err(Error::SizeMismatch {
                expected: request.shape,
                actual: shape,
            });
        }
    }
    let (ma, mb) = (a.mask_or_valid(), b.mask_or_valid());
    let mask = combine_masks(&[ma.view(), mb.view()])?;
    Ok((a.values(), b.values(), mask))
}
