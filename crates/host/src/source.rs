//! Where the host reads input pixels from

use ndarray::Array3;
use rasterfn_core::{DatasetMetadata, Error, PixelArray, RasterInfo, Result};
use std::fmt;
use std::sync::Arc;

/// A readable raster bound to a plugin input.
///
/// The host only ever asks for single native pixels; windowing and
/// resampling happen on its side.
pub trait RasterSource: Send + Sync + fmt::Debug {
    fn info(&self) -> &RasterInfo;

    fn metadata(&self) -> &DatasetMetadata;

    /// Value and validity of native pixel `(band, row, col)`, or `None`
    /// outside the raster
    fn pixel(&self, band: usize, row: usize, col: usize) -> Option<(f64, bool)>;

    /// Whether validity comes from an explicit mask rather than the
    /// no-data sentinel
    fn has_mask(&self) -> bool {
        false
    }
}

/// A raster held entirely in memory
#[derive(Debug, Clone)]
pub struct InMemoryRaster {
    info: RasterInfo,
    metadata: DatasetMetadata,
    values: Array3<f64>,
    mask: Option<Array3<u8>>,
}

impl InMemoryRaster {
    /// Wrap `pixels`, which must match the band count, pixel type and grid
    /// of `info`
    pub fn new(info: RasterInfo, pixels: PixelArray) -> Result<Self> {
        info.validate()?;
        if pixels.pixel_type() != info.pixel_type {
            return Err(Error::Compatibility(format!(
                "pixels are {} but the raster is declared {}",
                pixels.pixel_type().name(),
                info.pixel_type.name()
            )));
        }
        let expected = (info.band_count, info.height(), info.width());
        if pixels.shape() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: pixels.shape(),
            });
        }
        Ok(Self {
            values: pixels.to_f64(),
            info,
            metadata: DatasetMetadata::default(),
            mask: None,
        })
    }

    /// Like [`new`](Self::new), quantizing `values` to the declared pixel type
    pub fn from_values(info: RasterInfo, values: &Array3<f64>) -> Result<Self> {
        let pixels = PixelArray::from_f64(info.pixel_type, values);
        Self::new(info, pixels)
    }

    /// Attach an explicit validity mask (`1` = valid)
    pub fn with_mask(mut self, mask: Array3<u8>) -> Result<Self> {
        if mask.dim() != self.values.dim() {
            return Err(Error::SizeMismatch {
                expected: self.values.dim(),
                actual: mask.dim(),
            });
        }
        self.mask = Some(mask);
        Ok(self)
    }

    pub fn with_metadata(mut self, metadata: DatasetMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn shared(self) -> Arc<dyn RasterSource> {
        Arc::new(self)
    }
}

impl RasterSource for InMemoryRaster {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    fn pixel(&self, band: usize, row: usize, col: usize) -> Option<(f64, bool)> {
        let value = *self.values.get([band, row, col])?;
        let valid = match &self.mask {
            Some(mask) => mask[[band, row, col]] != 0,
            None => !value.is_nan() && self.info.no_data_for(band) != Some(value),
        };
        Some((value, valid))
    }

    fn has_mask(&self) -> bool {
        self.mask.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rasterfn_core::{CellSize, Extent, PixelType, SpatialReference};

    fn info(pixel_type: PixelType) -> RasterInfo {
        RasterInfo::new(
            1,
            pixel_type,
            Extent::new(0.0, 0.0, 2.0, 2.0),
            CellSize::square(1.0),
            SpatialReference::from_epsg(32633),
        )
    }

    #[test]
    fn test_sentinel_validity() {
        let sentinel = info(PixelType::I16).with_no_data(-9999.0);
        let raster =
            InMemoryRaster::from_values(sentinel, &array![[[1.0, -9999.0], [3.0, 4.0]]]).unwrap();
        assert_eq!(raster.pixel(0, 0, 0), Some((1.0, true)));
        assert_eq!(raster.pixel(0, 0, 1), Some((-9999.0, false)));
        assert_eq!(raster.pixel(0, 2, 0), None);
        assert_eq!(raster.pixel(1, 0, 0), None);
    }

    #[test]
    fn test_explicit_mask_wins() {
        let values = array![[[1.0, f64::NAN], [3.0, 4.0]]];
        let raster = InMemoryRaster::from_values(info(PixelType::F32), &values)
            .unwrap()
            .with_mask(array![[[0, 1], [1, 1]]])
            .unwrap();
        assert_eq!(raster.pixel(0, 0, 0), Some((1.0, false)));
        assert!(raster.pixel(0, 0, 1).unwrap().1);
    }

    #[test]
    fn test_nan_is_invalid_without_mask() {
        let values = array![[[f64::NAN, 2.0], [3.0, 4.0]]];
        let raster = InMemoryRaster::from_values(info(PixelType::F64), &values).unwrap();
        assert!(!raster.pixel(0, 0, 0).unwrap().1);
    }

    #[test]
    fn test_rejects_mismatches() {
        let values = Array3::<f64>::zeros((1, 3, 2));
        assert!(matches!(
            InMemoryRaster::from_values(info(PixelType::F32), &values),
            Err(Error::SizeMismatch { .. })
        ));
        let pixels = PixelArray::zeros(PixelType::U8, (1, 2, 2));
        assert!(matches!(
            InMemoryRaster::new(info(PixelType::F32), pixels),
            Err(Error::Compatibility(_))
        ));
        let raster =
            InMemoryRaster::from_values(info(PixelType::F32), &Array3::zeros((1, 2, 2))).unwrap();
        assert!(raster.with_mask(Array3::ones((1, 1, 2))).is_err());
    }
}
