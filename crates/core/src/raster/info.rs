//! Static description of a raster

use crate::crs::SpatialReference;
use crate::error::{Error, Result};
use crate::raster::{CellSize, Extent, PixelType};
use serde::{Deserialize, Serialize};

/// Per-band statistics as exchanged with the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub skip_factor_x: u32,
    pub skip_factor_y: u32,
}

impl BandStatistics {
    /// Statistics that only pin the value range
    pub fn range(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            mean: (min + max) / 2.0,
            std_dev: (max - min) / 10.0,
            skip_factor_x: 1,
            skip_factor_y: 1,
        }
    }
}

/// Per-band histogram. The host treats the bins as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<u64>,
}

/// Indexed colormap: four parallel arrays of equal length.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Colormap {
    pub values: Vec<i32>,
    pub red: Vec<u8>,
    pub green: Vec<u8>,
    pub blue: Vec<u8>,
}

impl Colormap {
    pub fn new(values: Vec<i32>, red: Vec<u8>, green: Vec<u8>, blue: Vec<u8>) -> Result<Self> {
        let cm = Self {
            values,
            red,
            green,
            blue,
        };
        cm.validate()?;
        Ok(cm)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// RGB entry for pixel value `value`, if mapped
    /// Colour of `value`; `None` when it is absent or its entry is
    /// incomplete
    pub fn lookup(&self, value: i32) -> Option<[u8; 3]> {
        let i = self.values.iter().position(|&v| v == value)?;
        Some([*self.red.get(i)?, *self.green.get(i)?, *self.blue.get(i)?])
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.values.len();
        if self.red.len() != n || self.green.len() != n || self.blue.len() != n {
            return Err(Error::Compatibility(format!(
                "colormap arrays differ in length: values={}, red={}, green={}, blue={}",
                n,
                self.red.len(),
                self.green.len(),
                self.blue.len()
            )));
        }
        Ok(())
    }
}

/// Static properties of a raster: shape, pixel type, georeferencing and
/// the optional per-band attributes a plugin may fill during refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterInfo {
    pub band_count: usize,
    pub pixel_type: PixelType,
    /// One no-data value per band
    pub no_data: Option<Vec<f64>>,
    pub cell_size: CellSize,
    pub extent: Extent,
    pub native_extent: Option<Extent>,
    pub spatial_reference: SpatialReference,
    pub native_spatial_reference: Option<SpatialReference>,
    pub geodata_xform: Option<String>,
    pub origin: Option<(f64, f64)>,
    pub level_of_details: u32,
    pub statistics: Option<Vec<BandStatistics>>,
    pub histogram: Option<Vec<Histogram>>,
    pub colormap: Option<Colormap>,
    pub raster_attribute_table: Option<serde_json::Value>,
    pub resampling: bool,
    pub band_selection: bool,
}

impl RasterInfo {
    /// A raster covering `extent` at `cell_size`
    pub fn new(
        band_count: usize,
        pixel_type: PixelType,
        extent: Extent,
        cell_size: CellSize,
        spatial_reference: SpatialReference,
    ) -> Self {
        Self {
            band_count,
            pixel_type,
            no_data: None,
            cell_size,
            extent,
            native_extent: Some(extent),
            spatial_reference,
            native_spatial_reference: None,
            geodata_xform: None,
            origin: Some((extent.x_min, extent.y_max)),
            level_of_details: 0,
            statistics: None,
            histogram: None,
            colormap: None,
            raster_attribute_table: None,
            resampling: false,
            band_selection: false,
        }
    }

    /// Neutral description used when nothing can be inherited
    pub fn neutral() -> Self {
        Self {
            native_extent: None,
            origin: None,
            ..Self::new(
                1,
                PixelType::F32,
                Extent::default(),
                CellSize::default(),
                SpatialReference::default(),
            )
        }
    }

    /// Builder-style no-data setter, one value repeated for every band
    pub fn with_no_data(mut self, value: f64) -> Self {
        self.no_data = Some(vec![value; self.band_count]);
        self
    }

    /// Number of columns at native cell size
    pub fn width(&self) -> usize {
        self.extent.grid_shape(self.cell_size).1
    }

    /// Number of rows at native cell size
    pub fn height(&self) -> usize {
        self.extent.grid_shape(self.cell_size).0
    }

    /// No-data value of band `band`, if any
    pub fn no_data_for(&self, band: usize) -> Option<f64> {
        self.no_data
            .as_ref()
            .and_then(|nd| nd.get(band).or_else(|| nd.first()).copied())
    }

    /// Set no-data to `value` for every band, or clear it
    pub fn set_no_data(&mut self, value: Option<f64>) {
        self.no_data = value.map(|v| vec![v; self.band_count]);
    }

    /// Replace the band count, keeping per-band vectors consistent
    pub fn set_band_count(&mut self, band_count: usize) {
        self.band_count = band_count;
        if let Some(nd) = self.no_data.as_mut() {
            let fill = nd.first().copied().unwrap_or(0.0);
            nd.resize(band_count, fill);
        }
        self.statistics = None;
        self.histogram = None;
    }

    /// Set the same value range on every band
    pub fn set_statistics_range(&mut self, min: f64, max: f64) {
        self.statistics = Some(vec![BandStatistics::range(min, max); self.band_count]);
    }

    /// Check the structural invariants of a raster description
    pub fn validate(&self) -> Result<()> {
        if self.band_count == 0 {
            return Err(Error::Compatibility("band count must be positive".into()));
        }
        if !self.cell_size.is_valid() {
            return Err(Error::Compatibility(format!(
                "cell size must be positive, got ({}, {})",
                self.cell_size.x, self.cell_size.y
            )));
        }
        if let Some(nd) = &self.no_data
            && nd.len() != self.band_count
        {
            return Err(Error::Compatibility(format!(
                "{} no-data values for {} bands",
                nd.len(),
                self.band_count
            )));
        }
        if let Some(stats) = &self.statistics
            && stats.len() != self.band_count
        {
            return Err(Error::Compatibility(format!(
                "{} statistics entries for {} bands",
                stats.len(),
                self.band_count
            )));
        }
        if let Some(cm) = &self.colormap {
            cm.validate()?;
        }
        if !self.extent.is_empty() {
            let cols = self.extent.width() / self.cell_size.x;
            let rows = self.extent.height() / self.cell_size.y;
            if (cols - cols.round()).abs() > 1e-6 || (rows - rows.round()).abs() > 1e-6 {
                return Err(Error::Compatibility(format!(
                    "extent {}x{} is not a whole number of {}x{} cells",
                    self.extent.width(),
                    self.extent.height(),
                    self.cell_size.x,
                    self.cell_size.y
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> RasterInfo {
        RasterInfo::new(
            3,
            PixelType::U16,
            Extent::new(0.0, 0.0, 30.0, 20.0),
            CellSize::square(10.0),
            SpatialReference::from_epsg(32633),
        )
    }

    #[test]
    fn test_dimensions() {
        let i = info();
        assert_eq!(i.width(), 3);
        assert_eq!(i.height(), 2);
        assert!(i.validate().is_ok());
    }

    #[test]
    fn test_no_data_per_band() {
        let mut i = info().with_no_data(0.0);
        assert_eq!(i.no_data_for(2), Some(0.0));
        i.set_band_count(1);
        assert_eq!(i.no_data, Some(vec![0.0]));
        assert!(i.validate().is_ok());
    }

    #[test]
    fn test_statistics_length_checked() {
        let mut i = info();
        i.statistics = Some(vec![BandStatistics::range(0.0, 1.0)]);
        assert!(matches!(i.validate(), Err(Error::Compatibility(_))));
        i.set_statistics_range(0.0, 1.0);
        assert!(i.validate().is_ok());
    }

    #[test]
    fn test_extent_must_match_cells() {
        let mut i = info();
        i.extent.x_max = 35.0;
        assert!(i.validate().is_err());
    }

    #[test]
    fn test_colormap_lengths() {
        assert!(Colormap::new(vec![0, 1], vec![0, 255], vec![0, 255], vec![0]).is_err());
        let cm = Colormap::new(vec![0, 1], vec![0, 255], vec![0, 255], vec![0, 255]).unwrap();
        assert_eq!(cm.lookup(1), Some([255, 255, 255]));
        assert_eq!(cm.lookup(7), None);
    }

    #[test]
    fn test_colormap_lookup_with_ragged_arrays() {
        let cm = Colormap {
            values: vec![0, 1, 2],
            red: vec![10, 20, 30],
            green: vec![40, 50],
            blue: vec![60, 70, 80],
        };
        assert!(cm.validate().is_err());
        assert_eq!(cm.lookup(1), Some([20, 50, 70]));
        assert_eq!(cm.lookup(2), None);
        assert_eq!(cm.lookup(3), None);
    }
}
