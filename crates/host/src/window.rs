//! Padded input windows sampled for one tile request

use ndarray::Array3;
use rasterfn_core::{CellSize, Extent, PixelArray, TileRequest};

use crate::source::RasterSource;

/// The grid an input is sampled on for one tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub extent: Extent,
    pub cell_size: CellSize,
    pub rows: usize,
    pub cols: usize,
}

impl Window {
    /// Window of an input with native cell `native` for `request`.
    ///
    /// With resampling the window uses the requested cell size and shape;
    /// without, the tile footprint is covered at the native cell size. Either
    /// way it grows by `padding` window pixels on every side.
    pub fn for_request(
        request: &TileRequest,
        native: CellSize,
        padding: usize,
        resampling: bool,
    ) -> Self {
        let tile = request.props.extent;
        let (cell_size, rows, cols) = if resampling {
            (request.props.cell_size, request.rows(), request.cols())
        } else {
            let (rows, cols) = tile.grid_shape(native);
            (native, rows, cols)
        };
        Self {
            extent: tile.padded(padding, cell_size),
            cell_size,
            rows: rows + 2 * padding,
            cols: cols + 2 * padding,
        }
    }

    /// Nearest-neighbour sample of `bands` of `source` on this grid.
    ///
    /// Returns pixels in the source's pixel type and a mask that is 0 for
    /// invalid source pixels and for pixels outside the source.
    pub fn sample(&self, source: &dyn RasterSource, bands: &[usize]) -> (PixelArray, Array3<u8>) {
        let info = source.info();
        let shape = (bands.len(), self.rows, self.cols);
        let mut values = Array3::<f64>::zeros(shape);
        let mut mask = Array3::<u8>::zeros(shape);

        for r in 0..self.rows {
            for c in 0..self.cols {
                let (x, y) = self.extent.pixel_center(c, r, self.cell_size);
                let (sc, sr) = info.extent.to_pixel(x, y, info.cell_size);
                let inside = sc >= 0.0 && sr >= 0.0;
                for (i, &band) in bands.iter().enumerate() {
                    let read = if inside {
                        source.pixel(band, sr.floor() as usize, sc.floor() as usize)
                    } else {
                        None
                    };
                    let fallback = info.no_data_for(band).unwrap_or(0.0);
                    let (value, valid) = read.unwrap_or((fallback, false));
                    values[[i, r, c]] = value;
                    mask[[i, r, c]] = u8::from(valid);
                }
            }
        }

        (PixelArray::from_f64(info.pixel_type, &values), mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryRaster;
    use rasterfn_core::{PixelType, RasterInfo, SpatialReference, TileProperties};

    fn source() -> InMemoryRaster {
        let info = RasterInfo::new(
            2,
            PixelType::I16,
            Extent::new(0.0, 0.0, 4.0, 4.0),
            CellSize::square(1.0),
            SpatialReference::from_epsg(32633),
        )
        .with_no_data(-1.0);
        let values = Array3::from_shape_fn((2, 4, 4), |(b, r, c)| (b * 100 + r * 4 + c) as f64);
        InMemoryRaster::from_values(info, &values).unwrap()
    }

    fn request(tlc: (usize, usize), rows: usize, cols: usize, cell: f64) -> TileRequest {
        let origin = Extent::new(0.0, 0.0, 4.0, 4.0);
        let cell = CellSize::square(cell);
        TileRequest {
            tlc,
            shape: (1, rows, cols),
            props: TileProperties {
                extent: origin.tile(tlc, rows, cols, cell),
                cell_size: cell,
                pixel_type: PixelType::F32,
                no_data: None,
                spatial_reference: SpatialReference::from_epsg(32633),
                width: cols,
                height: rows,
            },
        }
    }

    #[test]
    fn test_padded_window_reads_halo() {
        let src = source();
        let req = request((1, 1), 2, 2, 1.0);
        let window = Window::for_request(&req, CellSize::square(1.0), 1, true);
        assert_eq!((window.rows, window.cols), (4, 4));
        let (px, mask) = window.sample(&src, &[0]);
        let values = px.to_f64();
        assert_eq!(values[[0, 0, 0]], 0.0);
        assert_eq!(values[[0, 3, 3]], 15.0);
        assert_eq!(mask.sum(), 16);
    }

    #[test]
    fn test_outside_is_masked_and_filled() {
        let src = source();
        let req = request((0, 0), 2, 2, 1.0);
        let window = Window::for_request(&req, CellSize::square(1.0), 1, true);
        let (px, mask) = window.sample(&src, &[1]);
        let values = px.to_f64();
        assert_eq!(mask[[0, 0, 0]], 0);
        assert_eq!(values[[0, 0, 0]], -1.0);
        assert_eq!(mask[[0, 1, 1]], 1);
        assert_eq!(values[[0, 1, 1]], 100.0);
        assert_eq!(mask.sum(), 9);
    }

    #[test]
    fn test_native_window_without_resampling() {
        // A 1x1 tile at cell 2 covers a 2x2 native block
        let src = source();
        let req = request((1, 0), 1, 1, 2.0);
        let window = Window::for_request(&req, CellSize::square(1.0), 0, false);
        assert_eq!((window.rows, window.cols, window.cell_size), (2, 2, CellSize::square(1.0)));
        let (px, _) = window.sample(&src, &[0]);
        assert_eq!(px.to_f64().into_raw_vec_and_offset().0, vec![2.0, 3.0, 6.0, 7.0]);
    }

    #[test]
    fn test_resampled_window_picks_nearest() {
        let src = source();
        let req = request((0, 0), 2, 2, 2.0);
        let window = Window::for_request(&req, CellSize::square(1.0), 0, true);
        let (px, _) = window.sample(&src, &[0, 1]);
        assert_eq!(px.shape(), (2, 2, 2));
        let values = px.to_f64();
        // Centre (1, 3) falls in native pixel row 1, col 1
        assert_eq!(values[[0, 0, 0]], 5.0);
        assert_eq!(values[[1, 1, 1]], 115.0);
    }
}
