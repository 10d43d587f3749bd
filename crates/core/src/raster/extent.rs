//! Map-space footprint of rasters and tiles

use serde::{Deserialize, Serialize};

/// Cell size in map units along x and y (both positive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellSize {
    pub x: f64,
    pub y: f64,
}

impl CellSize {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Square cells
    pub fn square(size: f64) -> Self {
        Self { x: size, y: size }
    }

    /// Scale both components by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.x > 0.0 && self.y > 0.0 && self.x.is_finite() && self.y.is_finite()
    }

    /// Approximate equality, relative to the cell size itself
    pub fn approx_eq(&self, other: &CellSize) -> bool {
        let tol = 1e-9 * self.x.abs().max(self.y.abs()).max(1.0);
        (self.x - other.x).abs() <= tol && (self.y - other.y).abs() <= tol
    }
}

impl Default for CellSize {
    fn default() -> Self {
        Self::square(1.0)
    }
}

/// Axis-aligned bounding box `(x_min, y_min, x_max, y_max)` in map units.
///
/// Rows run from `y_max` downwards; pixel `(col, row)` of a raster with cell
/// size `(dx, dy)` covers `[x_min + col*dx, x_min + (col+1)*dx]` horizontally
/// and `[y_max - (row+1)*dy, y_max - row*dy]` vertically.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Extent {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Extent {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Extent of a `rows x cols` grid whose upper-left corner is `(x_min, y_max)`
    pub fn from_origin(x_min: f64, y_max: f64, cell: CellSize, rows: usize, cols: usize) -> Self {
        Self {
            x_min,
            y_min: y_max - rows as f64 * cell.y,
            x_max: x_min + cols as f64 * cell.x,
            y_max,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Number of whole `(rows, cols)` covered at `cell` resolution
    pub fn grid_shape(&self, cell: CellSize) -> (usize, usize) {
        let rows = (self.height() / cell.y).round().max(0.0) as usize;
        let cols = (self.width() / cell.x).round().max(0.0) as usize;
        (rows, cols)
    }

    /// Smallest extent covering both
    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Grow the extent so width and height are whole multiples of `cell`.
    ///
    /// The upper-left corner is kept; `x_max` and `y_min` move outward:
    /// `x_max := x_min + ceil(w/dx)*dx`, `y_min := y_max - ceil(h/dy)*dy`.
    pub fn snap_to_grid(&self, cell: CellSize) -> Extent {
        // Tolerate floating-point noise just above a whole multiple
        let snap = |span: f64, step: f64| {
            let n = span / step;
            let nearest = n.round();
            if (n - nearest).abs() < 1e-9 { nearest } else { n.ceil() }
        };
        let cols = snap(self.width(), cell.x);
        let rows = snap(self.height(), cell.y);
        Extent {
            x_min: self.x_min,
            y_min: self.y_max - rows * cell.y,
            x_max: self.x_min + cols * cell.x,
            y_max: self.y_max,
        }
    }

    /// Extent of the tile whose top-left pixel is `tlc = (col, row)`
    pub fn tile(&self, tlc: (usize, usize), rows: usize, cols: usize, cell: CellSize) -> Extent {
        let x_min = self.x_min + tlc.0 as f64 * cell.x;
        let y_max = self.y_max - tlc.1 as f64 * cell.y;
        Extent::from_origin(x_min, y_max, cell, rows, cols)
    }

    /// Grow by `cells` cells on every side
    pub fn padded(&self, cells: usize, cell: CellSize) -> Extent {
        let px = cells as f64 * cell.x;
        let py = cells as f64 * cell.y;
        Extent {
            x_min: self.x_min - px,
            y_min: self.y_min - py,
            x_max: self.x_max + px,
            y_max: self.y_max + py,
        }
    }

    /// Fractional `(col, row)` of map point `(x, y)` in a grid anchored here
    pub fn to_pixel(&self, x: f64, y: f64, cell: CellSize) -> (f64, f64) {
        ((x - self.x_min) / cell.x, (self.y_max - y) / cell.y)
    }

    /// Map coordinates of the centre of pixel `(col, row)`
    pub fn pixel_center(&self, col: usize, row: usize, cell: CellSize) -> (f64, f64) {
        (
            self.x_min + (col as f64 + 0.5) * cell.x,
            self.y_max - (row as f64 + 0.5) * cell.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_snap_to_grid() {
        let e = Extent::new(0.0, 0.5, 10.5, 20.0);
        let snapped = e.snap_to_grid(CellSize::square(2.0));
        assert_relative_eq!(snapped.x_min, 0.0);
        assert_relative_eq!(snapped.x_max, 12.0);
        assert_relative_eq!(snapped.y_max, 20.0);
        assert_relative_eq!(snapped.y_min, 0.0);
        assert_relative_eq!(snapped.width() % 2.0, 0.0);
    }

    #[test]
    fn test_snap_keeps_exact_multiples() {
        let e = Extent::new(0.0, 0.0, 0.3 * 3.0, 0.9);
        let snapped = e.snap_to_grid(CellSize::square(0.3));
        assert_eq!(snapped.grid_shape(CellSize::square(0.3)), (3, 3));
    }

    #[test]
    fn test_tile_extent() {
        let e = Extent::new(100.0, 0.0, 200.0, 50.0);
        let t = e.tile((10, 5), 4, 8, CellSize::square(1.0));
        assert_relative_eq!(t.x_min, 110.0);
        assert_relative_eq!(t.x_max, 118.0);
        assert_relative_eq!(t.y_max, 45.0);
        assert_relative_eq!(t.y_min, 41.0);
    }

    #[test]
    fn test_pixel_roundtrip() {
        let e = Extent::new(0.0, 0.0, 100.0, 100.0);
        let cell = CellSize::square(10.0);
        let (x, y) = e.pixel_center(3, 7, cell);
        let (col, row) = e.to_pixel(x, y, cell);
        assert_relative_eq!(col, 3.5, epsilon = 1e-10);
        assert_relative_eq!(row, 7.5, epsilon = 1e-10);
    }

    #[test]
    fn test_union_and_shape() {
        let a = Extent::new(0.0, 0.0, 4.0, 4.0);
        let b = Extent::new(2.0, -2.0, 6.0, 2.0);
        let u = a.union(&b);
        assert_eq!(u, Extent::new(0.0, -2.0, 6.0, 4.0));
        assert_eq!(u.grid_shape(CellSize::square(2.0)), (3, 3));
    }
}
