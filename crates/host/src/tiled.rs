//! Tiling of the output grid

use std::ops::Range;

/// A rectangular block of output pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// First output row covered
    pub row: usize,
    /// First output column covered
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Tile {
    pub fn new(row: usize, col: usize, rows: usize, cols: usize) -> Self {
        Self { row, col, rows, cols }
    }

    /// Top-left corner as `(col, row)`, the order tile requests use
    pub fn tlc(&self) -> (usize, usize) {
        (self.col, self.row)
    }

    pub fn row_range(&self) -> Range<usize> {
        self.row..self.row + self.rows
    }

    pub fn col_range(&self) -> Range<usize> {
        self.col..self.col + self.cols
    }
}

/// Non-overlapping tiles covering a `total_rows x total_cols` grid,
/// row-major.
///
/// Edge tiles are clipped to the grid. Halo pixels are not part of a tile;
/// the host grows input windows by the plugin's padding instead.
#[derive(Debug, Clone)]
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    /// Tiles per grid row
    across: usize,
    next: usize,
    count: usize,
}

impl TileIterator {
    /// `tile_size` of 0 is treated as 1
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize) -> Self {
        let tile_size = tile_size.max(1);
        let across = total_cols.div_ceil(tile_size);
        Self {
            total_rows,
            total_cols,
            tile_size,
            across,
            next: 0,
            count: across * total_rows.div_ceil(tile_size),
        }
    }

    /// Number of tiles this iterator yields in total
    pub fn tile_count(&self) -> usize {
        self.count
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        if self.next >= self.count {
            return None;
        }
        let row = (self.next / self.across) * self.tile_size;
        let col = (self.next % self.across) * self.tile_size;
        self.next += 1;
        Some(Tile::new(
            row,
            col,
            self.tile_size.min(self.total_rows - row),
            self.tile_size.min(self.total_cols - col),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for TileIterator {}
