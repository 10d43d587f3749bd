//! Neighborhood and padded-window operations on tile arrays
//!
//! A plugin that declares `padding = k` receives every input with `k` extra
//! rows and columns on each side. These helpers fold validity masks over the
//! `(2k+1) x (2k+1)` stamp of each output pixel.

use crate::error::{Error, Result};
use ndarray::{Array3, ArrayView3, Axis, Zip};

/// Footprint of a moving window, by radius in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// Full `(2r+1) x (2r+1)` square
    Square(usize),
    /// Cells whose centre lies within `r` cells of the centre cell
    Circle(usize),
}

impl Neighborhood {
    pub fn radius(&self) -> usize {
        match *self {
            Neighborhood::Square(r) | Neighborhood::Circle(r) => r,
        }
    }

    /// Row and column offsets covered by the window, row-major
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius() as isize;
        let within = |dr: isize, dc: isize| match self {
            Neighborhood::Square(_) => true,
            Neighborhood::Circle(_) => dr * dr + dc * dc <= r * r,
        };
        (-r..=r)
            .flat_map(|dr| (-r..=r).map(move |dc| (dr, dc)))
            .filter(|&(dr, dc)| within(dr, dc))
            .collect()
    }
}

/// Shape of the unpadded block, checking the input is large enough
fn core_shape(dim: (usize, usize, usize), padding: usize) -> Result<(usize, usize, usize)> {
    let (bands, rows, cols) = dim;
    if rows < 2 * padding || cols < 2 * padding {
        return Err(Error::Protocol(format!(
            "{rows}x{cols} block is smaller than a padding of {padding} on each side"
        )));
    }
    Ok((bands, rows - 2 * padding, cols - 2 * padding))
}

/// AND a padded validity mask over the `(2k+1) x (2k+1)` stamp of each
/// output pixel.
///
/// Input shape `(b, rows + 2k, cols + 2k)`, output shape `(b, rows, cols)`.
/// The fold is separable: first along rows, then along columns.
pub fn and_over_window(mask: ArrayView3<'_, u8>, padding: usize) -> Result<Array3<u8>> {
    let (bands, rows, cols) = core_shape(mask.dim(), padding)?;
    if padding == 0 {
        return Ok(mask.mapv(|m| u8::from(m != 0)));
    }
    let width = 2 * padding + 1;
    let padded_cols = mask.dim().2;

    let mut vertical = Array3::<u8>::zeros((bands, rows, padded_cols));
    for b in 0..bands {
        for r in 0..rows {
            for c in 0..padded_cols {
                let all = (r..r + width).all(|rr| mask[[b, rr, c]] != 0);
                vertical[[b, r, c]] = u8::from(all);
            }
        }
    }

    let mut out = Array3::<u8>::zeros((bands, rows, cols));
    for b in 0..bands {
        for r in 0..rows {
            for c in 0..cols {
                let all = (c..c + width).all(|cc| vertical[[b, r, cc]] != 0);
                out[[b, r, c]] = u8::from(all);
            }
        }
    }
    Ok(out)
}

/// Element-wise AND of same-shaped masks
pub fn combine_masks(masks: &[ArrayView3<'_, u8>]) -> Result<Array3<u8>> {
    let first = masks
        .first()
        .ok_or_else(|| Error::Other("no masks to combine".into()))?;
    let mut out = first.mapv(|m| u8::from(m != 0));
    for m in &masks[1..] {
        if m.dim() != out.dim() {
            return Err(Error::SizeMismatch {
                expected: out.dim(),
                actual: m.dim(),
            });
        }
        Zip::from(&mut out).and(m).for_each(|o, &v| {
            if v == 0 {
                *o = 0;
            }
        });
    }
    Ok(out)
}

/// AND a multi-band mask down to a single band
pub fn collapse_bands(mask: ArrayView3<'_, u8>) -> Array3<u8> {
    mask.map_axis(Axis(0), |lane| u8::from(lane.iter().all(|&m| m != 0)))
        .insert_axis(Axis(0))
}
