//! Scalar interpretation helpers shared by plugins

use rasterfn_core::{Error, Result, Scalars};

/// A 1-based band parameter as a zero-based index
pub(crate) fn band_index(scalars: &Scalars, name: &str) -> Result<usize> {
    Ok(whole_number(scalars, name, 1)? - 1)
}

/// A numeric parameter that must be a whole number `>= min`
pub(crate) fn whole_number(scalars: &Scalars, name: &str, min: usize) -> Result<usize> {
    let v = scalars.number(name)?;
    if v.fract() != 0.0 || v < min as f64 {
        return Err(Error::binding(
            name,
            format!("expected a whole number >= {min}, got {v}"),
        ));
    }
    Ok(v as usize)
}
