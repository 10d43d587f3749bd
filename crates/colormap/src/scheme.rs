//! Colour ramps and multi-stop interpolation

use rasterfn_core::{Error, Result};
use std::str::FromStr;

/// RGB colour, each channel in 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn mix(self, other: Rgb, t: f64) -> Rgb {
        let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

/// Position in [0, 1] and the colour pinned there
type Stop = (f64, Rgb);

/// Built-in colour ramps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// Dark green -> sand -> brown -> snow (elevation)
    Terrain,
    /// Blue -> white -> red (signed values)
    Divergent,
    /// Black -> white
    Grayscale,
    /// Red -> yellow -> green (vegetation indices)
    Ndvi,
}

const TERRAIN: &[Stop] = &[
    (0.0, Rgb::new(0, 97, 71)),
    (0.3, Rgb::new(86, 161, 73)),
    (0.6, Rgb::new(209, 196, 124)),
    (0.85, Rgb::new(140, 98, 60)),
    (1.0, Rgb::new(250, 250, 250)),
];

const DIVERGENT: &[Stop] = &[
    (0.0, Rgb::new(33, 102, 172)),
    (0.5, Rgb::new(247, 247, 247)),
    (1.0, Rgb::new(178, 24, 43)),
];

const GRAYSCALE: &[Stop] = &[(0.0, Rgb::new(0, 0, 0)), (1.0, Rgb::new(255, 255, 255))];

const NDVI: &[Stop] = &[
    (0.0, Rgb::new(165, 0, 38)),
    (0.25, Rgb::new(244, 109, 67)),
    (0.5, Rgb::new(254, 224, 139)),
    (0.75, Rgb::new(102, 189, 99)),
    (1.0, Rgb::new(0, 104, 55)),
];

impl ColorScheme {
    pub const ALL: &[ColorScheme] = &[Self::Terrain, Self::Divergent, Self::Grayscale, Self::Ndvi];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Terrain => "Terrain",
            Self::Divergent => "Divergent",
            Self::Grayscale => "Grayscale",
            Self::Ndvi => "NDVI",
        }
    }

    fn stops(&self) -> &'static [Stop] {
        match self {
            Self::Terrain => TERRAIN,
            Self::Divergent => DIVERGENT,
            Self::Grayscale => GRAYSCALE,
            Self::Ndvi => NDVI,
        }
    }
}

impl FromStr for ColorScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::binding("colorscheme", format!("unknown colour scheme `{s}`")))
    }
}

/// Evaluate a colour scheme at normalized position `t` in [0, 1].
///
/// Values outside the unit interval clamp to the end colours.
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    let stops = scheme.stops();
    match stops.iter().position(|&(at, _)| t <= at) {
        Some(0) => stops[0].1,
        Some(i) => {
            let (lo, hi) = (stops[i - 1], stops[i]);
            lo.1.mix(hi.1, (t - lo.0) / (hi.0 - lo.0))
        }
        None => stops[stops.len() - 1].1,
    }
}
