//! Pixel types and the element trait tying them to Rust numerics

use crate::error::{Error, Result};
use num_traits::{NumCast, Zero};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;

/// Closed set of pixel types a raster or a tile can carry.
///
/// The packed 1/2/4-bit types are stored one value per byte and clamped to
/// their bit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelType {
    U1,
    U2,
    U4,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl PixelType {
    pub const ALL: &[PixelType] = &[
        Self::U1,
        Self::U2,
        Self::U4,
        Self::U8,
        Self::I8,
        Self::U16,
        Self::I16,
        Self::U32,
        Self::I32,
        Self::F32,
        Self::F64,
    ];

    /// Long name as used in parameter domains (`8_BIT_UNSIGNED`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::U1 => "1_BIT",
            Self::U2 => "2_BIT",
            Self::U4 => "4_BIT",
            Self::U8 => "8_BIT_UNSIGNED",
            Self::I8 => "8_BIT_SIGNED",
            Self::U16 => "16_BIT_UNSIGNED",
            Self::I16 => "16_BIT_SIGNED",
            Self::U32 => "32_BIT_UNSIGNED",
            Self::I32 => "32_BIT_SIGNED",
            Self::F32 => "32_BIT_FLOAT",
            Self::F64 => "64_BIT",
        }
    }

    /// Compact (numpy-style) name, if the type has one.
    pub fn compact_name(&self) -> Option<&'static str> {
        match self {
            Self::U8 => Some("u1"),
            Self::U16 => Some("u2"),
            Self::U32 => Some("u4"),
            Self::I8 => Some("i1"),
            Self::I16 => Some("i2"),
            Self::I32 => Some("i4"),
            Self::F32 => Some("f4"),
            Self::F64 => Some("f8"),
            Self::U1 | Self::U2 | Self::U4 => None,
        }
    }

    /// Every string the pixel-type domain accepts, long forms first.
    pub fn domain() -> Vec<String> {
        let mut names: Vec<String> = Self::ALL.iter().map(|t| t.name().to_string()).collect();
        names.extend(Self::ALL.iter().filter_map(|t| t.compact_name()).map(String::from));
        names
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Number of significant bits per value.
    pub fn bits(&self) -> u32 {
        match self {
            Self::U1 => 1,
            Self::U2 => 2,
            Self::U4 => 4,
            Self::U8 | Self::I8 => 8,
            Self::U16 | Self::I16 => 16,
            Self::U32 | Self::I32 | Self::F32 => 32,
            Self::F64 => 64,
        }
    }

    /// Inclusive value range representable by this type.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::U1 => (0.0, 1.0),
            Self::U2 => (0.0, 3.0),
            Self::U4 => (0.0, 15.0),
            Self::U8 => (0.0, u8::MAX as f64),
            Self::I8 => (i8::MIN as f64, i8::MAX as f64),
            Self::U16 => (0.0, u16::MAX as f64),
            Self::I16 => (i16::MIN as f64, i16::MAX as f64),
            Self::U32 => (0.0, u32::MAX as f64),
            Self::I32 => (i32::MIN as f64, i32::MAX as f64),
            Self::F32 => (f32::MIN as f64, f32::MAX as f64),
            Self::F64 => (f64::MIN, f64::MAX),
        }
    }

    /// Convert an `f64` to the nearest value this type can hold.
    ///
    /// Integers round half away from zero and saturate; NaN becomes 0.
    pub fn quantize(&self, value: f64) -> f64 {
        if self.is_float() {
            return match self {
                Self::F32 => value as f32 as f64,
                _ => value,
            };
        }
        if value.is_nan() {
            return 0.0;
        }
        let (lo, hi) = self.range();
        value.round().clamp(lo, hi)
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| {
                t.name().eq_ignore_ascii_case(wanted)
                    || t.compact_name().is_some_and(|c| c.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| Error::binding("pixeltype", format!("unknown pixel type `{s}`")))
    }
}

/// Trait for Rust numerics that back a [`PixelType`].
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Widest pixel type stored with this element type
    const PIXEL_TYPE: PixelType;

    /// Convert from `f64` with rounding and saturation
    fn from_f64_saturating(value: f64) -> Self;

    /// Widen to f64
    fn as_f64(self) -> f64 {
        <f64 as NumCast>::from(self).unwrap_or(f64::NAN)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty, $pt:expr) => {
        impl RasterElement for $t {
            const PIXEL_TYPE: PixelType = $pt;

            fn from_f64_saturating(value: f64) -> Self {
                if value.is_nan() {
                    return 0;
                }
                value.round().clamp(<$t>::MIN as f64, <$t>::MAX as f64) as $t
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty, $pt:expr) => {
        impl RasterElement for $t {
            const PIXEL_TYPE: PixelType = $pt;

            fn from_f64_saturating(value: f64) -> Self {
                value as $t
            }
        }
    };
}

impl_raster_element_int!(u8, PixelType::U8);
impl_raster_element_int!(i8, PixelType::I8);
impl_raster_element_int!(u16, PixelType::U16);
impl_raster_element_int!(i16, PixelType::I16);
impl_raster_element_int!(u32, PixelType::U32);
impl_raster_element_int!(i32, PixelType::I32);
impl_raster_element_float!(f32, PixelType::F32);
impl_raster_element_float!(f64, PixelType::F64);
