//! Typed pixel buffers exchanged per tile

use crate::error::{Error, Result};
use crate::raster::{PixelType, RasterElement};
use ndarray::{Array3, ArrayView3, Axis};

/// Storage behind a [`PixelArray`], one variant per concrete numeric type
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Array3<u8>),
    I8(Array3<i8>),
    U16(Array3<u16>),
    I16(Array3<i16>),
    U32(Array3<u32>),
    I32(Array3<i32>),
    F32(Array3<f32>),
    F64(Array3<f64>),
}

macro_rules! dispatch {
    ($data:expr, $arr:ident => $body:expr) => {
        match $data {
            PixelData::U8($arr) => $body,
            PixelData::I8($arr) => $body,
            PixelData::U16($arr) => $body,
            PixelData::I16($arr) => $body,
            PixelData::U32($arr) => $body,
            PixelData::I32($arr) => $body,
            PixelData::F32($arr) => $body,
            PixelData::F64($arr) => $body,
        }
    };
}

/// A `[bands, rows, cols]` pixel buffer tagged with its pixel type.
///
/// Single-band blocks carry `bands = 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelArray {
    pixel_type: PixelType,
    data: PixelData,
}

impl PixelArray {
    /// Zero-filled buffer of the given type and shape
    pub fn zeros(pixel_type: PixelType, shape: (usize, usize, usize)) -> Self {
        Self::filled(pixel_type, shape, 0.0)
    }

    /// Buffer of the given type filled with `value` (quantized to the type)
    pub fn filled(pixel_type: PixelType, shape: (usize, usize, usize), value: f64) -> Self {
        Self::from_f64(pixel_type, &Array3::from_elem(shape, value))
    }

    /// Convert an `f64` array to `pixel_type`, rounding and saturating integers
    pub fn from_f64(pixel_type: PixelType, values: &Array3<f64>) -> Self {
        let q = |v: &f64| pixel_type.quantize(*v);
        let data = match pixel_type {
            PixelType::U1 | PixelType::U2 | PixelType::U4 | PixelType::U8 => {
                PixelData::U8(values.map(|v| u8::from_f64_saturating(q(v))))
            }
            PixelType::I8 => PixelData::I8(values.map(|v| i8::from_f64_saturating(q(v)))),
            PixelType::U16 => PixelData::U16(values.map(|v| u16::from_f64_saturating(q(v)))),
            PixelType::I16 => PixelData::I16(values.map(|v| i16::from_f64_saturating(q(v)))),
            PixelType::U32 => PixelData::U32(values.map(|v| u32::from_f64_saturating(q(v)))),
            PixelType::I32 => PixelData::I32(values.map(|v| i32::from_f64_saturating(q(v)))),
            PixelType::F32 => PixelData::F32(values.map(|&v| v as f32)),
            PixelType::F64 => PixelData::F64(values.clone()),
        };
        Self { pixel_type, data }
    }

    /// Wrap an existing typed array
    pub fn from_array<T: RasterElement + IntoPixelData>(values: Array3<T>) -> Self {
        Self {
            pixel_type: T::PIXEL_TYPE,
            data: values.into_pixel_data(),
        }
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn data(&self) -> &PixelData {
        &self.data
    }

    /// `(bands, rows, cols)`
    pub fn shape(&self) -> (usize, usize, usize) {
        dispatch!(&self.data, a => a.dim())
    }

    pub fn bands(&self) -> usize {
        self.shape().0
    }

    /// Widen to `f64`
    pub fn to_f64(&self) -> Array3<f64> {
        dispatch!(&self.data, a => a.map(|&v| v.as_f64()))
    }

    /// Borrow as a typed view when the storage type is `T`
    pub fn view<T: RasterElement + IntoPixelData>(&self) -> Option<ArrayView3<'_, T>> {
        T::view_of(&self.data)
    }

    /// Keep only the listed bands, in the listed order
    pub fn select_bands(&self, bands: &[usize]) -> Result<PixelArray> {
        let count = self.bands();
        if let Some(&bad) = bands.iter().find(|&&b| b >= count) {
            return Err(Error::Compatibility(format!(
                "band index {bad} out of range for {count}-band input"
            )));
        }
        let data = dispatch!(&self.data, a => a.select(Axis(0), bands).into_pixel_data());
        Ok(Self {
            pixel_type: self.pixel_type,
            data,
        })
    }

    /// Stack several arrays along the band axis (converted to `pixel_type`)
    pub fn stack(pixel_type: PixelType, parts: &[&PixelArray]) -> Result<PixelArray> {
        let widened: Vec<Array3<f64>> = parts.iter().map(|p| p.to_f64()).collect();
        let views: Vec<ArrayView3<'_, f64>> = widened.iter().map(|a| a.view()).collect();
        let stacked = ndarray::concatenate(Axis(0), &views).map_err(|e| {
            Error::Compatibility(format!("cannot composite inputs of different shapes: {e}"))
        })?;
        Ok(Self::from_f64(pixel_type, &stacked))
    }
}

/// Conversion between concrete arrays and [`PixelData`]
pub trait IntoPixelData: Sized {
    fn into_pixel_data(self_array: Array3<Self>) -> PixelData;
    fn view_of(data: &PixelData) -> Option<ArrayView3<'_, Self>>;
}

/// Method-call sugar for [`IntoPixelData::into_pixel_data`]
pub trait IntoPixelDataExt {
    fn into_pixel_data(self) -> PixelData;
}

impl<T: IntoPixelData> IntoPixelDataExt for Array3<T> {
    fn into_pixel_data(self) -> PixelData {
        T::into_pixel_data(self)
    }
}

macro_rules! impl_into_pixel_data {
    ($t:ty, $variant:ident) => {
        impl IntoPixelData for $t {
            fn into_pixel_data(self_array: Array3<Self>) -> PixelData {
                PixelData::$variant(self_array)
            }

            fn view_of(data: &PixelData) -> Option<ArrayView3<'_, Self>> {
                match data {
                    PixelData::$variant(a) => Some(a.view()),
                    _ => None,
                }
            }
        }
    };
}

impl_into_pixel_data!(u8, U8);
impl_into_pixel_data!(i8, I8);
impl_into_pixel_data!(u16, U16);
impl_into_pixel_data!(i16, I16);
impl_into_pixel_data!(u32, U32);
impl_into_pixel_data!(i32, I32);
impl_into_pixel_data!(f32, F32);
impl_into_pixel_data!(f64, F64);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_f64_rounds_and_saturates() {
        let v = array![[[133.33, 255.7], [-3.0, f64::NAN]]];
        let px = PixelArray::from_f64(PixelType::U8, &v);
        assert_eq!(px.pixel_type(), PixelType::U8);
        assert_eq!(px.view::<u8>().unwrap(), array![[[133u8, 255], [0, 0]]]);
    }

    #[test]
    fn test_packed_types_clamp() {
        let v = array![[[0.0, 1.0, 7.0]]];
        let px = PixelArray::from_f64(PixelType::U2, &v);
        assert_eq!(px.pixel_type(), PixelType::U2);
        assert_eq!(px.to_f64(), array![[[0.0, 1.0, 3.0]]]);
    }

    #[test]
    fn test_select_bands_reorders() {
        let v = array![[[1.0]], [[2.0]], [[3.0]]];
        let px = PixelArray::from_f64(PixelType::U16, &v);
        let sel = px.select_bands(&[2, 0]).unwrap();
        assert_eq!(sel.shape(), (2, 1, 1));
        assert_eq!(sel.to_f64(), array![[[3.0]], [[1.0]]]);
        assert!(px.select_bands(&[3]).is_err());
    }

    #[test]
    fn test_stack() {
        let a = PixelArray::from_f64(PixelType::U8, &array![[[1.0, 2.0]]]);
        let b = PixelArray::from_f64(PixelType::F32, &array![[[3.5, 4.5]]]);
        let s = PixelArray::stack(PixelType::F32, &[&a, &b]).unwrap();
        assert_eq!(s.shape(), (2, 1, 2));
        assert_eq!(s.to_f64(), array![[[1.0, 2.0]], [[3.5, 4.5]]]);
    }

    #[test]
    fn test_typed_view() {
        let px = PixelArray::from_array(Array3::<i16>::zeros((1, 2, 2)));
        assert_eq!(px.pixel_type(), PixelType::I16);
        assert!(px.view::<i16>().is_some());
        assert!(px.view::<u8>().is_none());
    }
}
