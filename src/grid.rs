//! Dense output grid with a selectable element type.
//!
//! The grid is pre-filled with a fill value and then overwritten voxel by
//! voxel. Storage is Fortran-ordered so the memory layout matches the NIfTI
//! on-disk order (`i` fastest, then `j`, then `k`).

use crate::error::{Error, Result};
use crate::geometry::GridGeometry;
use crate::nifti::DataType;
use ndarray::{Array3, ShapeBuilder};

/// Element type of the output grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatumType {
    /// Unsigned 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    #[default]
    Short,
    /// 32-bit float.
    Float,
}

impl DatumType {
    /// Matching NIfTI datatype code.
    pub const fn nifti_type(self) -> DataType {
        match self {
            Self::Byte => DataType::UInt8,
            Self::Short => DataType::Int16,
            Self::Float => DataType::Float32,
        }
    }

    /// Datum name as accepted on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Float => "float",
        }
    }

    /// Value `v` after conversion to this element type, widened back to f64.
    ///
    /// Used to compare default and fill values under the active representation.
    pub fn represent(self, v: f64) -> f64 {
        match self {
            Self::Byte => f64::from(u8::from_f64(v)),
            Self::Short => f64::from(i16::from_f64(v)),
            Self::Float => f64::from(f32::from_f64(v)),
        }
    }
}

impl std::fmt::Display for DatumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DatumType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "byte" => Ok(Self::Byte),
            "short" => Ok(Self::Short),
            "float" => Ok(Self::Float),
            _ => Err(Error::InvalidDatumType(s.to_string())),
        }
    }
}

/// Element types the grid can hold.
///
/// Integer conversion rounds to nearest (half away from zero) and saturates at
/// the type's range; NaN becomes zero.
pub trait Voxel: Copy + Default + PartialEq + std::fmt::Debug {
    /// Convert a configured or parsed value to the element type.
    fn from_f64(v: f64) -> Self;
    /// Widen back to f64.
    fn to_f64(self) -> f64;
    /// Append little-endian bytes.
    fn write_le(self, out: &mut Vec<u8>);
}

impl Voxel for u8 {
    fn from_f64(v: f64) -> Self {
        v.round() as u8
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl Voxel for i16 {
    fn from_f64(v: f64) -> Self {
        v.round() as i16
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Voxel for f32 {
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

/// The dense output array.
///
/// Sized `nx * ny * nz` at construction and never resized. Writes to the same
/// voxel replace each other, so the last write wins.
#[derive(Debug, Clone, PartialEq)]
pub enum GridBuffer {
    /// 8-bit unsigned storage.
    Byte(Array3<u8>),
    /// 16-bit signed storage.
    Short(Array3<i16>),
    /// 32-bit float storage.
    Float(Array3<f32>),
}

fn filled<T: Voxel>(dims: [usize; 3], fill: f64) -> Array3<T> {
    Array3::from_elem(dims.f(), T::from_f64(fill))
}

impl GridBuffer {
    /// Allocate a grid shaped like `geometry` with every voxel set to `fill`.
    pub fn filled(geometry: &GridGeometry, datum: DatumType, fill: f64) -> Self {
        let dims = geometry.dims();
        match datum {
            DatumType::Byte => Self::Byte(filled(dims, fill)),
            DatumType::Short => Self::Short(filled(dims, fill)),
            DatumType::Float => Self::Float(filled(dims, fill)),
        }
    }

    /// Element type held by this grid.
    pub const fn datum(&self) -> DatumType {
        match self {
            Self::Byte(_) => DatumType::Byte,
            Self::Short(_) => DatumType::Short,
            Self::Float(_) => DatumType::Float,
        }
    }

    /// Voxel counts `[nx, ny, nz]`.
    pub fn dims(&self) -> [usize; 3] {
        let shape = match self {
            Self::Byte(a) => a.shape(),
            Self::Short(a) => a.shape(),
            Self::Float(a) => a.shape(),
        };
        [shape[0], shape[1], shape[2]]
    }

    /// Total number of voxels.
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(a) => a.len(),
            Self::Short(a) => a.len(),
            Self::Float(a) => a.len(),
        }
    }

    /// True for a zero-voxel grid (never produced by [`Self::filled`]).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store `value` at `index`, converted to the element type.
    ///
    /// Returns `false` without writing if the index lies outside the grid.
    pub fn apply(&mut self, index: [usize; 3], value: f64) -> bool {
        fn put<T: Voxel>(array: &mut Array3<T>, index: [usize; 3], value: f64) -> bool {
            match array.get_mut(index) {
                Some(slot) => {
                    *slot = T::from_f64(value);
                    true
                }
                None => false,
            }
        }

        match self {
            Self::Byte(a) => put(a, index, value),
            Self::Short(a) => put(a, index, value),
            Self::Float(a) => put(a, index, value),
        }
    }

    /// Value at `index`, widened to f64.
    pub fn get(&self, index: [usize; 3]) -> Option<f64> {
        match self {
            Self::Byte(a) => a.get(index).map(|v| v.to_f64()),
            Self::Short(a) => a.get(index).map(|v| v.to_f64()),
            Self::Float(a) => a.get(index).map(|v| v.to_f64()),
        }
    }

    /// All voxels in flattened order (`i + j*nx + k*nx*ny`), widened to f64.
    pub fn values(&self) -> Vec<f64> {
        fn collect<T: Voxel>(array: &Array3<T>) -> Vec<f64> {
            array.t().iter().map(|v| v.to_f64()).collect()
        }

        match self {
            Self::Byte(a) => collect(a),
            Self::Short(a) => collect(a),
            Self::Float(a) => collect(a),
        }
    }

    /// Little-endian bytes in flattened order, ready for a NIfTI data block.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        fn encode<T: Voxel>(array: &Array3<T>, width: usize) -> Vec<u8> {
            let mut out = Vec::with_capacity(array.len() * width);
            for &v in array.t().iter() {
                v.write_le(&mut out);
            }
            out
        }

        match self {
            Self::Byte(a) => encode(a, 1),
            Self::Short(a) => encode(a, 2),
            Self::Float(a) => encode(a, 4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::OrientationCode;

    fn geometry(dims: [usize; 3]) -> GridGeometry {
        GridGeometry::from_dimensions(dims, OrientationCode::default()).unwrap()
    }

    #[test]
    fn test_datum_parse() {
        assert_eq!("byte".parse::<DatumType>().unwrap(), DatumType::Byte);
        assert_eq!("short".parse::<DatumType>().unwrap(), DatumType::Short);
        assert_eq!("float".parse::<DatumType>().unwrap(), DatumType::Float);
        let err = "double".parse::<DatumType>().unwrap_err();
        assert!(matches!(err, Error::InvalidDatumType(_)));
        assert_eq!(DatumType::default(), DatumType::Short);
    }

    #[test]
    fn test_fill_without_records() {
        for datum in [DatumType::Byte, DatumType::Short, DatumType::Float] {
            let grid = GridBuffer::filled(&geometry([3, 4, 5]), datum, 7.0);
            assert_eq!(grid.datum(), datum);
            assert_eq!(grid.len(), 60);
            assert_eq!(grid.dims(), [3, 4, 5]);
            assert!(grid.values().iter().all(|&v| v == 7.0));
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut grid = GridBuffer::filled(&geometry([4, 4, 4]), DatumType::Short, 0.0);
        assert!(grid.apply([1, 2, 3], 5.0));
        assert!(grid.apply([1, 2, 3], 9.0));
        assert_eq!(grid.get([1, 2, 3]), Some(9.0));
        assert_eq!(grid.values().iter().filter(|&&v| v != 0.0).count(), 1);
    }

    #[test]
    fn test_apply_out_of_grid() {
        let mut grid = GridBuffer::filled(&geometry([2, 2, 2]), DatumType::Byte, 0.0);
        assert!(!grid.apply([2, 0, 0], 1.0));
        assert!(grid.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(i16::from_f64(2.5), 3);
        assert_eq!(i16::from_f64(-2.5), -3);
        assert_eq!(i16::from_f64(1e9), i16::MAX);
        assert_eq!(u8::from_f64(-4.0), 0);
        assert_eq!(u8::from_f64(300.0), 255);
        assert_eq!(u8::from_f64(f64::NAN), 0);
        assert_eq!(f32::from_f64(0.25), 0.25);
    }

    #[test]
    fn test_represent() {
        assert_eq!(DatumType::Short.represent(1.4), 1.0);
        assert_eq!(DatumType::Byte.represent(256.0), 255.0);
        assert_eq!(DatumType::Float.represent(1.4), f64::from(1.4f32));
    }

    #[test]
    fn test_flattened_order() {
        let geom = geometry([2, 3, 2]);
        let mut grid = GridBuffer::filled(&geom, DatumType::Float, 0.0);
        for k in 0..2 {
            for j in 0..3 {
                for i in 0..2 {
                    let flat = geom.flat_index([i, j, k]);
                    grid.apply([i, j, k], flat as f64);
                }
            }
        }
        let expected: Vec<f64> = (0..12).map(|v| v as f64).collect();
        assert_eq!(grid.values(), expected);

        let bytes = grid.to_le_bytes();
        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[4..8], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[44..48], &11.0f32.to_le_bytes());
    }

    #[test]
    fn test_short_bytes() {
        let mut grid = GridBuffer::filled(&geometry([2, 2, 2]), DatumType::Short, -1.0);
        grid.apply([1, 0, 0], 258.0);
        let bytes = grid.to_le_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..2], &(-1i16).to_le_bytes());
        assert_eq!(&bytes[2..4], &258i16.to_le_bytes());
    }
}
