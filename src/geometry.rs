//! Output grid geometry.
//!
//! A [`GridGeometry`] fixes voxel counts, signed spacing, origin and axis
//! orientation of the output dataset. It is established once per run, either
//! copied from a template or synthesized from explicit dimensions, and never
//! changes afterwards.
//!
//! Millimetre coordinates used here are dataset-ordered: component `n` is the
//! canonical coordinate along the family of dataset axis `n`, without any
//! sign flip. The sign lives in the spacing, so
//! `mm[n] = origin[n] + index[n] * spacing[n]`.

use crate::error::{Error, Result};
use crate::orientation::OrientationCode;

/// Voxel-to-millimetre geometry of a regular 3D grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    dims: [usize; 3],
    spacing: [f64; 3],
    origin: [f64; 3],
    orientation: OrientationCode,
}

impl GridGeometry {
    /// Assemble a geometry from its parts.
    ///
    /// Dimensions must be non-zero and spacing finite and non-zero; the grid
    /// size must fit in memory addressing.
    pub fn new(
        dims: [usize; 3],
        spacing: [f64; 3],
        origin: [f64; 3],
        orientation: OrientationCode,
    ) -> Result<Self> {
        for (n, &d) in dims.iter().enumerate() {
            if d == 0 {
                return Err(Error::InvalidDimensions(format!("dimension {} is zero", n)));
            }
        }
        for (n, &s) in spacing.iter().enumerate() {
            if !s.is_finite() || s == 0.0 {
                return Err(Error::InvalidDimensions(format!(
                    "spacing {} must be finite and non-zero, got {}",
                    n, s
                )));
            }
        }
        if origin.iter().any(|o| !o.is_finite()) {
            return Err(Error::InvalidDimensions(format!(
                "origin must be finite, got {:?}",
                origin
            )));
        }
        dims.iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| Error::InvalidDimensions("dimension product overflow".into()))?;

        Ok(Self {
            dims,
            spacing,
            origin,
            orientation,
        })
    }

    /// Synthesize a geometry centred on the coordinate origin.
    ///
    /// Each dimension must be at least 2. Spacing is unit magnitude, positive
    /// for axes pointing along the canonical direction and negative otherwise;
    /// the origin sits half the axis extent behind zero in the axis direction.
    pub fn from_dimensions(dims: [usize; 3], orientation: OrientationCode) -> Result<Self> {
        if dims.iter().any(|&d| d < 2) {
            return Err(Error::InvalidDimensions(format!(
                "explicit dimensions must all be >= 2, got {}x{}x{}",
                dims[0], dims[1], dims[2]
            )));
        }

        let mut spacing = [0.0; 3];
        let mut origin = [0.0; 3];
        for n in 0..3 {
            let sign = orientation.axis(n).sign();
            spacing[n] = sign;
            origin[n] = -sign * 0.5 * dims[n] as f64;
        }
        Self::new(dims, spacing, origin, orientation)
    }

    /// Voxel counts `[nx, ny, nz]`.
    pub const fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Signed voxel spacing per axis.
    pub const fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// Millimetre coordinate of voxel `(0, 0, 0)`.
    pub const fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// Direction of each dataset axis.
    pub const fn orientation(&self) -> OrientationCode {
        self.orientation
    }

    /// Total number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.dims.iter().product()
    }

    /// Flattened offset of `(i, j, k)`: `i + j*nx + k*nx*ny`.
    pub fn flat_index(&self, [i, j, k]: [usize; 3]) -> usize {
        i + j * self.dims[0] + k * self.dims[0] * self.dims[1]
    }

    /// Reorder a canonical coordinate into this dataset's millimetre axes.
    pub fn canonical_to_mm(&self, canonical: [f64; 3]) -> [f64; 3] {
        let axes = self.orientation.axes();
        [
            canonical[axes[0].family().canonical_index()],
            canonical[axes[1].family().canonical_index()],
            canonical[axes[2].family().canonical_index()],
        ]
    }

    /// Inverse of [`Self::canonical_to_mm`].
    pub fn mm_to_canonical(&self, mm: [f64; 3]) -> [f64; 3] {
        let mut canonical = [0.0; 3];
        for (n, axis) in self.orientation.axes().iter().enumerate() {
            canonical[axis.family().canonical_index()] = mm[n];
        }
        canonical
    }

    /// Millimetre coordinate of a voxel centre.
    pub fn index_to_mm(&self, index: [usize; 3]) -> [f64; 3] {
        let mut mm = [0.0; 3];
        for n in 0..3 {
            mm[n] = axis_mm(self.origin[n], self.spacing[n], index[n] as f64);
        }
        mm
    }

    /// Nearest voxel to a millimetre coordinate, clamped into the grid.
    pub fn mm_to_index(&self, mm: [f64; 3]) -> [usize; 3] {
        let mut index = [0; 3];
        for n in 0..3 {
            index[n] = axis_index(mm[n], self.origin[n], self.spacing[n], self.dims[n]);
        }
        index
    }

    /// Millimetre extent of voxel centres, widened by just over half a voxel.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for n in 0..3 {
            let first = self.origin[n];
            let last = axis_mm(self.origin[n], self.spacing[n], (self.dims[n] - 1) as f64);
            let pad = BoundingBox::PAD * self.spacing[n].abs();
            min[n] = first.min(last) - pad;
            max[n] = first.max(last) + pad;
        }
        BoundingBox { min, max }
    }

    /// Voxel-to-world affine in RAS+ space (the NIfTI convention).
    ///
    /// Canonical space is LPS+, so the first two world rows flip sign.
    pub fn ras_affine(&self) -> [[f64; 4]; 4] {
        let mut affine = [[0.0; 4]; 4];
        affine[3][3] = 1.0;
        for (n, axis) in self.orientation.axes().iter().enumerate() {
            let row = axis.family().canonical_index();
            let flip = RAS_FLIP[row];
            affine[row][n] = flip * self.spacing[n];
            affine[row][3] = flip * self.origin[n];
        }
        affine
    }
}

/// Sign that takes a canonical (LPS+) component to RAS+ and back.
pub(crate) const RAS_FLIP: [f64; 3] = [-1.0, -1.0, 1.0];

/// Millimetre coordinate of position `index` along one axis.
pub fn axis_mm(origin: f64, spacing: f64, index: f64) -> f64 {
    origin + index * spacing
}

/// Nearest voxel index along one axis, clamped to `0..dim`.
pub fn axis_index(mm: f64, origin: f64, spacing: f64, dim: usize) -> usize {
    let fractional = ((mm - origin) / spacing).round();
    if fractional.is_nan() || fractional <= 0.0 {
        0
    } else {
        (fractional as usize).min(dim - 1)
    }
}

/// Millimetre box admitted by physical-coordinate resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Lower bound per dataset axis.
    pub min: [f64; 3],
    /// Upper bound per dataset axis.
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Padding in voxels beyond the outermost voxel centres.
    pub const PAD: f64 = 0.501;

    /// First axis whose coordinate lies outside the box, if any.
    pub fn first_violation(&self, mm: [f64; 3]) -> Option<usize> {
        (0..3).find(|&n| !(mm[n] >= self.min[n] && mm[n] <= self.max[n]))
    }

    /// True when all three coordinates lie inside the box.
    pub fn contains(&self, mm: [f64; 3]) -> bool {
        self.first_violation(mm).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> OrientationCode {
        s.parse().unwrap()
    }

    #[test]
    fn test_from_dimensions_centred() {
        let geom = GridGeometry::from_dimensions([4, 6, 8], OrientationCode::default()).unwrap();
        assert_eq!(geom.dims(), [4, 6, 8]);
        assert_eq!(geom.spacing(), [1.0, 1.0, 1.0]);
        assert_eq!(geom.origin(), [-2.0, -3.0, -4.0]);
    }

    #[test]
    fn test_from_dimensions_negative_axes() {
        let geom = GridGeometry::from_dimensions([4, 6, 8], code("LPS")).unwrap();
        assert_eq!(geom.spacing(), [-1.0, -1.0, -1.0]);
        assert_eq!(geom.origin(), [2.0, 3.0, 4.0]);

        let geom = GridGeometry::from_dimensions([4, 6, 8], code("AIL")).unwrap();
        assert_eq!(geom.spacing(), [1.0, 1.0, -1.0]);
        assert_eq!(geom.origin(), [-2.0, -3.0, 4.0]);
    }

    #[test]
    fn test_from_dimensions_extent_symmetric() {
        let geom = GridGeometry::from_dimensions([5, 5, 5], code("LAS")).unwrap();
        let first = geom.index_to_mm([0, 0, 0]);
        let last = geom.index_to_mm([4, 4, 4]);
        for n in 0..3 {
            // voxel centres run from -n/2 to n/2 - 1 in the axis direction
            let lo = first[n].min(last[n]);
            let hi = first[n].max(last[n]);
            assert_eq!(hi - lo, 4.0);
        }
    }

    #[test]
    fn test_from_dimensions_too_small() {
        for dims in [[1, 4, 4], [4, 1, 4], [4, 4, 1], [0, 4, 4]] {
            let err = GridGeometry::from_dimensions(dims, OrientationCode::default()).unwrap_err();
            assert!(matches!(err, Error::InvalidDimensions(_)));
        }
        assert!(GridGeometry::from_dimensions([2, 2, 2], OrientationCode::default()).is_ok());
    }

    #[test]
    fn test_new_rejects_zero_spacing() {
        let err = GridGeometry::new(
            [2, 2, 2],
            [1.0, 0.0, 1.0],
            [0.0; 3],
            OrientationCode::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions(_)));
    }

    #[test]
    fn test_flat_index() {
        let geom = GridGeometry::from_dimensions([4, 5, 6], OrientationCode::default()).unwrap();
        assert_eq!(geom.flat_index([0, 0, 0]), 0);
        assert_eq!(geom.flat_index([1, 0, 0]), 1);
        assert_eq!(geom.flat_index([0, 1, 0]), 4);
        assert_eq!(geom.flat_index([0, 0, 1]), 20);
        assert_eq!(geom.flat_index([3, 4, 5]), geom.num_voxels() - 1);
    }

    #[test]
    fn test_mm_index_roundtrip() {
        let geom = GridGeometry::new(
            [10, 12, 14],
            [2.0, -1.5, 3.0],
            [-10.0, 8.0, -20.0],
            code("RPI"),
        )
        .unwrap();
        for index in [[0, 0, 0], [9, 11, 13], [3, 7, 2]] {
            assert_eq!(geom.mm_to_index(geom.index_to_mm(index)), index);
        }
    }

    #[test]
    fn test_mm_to_index_nearest_and_clamped() {
        let geom = GridGeometry::new(
            [4, 4, 4],
            [2.0, 2.0, 2.0],
            [0.0, 0.0, 0.0],
            OrientationCode::default(),
        )
        .unwrap();
        assert_eq!(geom.mm_to_index([0.9, 1.1, 3.0]), [0, 1, 2]);
        assert_eq!(geom.mm_to_index([-1.0, 7.0, 100.0]), [0, 3, 3]);
    }

    #[test]
    fn test_bounding_box_half_voxel() {
        let geom = GridGeometry::new(
            [3, 3, 3],
            [2.0, -2.0, 1.0],
            [0.0, 0.0, 0.0],
            OrientationCode::default(),
        )
        .unwrap();
        let bbox = geom.bounding_box();
        assert!((bbox.min[0] - -1.002).abs() < 1e-9);
        assert!((bbox.max[0] - 5.002).abs() < 1e-9);
        assert!((bbox.min[1] - -5.002).abs() < 1e-9);
        assert!((bbox.max[1] - 1.002).abs() < 1e-9);
        assert!((bbox.min[2] - -0.501).abs() < 1e-9);
        assert!((bbox.max[2] - 2.501).abs() < 1e-9);

        // a point on the outer face of the last voxel is admitted
        assert!(bbox.contains([5.0, -5.0, 2.5]));
        assert_eq!(bbox.first_violation([5.1, 0.0, 0.0]), Some(0));
        assert_eq!(bbox.first_violation([0.0, 0.0, 2.6]), Some(2));
        assert_eq!(bbox.first_violation([0.0, f64::NAN, 0.0]), Some(1));
    }

    #[test]
    fn test_canonical_reordering() {
        let geom = GridGeometry::from_dimensions([4, 4, 4], code("ASR")).unwrap();
        // dataset x is A-P, y is S-I, z is R-L
        let mm = geom.canonical_to_mm([1.0, 2.0, 3.0]);
        assert_eq!(mm, [2.0, 3.0, 1.0]);
        assert_eq!(geom.mm_to_canonical(mm), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_ras_affine() {
        let geom = GridGeometry::from_dimensions([4, 4, 4], OrientationCode::default()).unwrap();
        let affine = geom.ras_affine();
        assert_eq!(affine[0], [-1.0, 0.0, 0.0, 2.0]);
        assert_eq!(affine[1], [0.0, -1.0, 0.0, 2.0]);
        assert_eq!(affine[2], [0.0, 0.0, 1.0, -2.0]);
        assert_eq!(affine[3], [0.0, 0.0, 0.0, 1.0]);
    }
}
