//! Coordinate resolution: raw record coordinates to grid indices.

use crate::error::{Axis, Error, Result};
use crate::geometry::{BoundingBox, GridGeometry};
use crate::orientation::OrientationCode;
use crate::parser::VoxelRecord;

/// Interpretation of a record's three coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateMode {
    /// Coordinates are voxel indices `(i, j, k)`.
    #[default]
    Index,
    /// Coordinates are millimetres in the caller's axis order.
    Physical,
}

/// Maps records onto a fixed grid.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateResolver {
    geometry: GridGeometry,
    input_orientation: OrientationCode,
    bbox: BoundingBox,
}

impl CoordinateResolver {
    /// Resolver for `geometry`, reading physical coordinates in the axis order
    /// given by `input_orientation`.
    pub fn new(geometry: GridGeometry, input_orientation: OrientationCode) -> Self {
        Self {
            bbox: geometry.bounding_box(),
            geometry,
            input_orientation,
        }
    }

    /// Geometry the resolver maps into.
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Axis order assumed for physical coordinates.
    pub fn input_orientation(&self) -> OrientationCode {
        self.input_orientation
    }

    /// Grid index for `record`, or [`Error::CoordinateOutOfBounds`].
    pub fn resolve(&self, record: &VoxelRecord<'_>) -> Result<[usize; 3]> {
        match record.mode {
            CoordinateMode::Index => self.resolve_index(record.coords),
            CoordinateMode::Physical => self.resolve_physical(record.coords),
        }
    }

    /// Round each coordinate half away from zero and check it against the grid.
    pub fn resolve_index(&self, coords: [f64; 3]) -> Result<[usize; 3]> {
        let dims = self.geometry.dims();
        let mut index = [0; 3];
        for n in 0..3 {
            let rounded = coords[n].round();
            if !(rounded >= 0.0 && rounded < dims[n] as f64) {
                return Err(Error::CoordinateOutOfBounds {
                    axis: Axis::index(n),
                    value: rounded,
                });
            }
            index[n] = rounded as usize;
        }
        Ok(index)
    }

    /// Convert caller-order millimetres to the nearest voxel.
    ///
    /// Each dataset axis is checked against its own bounds, including z.
    pub fn resolve_physical(&self, coords: [f64; 3]) -> Result<[usize; 3]> {
        let canonical = self.input_orientation.to_canonical(coords);
        let mm = self.geometry.canonical_to_mm(canonical);
        if let Some(n) = self.bbox.first_violation(mm) {
            return Err(Error::CoordinateOutOfBounds {
                axis: Axis::spatial(n),
                value: mm[n],
            });
        }
        Ok(self.geometry.mm_to_index(mm))
    }
}
