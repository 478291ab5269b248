//! Template datasets: geometry copied from an existing NIfTI volume.

use crate::error::{Error, Result};
use crate::geometry::{GridGeometry, RAS_FLIP};
use crate::nifti::{self, NiftiHeader};
use crate::orientation::{AxisFamily, OrientationCode};
use log::warn;
use std::path::Path;

/// Dataset kind used for output labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatasetKind {
    /// Anatomical volume.
    Anatomical,
    /// Functional (fim) volume, the default for new datasets.
    #[default]
    Functional,
}

impl DatasetKind {
    /// Short label written into the output description.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Anatomical => "anat",
            Self::Functional => "fim",
        }
    }
}

/// Geometry and kind taken from a template dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Template {
    /// Grid geometry of the template.
    pub geometry: GridGeometry,
    /// Template kind; an anatomical template yields an anatomical output.
    pub kind: DatasetKind,
}

/// Open a template dataset and extract its grid geometry.
pub fn open_template<P: AsRef<Path>>(path: P) -> Result<Template> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::TemplateNotFound(path.to_path_buf()));
    }
    let header = nifti::load_header(path)?;
    template_from_header(&header)
}

/// Derive template geometry from a parsed header.
pub fn template_from_header(header: &NiftiHeader) -> Result<Template> {
    let mut affine = header.affine_f64();
    let scale = header.spatial_units.to_millimeters();
    for row in affine.iter_mut().take(3) {
        for value in row.iter_mut() {
            *value *= scale;
        }
    }

    let geometry = geometry_from_affine(header.spatial_dims(), affine)?;
    let kind = if header.intent_code == 0 {
        DatasetKind::Anatomical
    } else {
        DatasetKind::Functional
    };
    Ok(Template { geometry, kind })
}

/// Convert a RAS+ voxel-to-world affine into grid geometry.
///
/// Each voxel axis is assigned to the world axis carrying its largest
/// component. Oblique axes are snapped to that world axis (logged); two voxel
/// axes landing on the same world axis is an error.
pub fn geometry_from_affine(dims: [usize; 3], affine: [[f64; 4]; 4]) -> Result<GridGeometry> {
    let mut axes = [AxisFamily::LeftRight.with_sign(true); 3];
    let mut spacing = [0.0; 3];
    let mut origin = [0.0; 3];

    for col in 0..3 {
        let column = [affine[0][col], affine[1][col], affine[2][col]];
        let row = (0..3)
            .max_by(|&a, &b| column[a].abs().total_cmp(&column[b].abs()))
            .unwrap_or(0);

        let off_axis = (0..3)
            .filter(|&r| r != row)
            .map(|r| column[r].abs())
            .fold(0.0, f64::max);
        if off_axis > 1e-3 * column[row].abs() {
            warn!(
                "template voxel axis {} is oblique {:?}; snapping to nearest world axis",
                col, column
            );
        }

        // RAS+ world to canonical LPS+
        let delta = RAS_FLIP[row] * column[row];
        let family = AxisFamily::from_canonical_index(row)
            .ok_or_else(|| Error::InvalidDimensions(format!("bad world axis {}", row)))?;
        axes[col] = family.with_sign(delta > 0.0);
        spacing[col] = delta;
        origin[col] = RAS_FLIP[row] * affine[row][3];
    }

    let orientation = OrientationCode::new(axes).map_err(|_| {
        Error::InvalidDimensions(format!(
            "template affine maps two voxel axes onto one world axis: {:?}",
            affine
        ))
    })?;
    GridGeometry::new(dims, spacing, origin, orientation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{DatumType, GridBuffer};
    use tempfile::tempdir;

    #[test]
    fn test_identity_affine_is_lpi() {
        let affine = [
            [1.0, 0.0, 0.0, -90.0],
            [0.0, 1.0, 0.0, -126.0],
            [0.0, 0.0, 1.0, -72.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let geom = geometry_from_affine([181, 217, 181], affine).unwrap();
        assert_eq!(geom.orientation().to_string(), "LPI");
        assert_eq!(geom.spacing(), [-1.0, -1.0, 1.0]);
        assert_eq!(geom.origin(), [90.0, 126.0, -72.0]);
    }

    #[test]
    fn test_permuted_affine() {
        // voxel axes run A-P, I-S, then R-L
        let affine = [
            [0.0, 0.0, -2.0, 10.0],
            [-3.0, 0.0, 0.0, 20.0],
            [0.0, 1.5, 0.0, -30.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let geom = geometry_from_affine([4, 5, 6], affine).unwrap();
        assert_eq!(geom.orientation().to_string(), "AIR");
        assert_eq!(geom.spacing(), [3.0, 1.5, 2.0]);
        assert_eq!(geom.origin(), [-20.0, -30.0, -10.0]);
    }

    #[test]
    fn test_affine_roundtrip_through_geometry() {
        for code in ["RAI", "LPS", "PIR", "SAL"] {
            let orientation: OrientationCode = code.parse().unwrap();
            // spacing sign follows the orientation, as for any read geometry
            let spacing = [0, 1, 2].map(|n| orientation.axis(n).sign() * 2.0);
            let geom = GridGeometry::new([5, 6, 7], spacing, [1.0, 2.0, 3.0], orientation).unwrap();

            let back = geometry_from_affine(geom.dims(), geom.ras_affine()).unwrap();
            assert_eq!(back, geom, "code {code}");
        }
    }

    #[test]
    fn test_degenerate_affine() {
        let affine = [
            [1.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let err = geometry_from_affine([2, 2, 2], affine).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions(_)));
    }

    #[test]
    fn test_open_template_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.nii");
        let geom = GridGeometry::new(
            [8, 9, 10],
            [-2.0, -2.0, 3.0],
            [40.0, 50.0, -60.0],
            "LPI".parse().unwrap(),
        )
        .unwrap();
        let grid = GridBuffer::filled(&geom, DatumType::Float, 0.0);
        nifti::save_grid(&geom, &grid, DatasetKind::Anatomical, &path).unwrap();

        let template = open_template(&path).unwrap();
        assert_eq!(template.geometry, geom);
        // written datasets carry intent code 0
        assert_eq!(template.kind, DatasetKind::Anatomical);
    }

    #[test]
    fn test_open_template_missing() {
        let dir = tempdir().unwrap();
        let err = open_template(dir.path().join("nope.nii")).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(_)));
    }
}
