//! `NIfTI` file format support.
//!
//! Reads template headers (`.nii` and `.nii.gz`, NIfTI-1 or NIfTI-2) and
//! writes finished grids as single-frame NIfTI-1 datasets.

pub(crate) mod header;
pub mod io;

pub use header::{DataType, NiftiHeader, NiftiVersion, SpatialUnits};
pub use io::{is_gzipped, load_header, output_path, save_grid};
