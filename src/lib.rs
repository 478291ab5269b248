//! Build a dense voxel grid from a sparse list of coordinates.
//!
//! Each input line names one voxel, either by index `(i, j, k)` or by
//! millimetre coordinates, with an optional value. The grid is sized either
//! from a template NIfTI dataset or from explicit dimensions, pre-filled with
//! a fill value, written voxel by voxel (last write wins) and saved as a
//! single-frame NIfTI-1 volume.
//!
//! ```no_run
//! use undump::{run, DatumType, UndumpConfig};
//!
//! let config = UndumpConfig::with_dimensions([64, 64, 32])
//!     .datum(DatumType::Byte)
//!     .prefix("seeds.nii.gz");
//! let stats = run(&config, &["seeds.txt"])?;
//! println!("{} voxel(s) set", stats.records_applied);
//! # Ok::<(), undump::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod geometry;
pub mod grid;
pub mod nifti;
pub mod orientation;
pub mod parser;
pub mod resolve;
pub mod template;
pub mod undump;

pub use error::{Axis, Error, Result};
pub use geometry::{BoundingBox, GridGeometry};
pub use grid::{DatumType, GridBuffer};
pub use orientation::{AxisFamily, AxisOrientation, OrientationCode};
pub use parser::{parse_line, VoxelRecord};
pub use resolve::{CoordinateMode, CoordinateResolver};
pub use template::{open_template, DatasetKind, Template};
pub use undump::{run, Undump, UndumpConfig, UndumpStats};
