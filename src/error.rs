//! Error types for undump.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a grid from sparse voxel records.
///
/// Errors fall into two tiers. Fatal errors stop a run before any input is
/// consumed; recoverable errors (see [`Error::is_recoverable`]) reject one
/// record or one input source and the run carries on.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Orientation code is not three letters covering R/L, A/P and I/S once each.
    #[error("invalid orientation code '{0}' (expected one letter from each of RL, AP, IS)")]
    InvalidOrientationCode(String),

    /// Neither a template nor explicit dimensions were configured.
    #[error("must use exactly one of a template dataset or explicit dimensions")]
    MissingGeometrySource,

    /// Both a template and explicit dimensions were configured.
    #[error("template dataset conflicts with explicit dimensions")]
    ConflictingGeometrySource,

    /// Grid dimensions or header geometry are unusable.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Physical coordinates were requested without a template to anchor them.
    #[error("physical (xyz) coordinates require a template dataset")]
    PhysicalModeRequiresTemplate,

    /// Datum type is not one of byte, short or float.
    #[error("invalid datum type '{0}' (expected byte, short or float)")]
    InvalidDatumType(String),

    /// A resolved coordinate falls outside the grid.
    #[error("{axis} {}={value} is invalid", value_kind(.axis))]
    CoordinateOutOfBounds {
        /// Axis that failed the bounds check.
        axis: Axis,
        /// Offending value (rounded index or millimetre coordinate).
        value: f64,
    },

    /// A line held fewer than three numeric fields.
    #[error("file {source_name} line {line}: incomplete ({fields} numeric field(s))")]
    MalformedRecord {
        /// Name of the input source.
        source_name: String,
        /// 1-based line number.
        line: usize,
        /// Number of numeric fields that could be scanned.
        fields: usize,
    },

    /// An input source could not be opened.
    #[error("can't open input file {path}: {reason}")]
    UnreadableSource {
        /// Source name as given on the command line.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// The template dataset does not exist.
    #[error("template dataset not found: {0}")]
    TemplateNotFound(PathBuf),

    /// The output dataset already exists and will not be overwritten.
    #[error("output dataset {0} already exists -- can't overwrite")]
    OutputExists(PathBuf),

    /// No input sources were supplied.
    #[error("no input files given")]
    NoInputSources,

    /// Invalid NIfTI magic bytes.
    #[error("invalid NIfTI magic bytes {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported NIfTI datatype code.
    #[error("unsupported data type code {0}")]
    UnsupportedDataType(i16),
}

impl Error {
    /// True for per-record and per-source errors that skip input rather than
    /// aborting the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CoordinateOutOfBounds { .. }
                | Self::MalformedRecord { .. }
                | Self::UnreadableSource { .. }
        )
    }
}

/// Axis named in an out-of-bounds diagnostic.
///
/// Index-mode failures name `i`/`j`/`k`, physical-mode failures name the
/// dataset's `x`/`y`/`z` millimetre axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// First index axis.
    I,
    /// Second index axis.
    J,
    /// Third index axis.
    K,
    /// First millimetre axis.
    X,
    /// Second millimetre axis.
    Y,
    /// Third millimetre axis.
    Z,
}

impl Axis {
    /// Index axis for position `n` (0..3).
    pub const fn index(n: usize) -> Self {
        match n {
            0 => Self::I,
            1 => Self::J,
            _ => Self::K,
        }
    }

    /// Millimetre axis for position `n` (0..3).
    pub const fn spatial(n: usize) -> Self {
        match n {
            0 => Self::X,
            1 => Self::Y,
            _ => Self::Z,
        }
    }

    /// True for `i`/`j`/`k`.
    pub const fn is_index(self) -> bool {
        matches!(self, Self::I | Self::J | Self::K)
    }
}

fn value_kind(axis: &Axis) -> &'static str {
    if axis.is_index() {
        "index"
    } else {
        "coord"
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::I => "i",
            Self::J => "j",
            Self::K => "k",
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        };
        f.write_str(name)
    }
}
