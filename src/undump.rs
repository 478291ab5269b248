//! Run driver: configuration, input processing and output.
//!
//! A run validates its configuration up front (every fatal error surfaces
//! before input is touched), then streams each input source line by line
//! through the parser, the coordinate resolver and the grid. Per-record and
//! per-source problems are logged as warnings and skipped.

use crate::error::{Error, Result};
use crate::geometry::GridGeometry;
use crate::grid::{DatumType, GridBuffer};
use crate::nifti;
use crate::orientation::OrientationCode;
use crate::parser::{self, Lines, VoxelRecord};
use crate::resolve::{CoordinateMode, CoordinateResolver};
use crate::template::{self, DatasetKind};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Name that selects standard input as a source.
pub const STDIN_SOURCE: &str = "-";

/// Configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct UndumpConfig {
    /// Template dataset supplying the grid geometry.
    pub template: Option<PathBuf>,
    /// Explicit grid dimensions (each at least 2).
    pub dimensions: Option<[usize; 3]>,
    /// Output element type.
    pub datum: DatumType,
    /// Value for records without a fourth field.
    pub default_value: f64,
    /// Value for voxels no record touches.
    pub fill_value: f64,
    /// Interpretation of record coordinates.
    pub mode: CoordinateMode,
    /// Axis order code. With a template it only affects how physical
    /// coordinates are read; without one it also orients the grid.
    pub orientation: Option<String>,
    /// Output dataset name.
    pub prefix: PathBuf,
}

impl Default for UndumpConfig {
    fn default() -> Self {
        Self {
            template: None,
            dimensions: None,
            datum: DatumType::Short,
            default_value: 1.0,
            fill_value: 0.0,
            mode: CoordinateMode::Index,
            orientation: None,
            prefix: PathBuf::from("undump"),
        }
    }
}

impl UndumpConfig {
    /// Config for a grid copied from `template`.
    pub fn with_template<P: Into<PathBuf>>(template: P) -> Self {
        Self {
            template: Some(template.into()),
            ..Default::default()
        }
    }

    /// Config for a synthesized grid of the given size.
    pub fn with_dimensions(dimensions: [usize; 3]) -> Self {
        Self {
            dimensions: Some(dimensions),
            ..Default::default()
        }
    }

    /// Set the template dataset.
    pub fn template<P: Into<PathBuf>>(mut self, template: P) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Set explicit dimensions.
    pub fn dimensions(mut self, dimensions: [usize; 3]) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Set the output element type.
    pub fn datum(mut self, datum: DatumType) -> Self {
        self.datum = datum;
        self
    }

    /// Set the value used when a record has no fourth field.
    pub fn default_value(mut self, value: f64) -> Self {
        self.default_value = value;
        self
    }

    /// Set the value for untouched voxels.
    pub fn fill_value(mut self, value: f64) -> Self {
        self.fill_value = value;
        self
    }

    /// Set the coordinate mode.
    pub fn mode(mut self, mode: CoordinateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the axis order code.
    pub fn orientation<S: Into<String>>(mut self, code: S) -> Self {
        self.orientation = Some(code.into());
        self
    }

    /// Set the output dataset name.
    pub fn prefix<P: Into<PathBuf>>(mut self, prefix: P) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// Counters and diagnostics collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndumpStats {
    /// Sources opened and read.
    pub sources_read: usize,
    /// Sources that could not be opened.
    pub sources_skipped: usize,
    /// Lines read across all sources, including skipped ones.
    pub lines_read: usize,
    /// Records written into the grid.
    pub records_applied: usize,
    /// Records rejected as malformed or out of bounds.
    pub records_rejected: usize,
    /// Every warning emitted, in order.
    pub warnings: Vec<String>,
}

/// One run in progress.
#[derive(Debug)]
pub struct Undump {
    resolver: CoordinateResolver,
    grid: GridBuffer,
    kind: DatasetKind,
    mode: CoordinateMode,
    default_value: f64,
    stats: UndumpStats,
}

impl Undump {
    /// Validate `config`, establish the grid geometry and allocate the grid.
    pub fn new(config: &UndumpConfig) -> Result<Self> {
        let code = config
            .orientation
            .as_deref()
            .map(str::parse::<OrientationCode>)
            .transpose()?;

        let (geometry, kind) = match (&config.template, config.dimensions) {
            (Some(_), Some(_)) => return Err(Error::ConflictingGeometrySource),
            (None, None) => return Err(Error::MissingGeometrySource),
            (Some(path), None) => {
                let template = template::open_template(path)?;
                (template.geometry, template.kind)
            }
            (None, Some(dims)) => {
                if config.mode == CoordinateMode::Physical {
                    return Err(Error::PhysicalModeRequiresTemplate);
                }
                let geometry = GridGeometry::from_dimensions(dims, code.unwrap_or_default())?;
                (geometry, DatasetKind::Functional)
            }
        };
        // the output header must be writable before any input is read
        nifti::NiftiHeader::for_grid(&geometry, config.datum, kind)?;

        let input_orientation = code.unwrap_or_else(|| geometry.orientation());
        debug!(
            "grid {:?} spacing {:?} origin {:?} orientation {}; reading {:?} coordinates as {}",
            geometry.dims(),
            geometry.spacing(),
            geometry.origin(),
            geometry.orientation(),
            config.mode,
            input_orientation
        );

        let mut undump = Self {
            resolver: CoordinateResolver::new(geometry, input_orientation),
            grid: GridBuffer::filled(&geometry, config.datum, config.fill_value),
            kind,
            mode: config.mode,
            default_value: config.default_value,
            stats: UndumpStats::default(),
        };

        let datum = config.datum;
        if datum.represent(config.default_value) == datum.represent(config.fill_value) {
            undump.warn(format!(
                "default value and fill value are the same ({} as {})",
                datum.represent(config.fill_value),
                datum
            ));
        }
        Ok(undump)
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.stats.warnings.push(message);
    }

    /// Resolve one record and store its value.
    ///
    /// Returns `false` (after logging) if the record was rejected.
    pub fn apply_record(&mut self, record: &VoxelRecord<'_>) -> bool {
        match self.resolver.resolve(record) {
            Ok(index) => {
                let applied = self.grid.apply(index, record.value_or(self.default_value));
                if applied {
                    self.stats.records_applied += 1;
                }
                applied
            }
            Err(e) => {
                self.stats.records_rejected += 1;
                self.warn(format!("file {} line {}: {}", record.source, record.line, e));
                false
            }
        }
    }

    /// Read every line of `reader`, named `name` in diagnostics.
    pub fn process_reader<R: BufRead>(&mut self, name: &str, reader: R) {
        self.stats.sources_read += 1;
        let mut last_line = 0;
        for item in Lines::new(reader) {
            let (line, text) = match item {
                Ok(item) => item,
                Err(e) => {
                    self.warn(format!(
                        "file {} line {}: read failed: {} -- skipping rest of file",
                        name,
                        last_line + 1,
                        e
                    ));
                    break;
                }
            };
            last_line = line;
            self.stats.lines_read += 1;

            match parser::parse_line(name, line, &text, self.mode) {
                Ok(Some(record)) => {
                    self.apply_record(&record);
                }
                Ok(None) => {}
                Err(e) => {
                    self.stats.records_rejected += 1;
                    self.warn(e.to_string());
                }
            }
        }
        debug!("{}: {} line(s)", name, last_line);
    }

    /// Open and read one source; `-` reads standard input.
    ///
    /// A source that cannot be opened is logged and skipped.
    pub fn process_source(&mut self, name: &str) {
        if name == STDIN_SOURCE {
            let stdin = std::io::stdin();
            self.process_reader(name, stdin.lock());
            return;
        }

        match File::open(name) {
            Ok(file) => self.process_reader(name, BufReader::new(file)),
            Err(e) => {
                let err = Error::UnreadableSource {
                    path: name.to_string(),
                    reason: e.to_string(),
                };
                self.stats.sources_skipped += 1;
                self.warn(format!("{} -- skipping it", err));
            }
        }
    }

    /// Geometry of the output grid.
    pub fn geometry(&self) -> &GridGeometry {
        self.resolver.geometry()
    }

    /// The grid as filled so far.
    pub fn grid(&self) -> &GridBuffer {
        &self.grid
    }

    /// Kind label the output will carry.
    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Statistics so far.
    pub fn stats(&self) -> &UndumpStats {
        &self.stats
    }

    /// Write the grid to `path` and return the run statistics.
    pub fn write(self, path: &Path) -> Result<UndumpStats> {
        info!("writing results to dataset {}", path.display());
        nifti::save_grid(self.resolver.geometry(), &self.grid, self.kind, path)?;
        Ok(self.stats)
    }
}

/// Run end to end: validate, read `inputs` in order, write the dataset.
pub fn run<S: AsRef<str>>(config: &UndumpConfig, inputs: &[S]) -> Result<UndumpStats> {
    if inputs.is_empty() {
        return Err(Error::NoInputSources);
    }

    let mut undump = Undump::new(config)?;
    let path = nifti::output_path(&config.prefix);
    if path.exists() {
        return Err(Error::OutputExists(path));
    }

    for input in inputs {
        undump.process_source(input.as_ref());
    }

    let stats = undump.write(&path)?;
    debug!(
        "{} record(s) applied, {} rejected, {} source(s) skipped",
        stats.records_applied, stats.records_rejected, stats.sources_skipped
    );
    Ok(stats)
}
