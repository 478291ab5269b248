use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use undump::{CoordinateMode, DatumType, UndumpConfig};

/// Site-wide default axis order for grids built from `--dimen`.
const ORIENT_ENV: &str = "UNDUMP_ORIENT";

/// Assemble a 3D NIfTI dataset from a list of voxel coordinates.
///
/// Each input line is `x y z [value]`; blank lines and lines starting with
/// `//` are skipped. Voxels not listed keep the fill value.
#[derive(Parser, Debug)]
#[command(name = "undump", version, long_about = None)]
struct Args {
    /// Output dataset name (`.nii` is appended unless it ends in .nii or .nii.gz)
    #[arg(long, default_value = "undump")]
    prefix: PathBuf,

    /// Template dataset supplying the grid geometry
    #[arg(long, value_name = "DATASET", conflicts_with = "dimen")]
    master: Option<PathBuf>,

    /// Explicit grid size; each dimension must be at least 2
    #[arg(long, num_args = 3, value_names = ["I", "J", "K"])]
    dimen: Option<Vec<usize>>,

    /// Output element type: byte, short or float
    #[arg(long, default_value = "short")]
    datum: DatumType,

    /// Value for lines without a fourth field
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    dval: f64,

    /// Value for voxels no line sets
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    fval: f64,

    /// Coordinates are voxel indices (default)
    #[arg(long, conflicts_with = "xyz")]
    ijk: bool,

    /// Coordinates are millimetres; requires --master
    #[arg(long)]
    xyz: bool,

    /// Axis order of the coordinates (e.g. RAI, LPI). Defaults to the
    /// template's order with --master, else to $UNDUMP_ORIENT, else RAI
    #[arg(long)]
    orient: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Input files; `-` reads standard input
    #[arg(value_name = "INPUT")]
    inputs: Vec<String>,
}

impl Args {
    fn config(&self) -> UndumpConfig {
        self.config_with_site_orient(std::env::var(ORIENT_ENV).ok())
    }

    /// Build the run config. `site_orient` only applies when neither
    /// `--orient` nor a template fixes the axis order.
    fn config_with_site_orient(&self, site_orient: Option<String>) -> UndumpConfig {
        let mut config = UndumpConfig::default()
            .datum(self.datum)
            .default_value(self.dval)
            .fill_value(self.fval)
            .prefix(&self.prefix)
            .mode(if self.xyz && !self.ijk {
                CoordinateMode::Physical
            } else {
                CoordinateMode::Index
            });
        if let Some(master) = &self.master {
            config = config.template(master);
        }
        if let Some(dimen) = &self.dimen {
            // clap enforces exactly three values
            config = config.dimensions([dimen[0], dimen[1], dimen[2]]);
        }
        let orient = match (&self.orient, &self.master) {
            (Some(code), _) => Some(code.clone()),
            (None, None) => site_orient.filter(|code| !code.is_empty()),
            (None, Some(_)) => None,
        };
        if let Some(orient) = orient {
            config = config.orientation(orient);
        }
        config
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_target(false)
        .format_timestamp(None)
        .init();

    match undump::run(&args.config(), &args.inputs) {
        Ok(stats) => {
            info!(
                "{} voxel(s) set from {} line(s); {} warning(s)",
                stats.records_applied,
                stats.lines_read,
                stats.warnings.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use undump::Undump;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_args_to_config() {
        let args = Args::try_parse_from([
            "undump", "--dimen", "4", "5", "6", "--datum", "float", "--fval", "-1", "--prefix",
            "out.nii.gz", "a.txt", "-",
        ])
        .unwrap();
        let config = args.config_with_site_orient(None);
        assert_eq!(config.dimensions, Some([4, 5, 6]));
        assert_eq!(config.datum, DatumType::Float);
        assert_eq!(config.fill_value, -1.0);
        assert_eq!(config.mode, CoordinateMode::Index);
        assert_eq!(config.prefix, PathBuf::from("out.nii.gz"));
        assert_eq!(args.inputs, vec!["a.txt".to_string(), "-".to_string()]);
    }

    #[test]
    fn test_mode_flags_conflict() {
        let res = Args::try_parse_from(["undump", "--ijk", "--xyz", "in.txt"]);
        assert!(res.is_err());
        let res = Args::try_parse_from(["undump", "--master", "m.nii", "--dimen", "2", "2", "2"]);
        assert!(res.is_err());
        let res = Args::try_parse_from(["undump", "--datum", "double", "in.txt"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_synthesized_grid_defaults_to_rai() {
        let args = parse(&["undump", "--dimen", "4", "4", "4", "in.txt"]);
        let config = args.config_with_site_orient(None);
        assert_eq!(config.orientation, None);
        let undump = Undump::new(&config).unwrap();
        assert_eq!(undump.geometry().orientation().to_string(), "RAI");
    }

    #[test]
    fn test_site_orient_applies_without_template() {
        let args = parse(&["undump", "--dimen", "4", "4", "4", "in.txt"]);
        let config = args.config_with_site_orient(Some("LPS".to_string()));
        assert_eq!(config.orientation.as_deref(), Some("LPS"));
        let undump = Undump::new(&config).unwrap();
        assert_eq!(undump.geometry().orientation().to_string(), "LPS");

        // unset and empty both fall through to RAI
        let config = args.config_with_site_orient(Some(String::new()));
        assert_eq!(config.orientation, None);
    }

    #[test]
    fn test_site_orient_ignored_with_template() {
        let args = parse(&["undump", "--master", "t.nii", "--xyz", "in.txt"]);
        let config = args.config_with_site_orient(Some("LPS".to_string()));
        // the template's own axis order is used for the coordinates
        assert_eq!(config.orientation, None);
        assert_eq!(config.mode, CoordinateMode::Physical);
    }

    #[test]
    fn test_explicit_orient_wins() {
        for args in [
            vec!["undump", "--orient", "ASL", "--dimen", "2", "2", "2", "in.txt"],
            vec!["undump", "--orient", "ASL", "--master", "t.nii", "--xyz", "in.txt"],
        ] {
            let config = parse(&args).config_with_site_orient(Some("LPS".to_string()));
            assert_eq!(config.orientation.as_deref(), Some("ASL"));
        }
    }
}
