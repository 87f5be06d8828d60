//! Command-line parsing for the pump curve engine.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the validation/fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{EngineConfig, SeriesType, ToleranceMode, Units};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pumpcurve", version, about = "Pump performance curve validation, fitting and duty-point evaluation")]
pub struct Cli {
    /// Log level used when `RUST_LOG` is not set (error, warn, info, debug, trace).
    #[arg(long, global = true, env = "PUMP_CURVES_LOG", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Dry-run validation of a point set (nothing is fitted or saved).
    Validate(PointsArgs),
    /// Validate and fit a point set without saving it.
    Fit(FitArgs),
    /// Create a curve set in a store file.
    CreateSet(CreateSetArgs),
    /// Rename a curve set or change its units.
    UpdateSet(UpdateSetArgs),
    /// Remove a curve set and all of its series.
    DeleteSet(DeleteSetArgs),
    /// Validate, fit and save a series into a curve set (replaces the same type).
    Save(SaveArgs),
    /// Evaluate duty points against a stored series.
    Evaluate(EvaluateArgs),
    /// Print a curve set (or every set) from a store file.
    Show(ShowArgs),
    /// Remove a stored series.
    DeleteSeries(DeleteSeriesArgs),
}

/// Where the points come from and what they describe.
#[derive(Debug, Args, Clone)]
pub struct PointsArgs {
    /// Curve type of the points.
    #[arg(short = 't', long = "type", value_enum)]
    pub series_type: SeriesType,

    /// Point file: `.json` (array of {flow, value}), CSV otherwise, `-` for stdin paste.
    #[arg(short, long, value_name = "FILE", conflicts_with = "points")]
    pub input: Option<PathBuf>,

    /// Inline paste text, e.g. "0 100; 100 95; 200 85" (`;` or newline separates points).
    #[arg(short, long)]
    pub points: Option<String>,

    /// Print JSON instead of the text report.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub points: PointsArgs,

    /// Add an N-point sample grid of the fitted curve (also in `--json` output).
    #[arg(long, value_name = "N")]
    pub samples: Option<usize>,

    /// Export the fitted series (model + sample grid) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CreateSetArgs {
    /// Store file (created if missing).
    #[arg(long, env = "PUMP_CURVES_STORE")]
    pub store: PathBuf,

    #[arg(long)]
    pub pump_id: u64,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub flow_unit: Option<String>,

    #[arg(long)]
    pub head_unit: Option<String>,

    #[arg(long)]
    pub efficiency_unit: Option<String>,

    #[arg(long)]
    pub power_unit: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct UpdateSetArgs {
    #[arg(long, env = "PUMP_CURVES_STORE")]
    pub store: PathBuf,

    #[arg(long)]
    pub curve_set: u64,

    #[arg(long)]
    pub name: Option<String>,

    /// Unit flags given here override the stored ones; the rest are kept.
    #[arg(long)]
    pub flow_unit: Option<String>,

    #[arg(long)]
    pub head_unit: Option<String>,

    #[arg(long)]
    pub efficiency_unit: Option<String>,

    #[arg(long)]
    pub power_unit: Option<String>,
}

impl UpdateSetArgs {
    /// `current` with the given unit flags applied; `None` when no unit flag is set.
    pub fn merged_units(&self, current: &Units) -> Option<Units> {
        let given = [&self.flow_unit, &self.head_unit, &self.efficiency_unit, &self.power_unit];
        if given.iter().all(|u| u.is_none()) {
            return None;
        }
        Some(Units {
            flow: self.flow_unit.clone().or_else(|| current.flow.clone()),
            head: self.head_unit.clone().or_else(|| current.head.clone()),
            efficiency: self.efficiency_unit.clone().or_else(|| current.efficiency.clone()),
            power: self.power_unit.clone().or_else(|| current.power.clone()),
        })
    }
}

#[derive(Debug, Args, Clone)]
pub struct DeleteSetArgs {
    #[arg(long, env = "PUMP_CURVES_STORE")]
    pub store: PathBuf,

    #[arg(long)]
    pub curve_set: u64,
}

#[derive(Debug, Args, Clone)]
pub struct SaveArgs {
    #[arg(long, env = "PUMP_CURVES_STORE")]
    pub store: PathBuf,

    #[arg(long)]
    pub curve_set: u64,

    #[command(flatten)]
    pub points: PointsArgs,
}

#[derive(Debug, Args, Clone)]
pub struct EvaluateArgs {
    #[arg(long, env = "PUMP_CURVES_STORE")]
    pub store: PathBuf,

    #[arg(long)]
    pub series_id: u64,

    /// Duty flow (repeatable).
    #[arg(long = "flow", required = true, num_args = 1)]
    pub flows: Vec<f64>,

    /// Target head at the duty point (head series only).
    #[arg(long)]
    pub target: Option<f64>,

    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[arg(long, env = "PUMP_CURVES_STORE")]
    pub store: PathBuf,

    /// Curve set id; all sets when omitted.
    #[arg(long)]
    pub curve_set: Option<u64>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct DeleteSeriesArgs {
    #[arg(long, env = "PUMP_CURVES_STORE")]
    pub store: PathBuf,

    #[arg(long)]
    pub series_id: u64,
}

/// Engine tunables. Each flag can also come from the environment (or `.env`).
#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    /// Maximum polynomial degree.
    #[arg(long, env = "PUMP_CURVES_MAX_DEGREE", default_value_t = 2)]
    pub max_degree: usize,

    /// R² below this is reported as a warning.
    #[arg(long, env = "PUMP_CURVES_MIN_R2", default_value_t = 0.9)]
    pub min_r2: f64,

    /// Duty-point residual tolerance.
    #[arg(long, env = "PUMP_CURVES_TOLERANCE", default_value_t = 0.05)]
    pub tolerance: f64,

    /// How `--tolerance` is applied to the residual.
    #[arg(long, env = "PUMP_CURVES_TOLERANCE_MODE", value_enum, default_value_t = ToleranceMode::Relative)]
    pub tolerance_mode: ToleranceMode,

    /// Minimum `(max_q - min_q) / max_q` before a narrow-range warning.
    #[arg(long, env = "PUMP_CURVES_MIN_SPAN_RATIO", default_value_t = 0.1)]
    pub min_span_ratio: f64,

    /// Relative epsilon under which two flows count as duplicates.
    #[arg(long, env = "PUMP_CURVES_DUPLICATE_EPS", default_value_t = 1e-9)]
    pub duplicate_eps: f64,

    /// Point count below which a few-points warning is raised.
    #[arg(long, env = "PUMP_CURVES_MIN_POINTS", default_value_t = 4)]
    pub min_points: usize,
}

impl EngineArgs {
    pub fn to_config(&self) -> EngineConfig {
        EngineConfig {
            max_degree: self.max_degree,
            min_r2: self.min_r2,
            tolerance: self.tolerance,
            tolerance_mode: self.tolerance_mode,
            min_span_ratio: self.min_span_ratio,
            duplicate_eps: self.duplicate_eps,
            min_recommended_points: self.min_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_defaults_match_config_defaults() {
        let cli = Cli::parse_from(["pumpcurve", "validate", "--type", "head", "--points", "0 1"]);
        let Command::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.engine.to_config(), EngineConfig::default());
    }

    #[test]
    fn update_set_merges_only_given_units() {
        let cli = Cli::parse_from([
            "pumpcurve", "update-set", "--store", "s.json", "--curve-set", "3", "--head-unit", "ft",
        ]);
        let Command::UpdateSet(args) = cli.command else {
            panic!("expected update-set");
        };
        assert_eq!(args.name, None);

        let current = Units {
            flow: Some("gpm".to_string()),
            head: Some("m".to_string()),
            ..Units::default()
        };
        let merged = args.merged_units(&current).unwrap();
        assert_eq!(merged.flow.as_deref(), Some("gpm"));
        assert_eq!(merged.head.as_deref(), Some("ft"));
    }

    #[test]
    fn update_set_without_unit_flags_keeps_units() {
        let cli = Cli::parse_from([
            "pumpcurve", "update-set", "--store", "s.json", "--curve-set", "3", "--name", "Trim 240",
        ]);
        let Command::UpdateSet(args) = cli.command else {
            panic!("expected update-set");
        };
        assert_eq!(args.name.as_deref(), Some("Trim 240"));
        assert_eq!(args.merged_units(&Units::default()), None);
    }

    #[test]
    fn evaluate_accepts_repeated_flows() {
        let cli = Cli::parse_from([
            "pumpcurve", "evaluate", "--store", "s.json", "--series-id", "2", "--flow", "10", "--flow", "20",
            "--target", "30",
        ]);
        let Command::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(args.flows, vec![10.0, 20.0]);
        assert_eq!(args.target, Some(30.0));
    }
}
