//! Shared workflow logic used by the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core flow:
//! read points -> normalize -> validate -> fit -> residuals
//!
//! The command handlers can then focus on presentation (text vs JSON).

use crate::cli::PointsArgs;
use crate::domain::{CurveSeries, ValidationResult};
use crate::error::AppError;
use crate::fit::{PreparedSeries, prepare_series};
use crate::io::{IngestedPoints, load_points, parse_paste};
use crate::report::{PointResidual, compute_residuals};
use crate::validate::validate;

/// All computed outputs of a `pumpcurve fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub ingest: IngestedPoints,
    pub prepared: PreparedSeries,
    pub residuals: Vec<PointResidual>,
    /// The fitted series in its persisted shape (ids are 0: not saved).
    pub series: CurveSeries,
}

/// Read and normalize the points named by the CLI arguments.
pub fn read_points(args: &PointsArgs) -> Result<IngestedPoints, AppError> {
    let ingest = match (&args.points, &args.input) {
        (Some(text), _) => parse_paste(&text.replace(';', "\n")),
        (None, Some(path)) => load_points(path)?,
        (None, None) => {
            return Err(AppError::new(2, "No points given: use --input FILE or --points TEXT."));
        }
    };

    if ingest.rows_dropped > 0 {
        tracing::warn!(
            rows_read = ingest.rows_read,
            rows_dropped = ingest.rows_dropped,
            "dropped rows that are not (flow, value) pairs"
        );
    }
    Ok(ingest)
}

/// Validation dry-run.
pub fn run_validate(args: &PointsArgs) -> Result<ValidationResult, AppError> {
    let config = args.engine.to_config();
    config.check()?;
    let ingest = read_points(args)?;
    Ok(validate(args.series_type, &ingest.points, &config))
}

/// Validate + fit without persistence.
pub fn run_fit(args: &PointsArgs) -> Result<FitRun, AppError> {
    let config = args.engine.to_config();
    let ingest = read_points(args)?;
    let prepared = prepare_series(args.series_type, &ingest.points, &config)?;
    let residuals = compute_residuals(&prepared.points, &prepared.model)?;
    let series = CurveSeries::fitted(
        0,
        0,
        prepared.series_type,
        prepared.points.clone(),
        &prepared.model,
        prepared.warnings.clone(),
    );

    Ok(FitRun {
        ingest,
        prepared,
        residuals,
        series,
    })
}
