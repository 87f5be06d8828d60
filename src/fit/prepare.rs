//! Validate-then-fit for a submitted point set.
//!
//! This is the all-or-nothing step behind saving a series: either the whole
//! submission validates *and* fits, or the caller gets an error and nothing
//! downstream should change.

use crate::domain::{CurvePoint, EngineConfig, FitModel, Issue, RawPoint, SeriesType};
use crate::error::CurveError;
use crate::fit::fitter::fit;
use crate::validate::validate_accepted;

/// An accepted, fitted point set ready to be persisted.
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    pub series_type: SeriesType,
    /// Flow-sorted accepted points.
    pub points: Vec<CurvePoint>,
    pub model: FitModel,
    /// Validation warnings followed by fit-quality warnings.
    pub warnings: Vec<Issue>,
}

/// Validate `points` and fit the accepted set.
pub fn prepare_series(
    series_type: SeriesType,
    points: &[RawPoint],
    config: &EngineConfig,
) -> Result<PreparedSeries, CurveError> {
    config.check()?;

    let validation = validate_accepted(series_type, points, config).inspect_err(|err| {
        tracing::warn!(series_type = %series_type, error = %err, "point set rejected");
    })?;

    let outcome = fit(&validation.normalized_points, config).inspect_err(|err| {
        tracing::warn!(series_type = %series_type, error = %err, "fit failed after validation");
    })?;

    let mut warnings = validation.warnings;
    warnings.extend(outcome.warnings);

    Ok(PreparedSeries {
        series_type,
        points: validation.normalized_points,
        model: outcome.model,
        warnings,
    })
}
