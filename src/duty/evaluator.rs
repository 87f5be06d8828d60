//! Duty point evaluation.
//!
//! Evaluates a fitted series at an operating flow and reports:
//! - the predicted value for the series type
//! - for head series with a target: the residual and whether it is in tolerance
//! - whether the flow lies outside the fitted data range (extrapolation)
//!
//! Evaluation is a pure function of the stored model, the query flow and the
//! target; repeated calls return identical results.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::domain::{
    CurveSeries, EngineConfig, EvaluationResult, FitModel, Residual, SeriesType, ToleranceMode,
};
use crate::error::CurveError;
use crate::fit::quality_warnings;
use crate::models::predict;

/// Evaluate a persisted series at `flow`.
pub fn evaluate(
    series: &CurveSeries,
    flow: f64,
    target: Option<f64>,
    config: &EngineConfig,
) -> Result<EvaluationResult, CurveError> {
    let model = series.fit_model()?;
    evaluate_model(series.series_type, &model, flow, target, config)
}

/// Evaluate many duty points against one series (parallel, order preserved).
pub fn evaluate_batch(
    series: &CurveSeries,
    flows: &[f64],
    target: Option<f64>,
    config: &EngineConfig,
) -> Result<Vec<EvaluationResult>, CurveError> {
    let model = series.fit_model()?;
    flows
        .par_iter()
        .map(|&flow| evaluate_model(series.series_type, &model, flow, target, config))
        .collect()
}

/// Evaluate a typed model at `flow`.
pub fn evaluate_model(
    series_type: SeriesType,
    model: &FitModel,
    flow: f64,
    target: Option<f64>,
    config: &EngineConfig,
) -> Result<EvaluationResult, CurveError> {
    if !flow.is_finite() {
        return Err(CurveError::InvalidArgument(format!("query flow must be finite (got {flow})")));
    }
    if let Some(t) = target {
        if !t.is_finite() {
            return Err(CurveError::InvalidArgument(format!("target value must be finite (got {t})")));
        }
    }

    let mut warnings = Vec::new();
    let range = model.data_range;
    let extrapolation = !range.contains(flow);
    if extrapolation {
        warnings.push(format!(
            "Flow {flow} is outside data range [{}, {}]. Prediction is extrapolated.",
            range.min_q, range.max_q
        ));
    }

    warnings.extend(
        quality_warnings(&model.quality, config.min_r2)
            .into_iter()
            .map(|issue| issue.message),
    );

    let predicted = predict(model, flow);
    let mut predictions = BTreeMap::new();
    predictions.insert(series_type, predicted);

    let residuals = match (series_type, target) {
        (SeriesType::Head, Some(t)) => {
            let r = residual(predicted, t, config);
            if !r.pass {
                warnings.push(format!(
                    "Predicted head {predicted:.3} misses target {t} by {:.3} (allowed ±{:.3}).",
                    r.value, r.allowed
                ));
            }
            Some(r)
        }
        (_, Some(_)) => {
            warnings.push(format!(
                "Target value ignored: residuals are only computed for head series, not {series_type}."
            ));
            None
        }
        (_, None) => None,
    };

    Ok(EvaluationResult {
        flow,
        predictions,
        residuals,
        warnings,
        extrapolation,
    })
}

/// Residual of `predicted` against `target` under the configured tolerance.
///
/// - `absolute`: pass iff `|predicted - target| <= tolerance`
/// - `relative`: pass iff `|predicted - target| <= tolerance * |target|`
pub fn residual(predicted: f64, target: f64, config: &EngineConfig) -> Residual {
    let value = predicted - target;
    let allowed = match config.tolerance_mode {
        ToleranceMode::Absolute => config.tolerance,
        ToleranceMode::Relative => config.tolerance * target.abs(),
    };
    Residual {
        value,
        pass: value.abs() <= allowed,
        allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurvePoint, DataRange};
    use crate::fit::fit_polynomial;

    fn head_series() -> CurveSeries {
        let points: Vec<CurvePoint> = [(0.0, 100.0), (100.0, 95.0), (200.0, 85.0)]
            .iter()
            .enumerate()
            .map(|(i, &(flow, value))| CurvePoint {
                flow,
                value,
                sequence: i,
            })
            .collect();
        let model = fit_polynomial(&points, 2).unwrap();
        CurveSeries::fitted(1, 1, SeriesType::Head, points, &model, vec![])
    }

    #[test]
    fn extrapolation_beyond_max_flow() {
        let series = head_series();
        assert_eq!(series.data_range, Some(DataRange { min_q: 0.0, max_q: 200.0 }));
        let res = evaluate(&series, 250.0, None, &EngineConfig::default()).unwrap();
        assert!(res.extrapolation);
        assert_eq!(res.warnings.len(), 1);
        assert!(res.warnings[0].contains("outside data range"));
    }

    #[test]
    fn range_endpoints_are_interpolation() {
        let series = head_series();
        for q in [0.0, 200.0] {
            let res = evaluate(&series, q, None, &EngineConfig::default()).unwrap();
            assert!(!res.extrapolation, "q={q}");
        }
    }

    #[test]
    fn head_residual_uses_relative_tolerance_by_default() {
        let series = head_series();
        let res = evaluate(&series, 100.0, Some(90.0), &EngineConfig::default()).unwrap();
        let predicted = res.predictions[&SeriesType::Head];
        let r = res.residuals.unwrap();
        assert!((predicted - 95.0).abs() < 1e-9);
        assert_eq!(r.value, predicted - 90.0);
        // 5.0 > 0.05 * 90 = 4.5
        assert!(!r.pass);
        assert!(res.warnings.iter().any(|w| w.contains("misses target")));
    }

    #[test]
    fn head_residual_absolute_tolerance() {
        let config = EngineConfig {
            tolerance: 6.0,
            tolerance_mode: ToleranceMode::Absolute,
            ..EngineConfig::default()
        };
        let res = evaluate(&head_series(), 100.0, Some(90.0), &config).unwrap();
        let r = res.residuals.unwrap();
        assert!(r.pass);
        assert_eq!(r.allowed, 6.0);
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn target_is_ignored_for_non_head_series() {
        let mut series = head_series();
        series.series_type = SeriesType::Efficiency;
        let res = evaluate(&series, 50.0, Some(70.0), &EngineConfig::default()).unwrap();
        assert!(res.residuals.is_none());
        assert!(res.predictions.contains_key(&SeriesType::Efficiency));
        assert_eq!(res.warnings.len(), 1);
    }

    #[test]
    fn unfitted_series_is_a_state_error() {
        let mut series = head_series();
        series.fit_model_type = None;
        let err = evaluate(&series, 50.0, None, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, CurveError::NotFitted { .. }));
    }

    #[test]
    fn non_finite_flow_is_rejected() {
        let err = evaluate(&head_series(), f64::NAN, None, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, CurveError::InvalidArgument(_)));
    }

    #[test]
    fn batch_matches_single_calls() {
        let series = head_series();
        let config = EngineConfig::default();
        let flows = [0.0, 50.0, 150.0, 250.0];
        let batch = evaluate_batch(&series, &flows, Some(90.0), &config).unwrap();
        for (q, res) in flows.iter().zip(batch.iter()) {
            assert_eq!(res, &evaluate(&series, *q, Some(90.0), &config).unwrap());
        }
    }
}
