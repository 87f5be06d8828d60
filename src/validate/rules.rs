//! Engineering/statistical rules for a submitted point set.
//!
//! Blocking rules reject the whole submission:
//! - non-numeric flow or value (per row)
//! - negative flow (per row)
//! - fewer than 2 numeric points
//! - duplicate flows (the engine does not guess which one to keep)
//! - negative efficiency
//!
//! Warning rules accept but flag:
//! - head rising with flow, negative head
//! - efficiency above 100 %
//! - power trending down with flow
//! - few points, narrow flow range
//!
//! Validation is a pure dry-run: it never touches persisted state.

use crate::domain::{CurvePoint, EngineConfig, Issue, IssueCode, RawPoint, SeriesType, ValidationResult};
use crate::error::CurveError;

/// Slope (value units per flow unit) below which a power curve is flagged.
const POWER_SLOPE_WARN: f64 = -0.1;

/// Validate `points` for a series of `series_type`.
pub fn validate(series_type: SeriesType, points: &[RawPoint], config: &EngineConfig) -> ValidationResult {
    let mut blocking_errors = Vec::new();
    let mut warnings = Vec::new();
    let mut numeric = Vec::with_capacity(points.len());

    for p in points {
        let (Some(flow), Some(value)) = (p.flow.as_number(), p.value.as_number()) else {
            blocking_errors.push(
                Issue::new(
                    IssueCode::NonNumeric,
                    format!(
                        "Point {} has non-numeric values (flow={}, value={}).",
                        p.sequence, p.flow, p.value
                    ),
                )
                .with_indices(vec![p.sequence]),
            );
            continue;
        };

        if flow < 0.0 {
            blocking_errors.push(
                Issue::new(
                    IssueCode::NegativeFlow,
                    format!("Point {} has negative flow {flow}.", p.sequence),
                )
                .with_indices(vec![p.sequence]),
            );
        }

        numeric.push(CurvePoint {
            flow,
            value,
            sequence: p.sequence,
        });
    }

    if numeric.len() < 2 {
        blocking_errors.push(Issue::new(
            IssueCode::TooFewPoints,
            format!("At least 2 numeric points are required (got {}).", numeric.len()),
        ));
    }

    // Stable sort: equal flows keep their input order.
    numeric.sort_by(|a, b| a.flow.total_cmp(&b.flow));

    blocking_errors.extend(duplicate_flow_errors(&numeric, config.duplicate_eps));

    if numeric.len() >= 2 {
        type_rules(series_type, &numeric, &mut blocking_errors, &mut warnings);
        coverage_rules(&numeric, config, &mut warnings);
    }

    tracing::debug!(
        series_type = %series_type,
        points = points.len(),
        numeric = numeric.len(),
        blocking = blocking_errors.len(),
        warnings = warnings.len(),
        "validated point set"
    );

    ValidationResult {
        blocking_errors,
        warnings,
        normalized_points: numeric,
    }
}

/// Validate and turn blocking errors into `CurveError::Rejected`.
pub fn validate_accepted(
    series_type: SeriesType,
    points: &[RawPoint],
    config: &EngineConfig,
) -> Result<ValidationResult, CurveError> {
    let result = validate(series_type, points, config);
    if result.is_accepted() {
        Ok(result)
    } else {
        Err(CurveError::Rejected {
            issues: result.blocking_errors,
        })
    }
}

/// `|a - b| <= eps * max(1, |a|, |b|)`.
pub fn flows_coincide(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps * 1f64.max(a.abs()).max(b.abs())
}

fn duplicate_flow_errors(sorted: &[CurvePoint], eps: f64) -> Vec<Issue> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let anchor = sorted[i].flow;
        let mut j = i + 1;
        while j < sorted.len() && flows_coincide(anchor, sorted[j].flow, eps) {
            j += 1;
        }
        if j - i > 1 {
            let indices: Vec<usize> = sorted[i..j].iter().map(|p| p.sequence).collect();
            out.push(
                Issue::new(
                    IssueCode::DuplicateFlow,
                    format!(
                        "Duplicate flow {anchor} at points {indices:?}; keep one value per flow."
                    ),
                )
                .with_indices(indices),
            );
        }
        i = j;
    }
    out
}

fn type_rules(
    series_type: SeriesType,
    sorted: &[CurvePoint],
    blocking_errors: &mut Vec<Issue>,
    warnings: &mut Vec<Issue>,
) {
    match series_type {
        SeriesType::Head => {
            let rising: Vec<usize> = sorted
                .windows(2)
                .filter(|w| w[1].value > w[0].value)
                .map(|w| w[1].sequence)
                .collect();
            if !rising.is_empty() {
                warnings.push(
                    Issue::new(
                        IssueCode::NonMonotonicHead,
                        "Head increases with flow at some points; most centrifugal curves fall monotonically.",
                    )
                    .with_indices(rising),
                );
            }

            let negative = sequences_where(sorted, |p| p.value < 0.0);
            if !negative.is_empty() {
                warnings.push(
                    Issue::new(IssueCode::NegativeHead, "Negative head values detected.").with_indices(negative),
                );
            }
        }
        SeriesType::Efficiency => {
            let over = sequences_where(sorted, |p| p.value > 100.0);
            if !over.is_empty() {
                warnings.push(
                    Issue::new(
                        IssueCode::EffGt100,
                        "Efficiency values > 100% detected; check the unit (fraction vs percent).",
                    )
                    .with_indices(over),
                );
            }

            let negative = sequences_where(sorted, |p| p.value < 0.0);
            if !negative.is_empty() {
                blocking_errors.push(
                    Issue::new(IssueCode::EffLt0, "Efficiency values < 0% detected.").with_indices(negative),
                );
            }
        }
        SeriesType::Power => {
            if sorted.len() > 2 {
                if let Some(slope) = linear_slope(sorted) {
                    if slope < POWER_SLOPE_WARN {
                        warnings.push(Issue::new(
                            IssueCode::PowerDecreasing,
                            format!(
                                "Power appears to decrease with flow (slope {slope:.4}); check the units."
                            ),
                        ));
                    }
                }
            }
        }
    }
}

fn coverage_rules(sorted: &[CurvePoint], config: &EngineConfig, warnings: &mut Vec<Issue>) {
    if sorted.len() < config.min_recommended_points {
        warnings.push(Issue::new(
            IssueCode::FewPoints,
            format!(
                "Only {} points; at least {} are recommended for a reliable fit.",
                sorted.len(),
                config.min_recommended_points
            ),
        ));
    }

    // `sorted` is non-empty here.
    let min_q = sorted[0].flow;
    let max_q = sorted[sorted.len() - 1].flow;
    if max_q > 0.0 && (max_q - min_q) < config.min_span_ratio * max_q {
        warnings.push(Issue::new(
            IssueCode::NarrowRange,
            format!("Data covers a narrow operating range [{min_q}, {max_q}]."),
        ));
    }
}

fn sequences_where(points: &[CurvePoint], pred: impl Fn(&CurvePoint) -> bool) -> Vec<usize> {
    points.iter().filter(|p| pred(p)).map(|p| p.sequence).collect()
}

/// Least-squares slope of `value ~ a + b * flow`.
fn linear_slope(points: &[CurvePoint]) -> Option<f64> {
    let n = points.len() as f64;
    let qbar = points.iter().map(|p| p.flow).sum::<f64>() / n;
    let vbar = points.iter().map(|p| p.value).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for p in points {
        let dq = p.flow - qbar;
        cov += dq * (p.value - vbar);
        var += dq * dq;
    }
    if var <= 1e-18 || !cov.is_finite() {
        return None;
    }
    Some(cov / var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawField;

    fn raw(points: &[(f64, f64)]) -> Vec<RawPoint> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(q, v))| RawPoint {
                flow: RawField::Number(q),
                value: RawField::Number(v),
                sequence: i,
            })
            .collect()
    }

    fn codes(issues: &[Issue]) -> Vec<IssueCode> {
        issues.iter().map(|i| i.code).collect()
    }

    #[test]
    fn clean_head_curve_is_accepted_in_order() {
        let res = validate(
            SeriesType::Head,
            &raw(&[(0.0, 100.0), (100.0, 95.0), (200.0, 85.0)]),
            &EngineConfig::default(),
        );
        assert!(res.is_accepted());
        let flows: Vec<f64> = res.normalized_points.iter().map(|p| p.flow).collect();
        assert_eq!(flows, vec![0.0, 100.0, 200.0]);
        assert_eq!(codes(&res.warnings), vec![IssueCode::FewPoints]);
    }

    #[test]
    fn duplicate_flow_is_a_single_blocking_error() {
        let res = validate(
            SeriesType::Head,
            &raw(&[(0.0, 100.0), (0.0, 90.0)]),
            &EngineConfig::default(),
        );
        assert_eq!(codes(&res.blocking_errors), vec![IssueCode::DuplicateFlow]);
        assert_eq!(res.blocking_errors[0].indices, vec![0, 1]);
    }

    #[test]
    fn near_duplicate_within_eps_is_rejected() {
        let res = validate(
            SeriesType::Power,
            &raw(&[(1000.0, 5.0), (1000.0 + 1e-8, 5.1), (1500.0, 6.0)]),
            &EngineConfig::default(),
        );
        assert_eq!(codes(&res.blocking_errors), vec![IssueCode::DuplicateFlow]);
    }

    #[test]
    fn single_point_is_insufficient() {
        let res = validate(SeriesType::Head, &raw(&[(50.0, 10.0)]), &EngineConfig::default());
        assert_eq!(codes(&res.blocking_errors), vec![IssueCode::TooFewPoints]);
    }

    #[test]
    fn non_numeric_names_the_row() {
        let points = vec![
            RawPoint {
                flow: RawField::Number(0.0),
                value: RawField::Number(10.0),
                sequence: 0,
            },
            RawPoint {
                flow: RawField::Unparsed("a".to_string()),
                value: RawField::Number(10.0),
                sequence: 1,
            },
            RawPoint {
                flow: RawField::Number(20.0),
                value: RawField::Number(8.0),
                sequence: 2,
            },
        ];
        let res = validate(SeriesType::Head, &points, &EngineConfig::default());
        assert_eq!(codes(&res.blocking_errors), vec![IssueCode::NonNumeric]);
        assert_eq!(res.blocking_errors[0].indices, vec![1]);
        assert!(res.blocking_errors[0].message.contains("'a'"));
    }

    #[test]
    fn negative_flow_blocks() {
        let res = validate(
            SeriesType::Head,
            &raw(&[(-10.0, 10.0), (10.0, 10.0)]),
            &EngineConfig::default(),
        );
        assert_eq!(res.blocking_errors[0].code, IssueCode::NegativeFlow);
        assert_eq!(res.blocking_errors[0].indices, vec![0]);
    }

    #[test]
    fn sorting_preserves_sequence() {
        let res = validate(
            SeriesType::Head,
            &raw(&[(200.0, 85.0), (0.0, 100.0), (100.0, 95.0), (300.0, 70.0)]),
            &EngineConfig::default(),
        );
        let seqs: Vec<usize> = res.normalized_points.iter().map(|p| p.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 0, 3]);
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn rising_head_is_a_warning() {
        let res = validate(
            SeriesType::Head,
            &raw(&[(0.0, 90.0), (50.0, 95.0), (100.0, 92.0), (150.0, 80.0)]),
            &EngineConfig::default(),
        );
        assert!(res.is_accepted());
        assert_eq!(codes(&res.warnings), vec![IssueCode::NonMonotonicHead]);
        assert_eq!(res.warnings[0].indices, vec![1]);
    }

    #[test]
    fn efficiency_rules() {
        let res = validate(
            SeriesType::Efficiency,
            &raw(&[(10.0, 110.0), (20.0, 80.0), (30.0, -1.0), (40.0, 50.0)]),
            &EngineConfig::default(),
        );
        assert_eq!(codes(&res.warnings), vec![IssueCode::EffGt100]);
        assert_eq!(codes(&res.blocking_errors), vec![IssueCode::EffLt0]);
        assert_eq!(res.blocking_errors[0].indices, vec![2]);
    }

    #[test]
    fn decreasing_power_warns() {
        let res = validate(
            SeriesType::Power,
            &raw(&[(0.0, 50.0), (100.0, 30.0), (200.0, 10.0), (300.0, 5.0)]),
            &EngineConfig::default(),
        );
        assert!(res.is_accepted());
        assert_eq!(codes(&res.warnings), vec![IssueCode::PowerDecreasing]);
    }

    #[test]
    fn narrow_range_warns() {
        let res = validate(
            SeriesType::Power,
            &raw(&[(100.0, 5.0), (102.0, 5.1), (104.0, 5.2), (105.0, 5.3)]),
            &EngineConfig::default(),
        );
        assert_eq!(codes(&res.warnings), vec![IssueCode::NarrowRange]);
    }

    #[test]
    fn validate_accepted_maps_to_rejected() {
        let err = validate_accepted(SeriesType::Head, &raw(&[(1.0, 1.0)]), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, CurveError::Rejected { .. }));
    }
}
