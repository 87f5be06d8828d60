//! Property-based tests for the curve engine using proptest.
//!
//! Covers: point ordering, duplicate rejection, degree selection, data range,
//! extrapolation flags, deterministic evaluation and same-type replacement.

use pump_curves::domain::{EngineConfig, IssueCode, RawField, RawPoint, SeriesType, Units};
use pump_curves::duty::evaluate;
use pump_curves::fit::prepare_series;
use pump_curves::store::CurveStore;
use pump_curves::validate::validate;
use proptest::prelude::*;

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

/// Distinct integer flows (scaled to 0.5 steps) in shuffled order.
fn distinct_flows(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::btree_set(0u32..20_000, min..max)
        .prop_map(|set| set.into_iter().map(|q| f64::from(q) * 0.5).collect::<Vec<_>>())
        .prop_shuffle()
}

/// Efficiency points in [0, 100] on distinct flows: only warnings can fire.
fn efficiency_points(min: usize, max: usize) -> impl Strategy<Value = Vec<(f64, f64)>> {
    distinct_flows(min, max).prop_flat_map(|flows| {
        let n = flows.len();
        (Just(flows), prop::collection::vec(0.0f64..100.0, n))
            .prop_map(|(flows, values)| flows.into_iter().zip(values).collect())
    })
}

// ── Validation ───────────────────────────────────────────────────────

proptest! {
    /// Accepted points come back sorted by flow with their input sequence kept.
    #[test]
    fn normalized_points_are_sorted(points in efficiency_points(2, 30)) {
        let result = validate(SeriesType::Efficiency, &raw(&points), &EngineConfig::default());
        prop_assert!(result.is_accepted(), "{:?}", result.blocking_errors);
        prop_assert_eq!(result.normalized_points.len(), points.len());

        for pair in result.normalized_points.windows(2) {
            prop_assert!(pair[0].flow < pair[1].flow);
        }
        for p in &result.normalized_points {
            prop_assert_eq!(points[p.sequence], (p.flow, p.value));
        }
    }

    /// Repeating any flow rejects the set and names both rows.
    #[test]
    fn duplicated_flow_is_rejected(points in efficiency_points(2, 20), pick in any::<prop::sample::Index>()) {
        let mut points = points;
        let dup = pick.get(&points).0;
        points.push((dup, 50.0));
        let last = points.len() - 1;

        let result = validate(SeriesType::Efficiency, &raw(&points), &EngineConfig::default());
        prop_assert!(!result.is_accepted());

        let issue = result
            .blocking_errors
            .iter()
            .find(|i| i.code == IssueCode::DuplicateFlow);
        prop_assert!(issue.is_some());
        let issue = issue.unwrap();
        prop_assert_eq!(issue.indices.len(), 2);
        prop_assert!(issue.indices.contains(&last));
    }

    /// A negative flow anywhere blocks the submission.
    #[test]
    fn negative_flow_is_blocking(points in efficiency_points(2, 20), neg in 0.001f64..1000.0) {
        let mut points = points;
        points.push((-neg, 10.0));
        let result = validate(SeriesType::Efficiency, &raw(&points), &EngineConfig::default());
        prop_assert!(result.blocking_errors.iter().any(|i| i.code == IssueCode::NegativeFlow));
    }
}

// ── Fitting ──────────────────────────────────────────────────────────

proptest! {
    /// Degree is min(max_degree, n - 1) and the range spans exactly the input flows.
    #[test]
    fn degree_and_range_follow_points(points in efficiency_points(2, 25), max_degree in 1usize..3) {
        let config = EngineConfig { max_degree, ..EngineConfig::default() };
        let prepared = prepare_series(SeriesType::Efficiency, &raw(&points), &config).unwrap();

        prop_assert_eq!(prepared.model.degree, max_degree.min(points.len() - 1));
        prop_assert_eq!(prepared.model.coeffs.len(), prepared.model.degree + 1);
        prop_assert!(prepared.model.coeffs.iter().all(|c| c.is_finite()));

        let min_q = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_q = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(prepared.model.data_range.min_q, min_q);
        prop_assert_eq!(prepared.model.data_range.max_q, max_q);
        prop_assert_eq!(prepared.model.quality.n, points.len());
    }

    /// Fitting is deterministic for a given input.
    #[test]
    fn refit_is_bit_identical(points in efficiency_points(3, 20)) {
        let config = EngineConfig::default();
        let a = prepare_series(SeriesType::Efficiency, &raw(&points), &config).unwrap();
        let b = prepare_series(SeriesType::Efficiency, &raw(&points), &config).unwrap();
        let bits = |c: &[f64]| c.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        prop_assert_eq!(bits(&a.model.coeffs), bits(&b.model.coeffs));
    }
}

// ── Evaluation ───────────────────────────────────────────────────────

proptest! {
    /// Extrapolation is flagged exactly when the flow leaves the fitted range,
    /// and repeated evaluations agree.
    #[test]
    fn extrapolation_flag_matches_range(points in efficiency_points(3, 15), flow in 0.0f64..12_000.0) {
        let store = CurveStore::new();
        let set = store.create_curve_set(1, "prop", Units::default());
        let config = EngineConfig::default();
        let series = store.save_series(set.id, SeriesType::Efficiency, &raw(&points), &config).unwrap();

        let range = series.data_range.unwrap();
        let first = evaluate(&series, flow, None, &config).unwrap();
        let outside = flow < range.min_q || flow > range.max_q;
        prop_assert_eq!(first.extrapolation, outside);
        prop_assert_eq!(
            first.warnings.iter().any(|w| w.contains("extrapolated")),
            outside
        );

        let second = evaluate(&series, flow, None, &config).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Saving the same type twice leaves one series of that type, same id.
    #[test]
    fn save_replaces_same_type(first in efficiency_points(2, 10), second in efficiency_points(2, 10)) {
        let store = CurveStore::new();
        let set = store.create_curve_set(7, "replace", Units::default());
        let config = EngineConfig::default();

        let a = store.save_series(set.id, SeriesType::Efficiency, &raw(&first), &config).unwrap();
        let b = store.save_series(set.id, SeriesType::Efficiency, &raw(&second), &config).unwrap();
        prop_assert_eq!(a.id, b.id);

        let set = store.curve_set(set.id).unwrap();
        let of_type: Vec<_> = set
            .series
            .iter()
            .filter(|s| s.series_type == SeriesType::Efficiency)
            .collect();
        prop_assert_eq!(of_type.len(), 1);
        prop_assert_eq!(of_type[0].points.len(), second.len());
    }
}

// ── Worked scenarios ────────────────────────────────────────────────

#[test]
fn scenario_clean_head_curve() {
    let points = raw(&[(0.0, 100.0), (100.0, 95.0), (200.0, 85.0), (300.0, 70.0)]);
    let prepared = prepare_series(SeriesType::Head, &points, &EngineConfig::default()).unwrap();
    assert_eq!(prepared.model.degree, 2);
    assert!(prepared.warnings.is_empty(), "{:?}", prepared.warnings);

    let expected = [-0.00025, -0.025, 100.0];
    for (c, e) in prepared.model.coeffs.iter().zip(expected) {
        assert!((c - e).abs() < 1e-9, "coeff {c} vs {e}");
    }
    assert!((prepared.model.quality.r2.unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn scenario_duplicate_flow_rejects_without_persisting() {
    let store = CurveStore::new();
    let set = store.create_curve_set(1, "dup", Units::default());
    let points = raw(&[(0.0, 100.0), (100.0, 95.0), (100.0, 94.0)]);
    let err = store
        .save_series(set.id, SeriesType::Head, &points, &EngineConfig::default())
        .unwrap_err();
    assert!(err.to_string().contains("DUPLICATE_FLOW"));
    assert!(store.curve_set(set.id).unwrap().series.is_empty());
}

#[test]
fn scenario_rising_head_warns_but_saves() {
    let store = CurveStore::new();
    let set = store.create_curve_set(1, "rising", Units::default());
    let points = raw(&[(0.0, 80.0), (100.0, 85.0), (200.0, 90.0)]);
    let series = store
        .save_series(set.id, SeriesType::Head, &points, &EngineConfig::default())
        .unwrap();
    assert!(series
        .validation_warnings
        .iter()
        .any(|w| w.code == IssueCode::NonMonotonicHead));
    assert!(series.is_fitted());
}

#[test]
fn scenario_duty_point_within_tolerance() {
    let store = CurveStore::new();
    let set = store.create_curve_set(1, "duty", Units::default());
    let points = raw(&[(0.0, 100.0), (100.0, 95.0), (200.0, 85.0), (300.0, 70.0)]);
    let config = EngineConfig::default();
    let series = store.save_series(set.id, SeriesType::Head, &points, &config).unwrap();

    let result = store.evaluate(series.id, 150.0, Some(90.0), &config).unwrap();
    let head = result.predictions[&SeriesType::Head];
    assert!((head - 90.625).abs() < 1e-9);
    let residual = result.residuals.unwrap();
    assert!((residual.value - 0.625).abs() < 1e-9);
    assert!(residual.pass);
    assert!(!result.extrapolation);
}

#[test]
fn scenario_extrapolated_duty_point() {
    let store = CurveStore::new();
    let set = store.create_curve_set(1, "extrap", Units::default());
    let points = raw(&[(0.0, 100.0), (100.0, 95.0), (200.0, 85.0), (300.0, 70.0)]);
    let config = EngineConfig::default();
    let series = store.save_series(set.id, SeriesType::Head, &points, &config).unwrap();

    let result = store.evaluate(series.id, 400.0, None, &config).unwrap();
    assert!(result.extrapolation);
    assert!((result.predictions[&SeriesType::Head] - 50.0).abs() < 1e-9);
    assert!(result.warnings.iter().any(|w| w.contains("outside data range")));
}
