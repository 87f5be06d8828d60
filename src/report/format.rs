//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the validation/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{
    CurveGrid, CurveSeries, CurveSet, EvaluationResult, FitModel, Issue, SeriesType, Units, ValidationResult,
};
use crate::report::PointResidual;

/// Format a validation dry-run.
pub fn format_validation(series_type: SeriesType, result: &ValidationResult) -> String {
    let mut out = String::new();

    let verdict = if result.is_accepted() { "accepted" } else { "rejected" };
    out.push_str(&format!(
        "=== {series_type} points: {verdict} ({} numeric point(s)) ===\n",
        result.normalized_points.len()
    ));
    out.push_str(&format_issues("Blocking errors", &result.blocking_errors));
    out.push_str(&format_issues("Warnings", &result.warnings));

    if !result.normalized_points.is_empty() {
        out.push_str("\nNormalized points (sorted by flow):\n");
        out.push_str(&format!("{:>6} {:>14} {:>14}\n", "seq", "flow", "value"));
        out.push_str(&format!("{:->6} {:->14} {:->14}\n", "", "", ""));
        for p in &result.normalized_points {
            out.push_str(&format!("{:>6} {:>14.4} {:>14.4}\n", p.sequence, p.flow, p.value));
        }
    }

    out
}

/// Format a list of issues under a heading. Empty lists print nothing.
pub fn format_issues(title: &str, issues: &[Issue]) -> String {
    if issues.is_empty() {
        return String::new();
    }
    let mut out = format!("{title}:\n");
    for issue in issues {
        out.push_str(&format!("- [{}] {}", issue.code.as_str(), issue.message));
        if !issue.indices.is_empty() {
            out.push_str(&format!(" (points {:?})", issue.indices));
        }
        out.push('\n');
    }
    out
}

/// Format a fitted model with its per-point residuals.
pub fn format_fit_summary(
    series_type: SeriesType,
    model: &FitModel,
    residuals: &[PointResidual],
    warnings: &[Issue],
    units: &Units,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {series_type} curve fit ===\n"));
    out.push_str(&format!("Model: {} (coeffs highest degree first)\n", model.model_type()));
    out.push_str(&format!("- coeffs: {}\n", fmt_vec(&model.coeffs)));
    out.push_str(&format!(
        "- quality: R²={} RMSE={:.4} n={}\n",
        fmt_r2(model.quality.r2),
        model.quality.rmse,
        model.quality.n
    ));
    out.push_str(&format!(
        "- data range: [{}, {}] {}\n",
        model.data_range.min_q,
        model.data_range.max_q,
        units.flow.as_deref().unwrap_or("")
    ));
    out.push_str(&format_issues("Warnings", warnings));

    out.push('\n');
    out.push_str(&format!(
        "{:>6} {:>14} {:>14} {:>14} {:>12}\n",
        "seq", "flow", "observed", "fitted", "residual"
    ));
    out.push_str(&format!("{:->6} {:->14} {:->14} {:->14} {:->12}\n", "", "", "", "", ""));
    for r in residuals {
        out.push_str(&format!(
            "{:>6} {:>14.4} {:>14.4} {:>14.4} {:>12.4}\n",
            r.point.sequence, r.point.flow, r.point.value, r.fitted, r.residual
        ));
    }

    out
}

/// One-line summary of a stored series.
pub fn format_series_line(series: &CurveSeries, units: &Units) -> String {
    let unit = units.for_series(series.series_type).unwrap_or("");
    let fit = match (&series.fit_model_type, &series.fit_quality, &series.data_range) {
        (Some(model_type), Some(quality), Some(range)) => format!(
            "{model_type} R²={} range=[{}, {}]",
            fmt_r2(quality.r2),
            range.min_q,
            range.max_q
        ),
        _ => "not fitted".to_string(),
    };
    format!(
        "#{:<4} {:<10} {:>4} pts  {fit}  {unit}",
        series.id,
        series.series_type.as_str(),
        series.points.len()
    )
    .trim_end()
    .to_string()
}

/// Format a curve set with all of its series.
pub fn format_curve_set(set: &CurveSet) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== Curve set #{} '{}' (pump {}) ===\n",
        set.id, set.name, set.pump_id
    ));
    out.push_str(&format!("Units: {}\n", fmt_units(&set.units)));
    if set.series.is_empty() {
        out.push_str("(no series)\n");
    }
    for series in &set.series {
        out.push_str(&format_series_line(series, &set.units));
        out.push('\n');
        for w in &series.validation_warnings {
            out.push_str(&format!("      ! [{}] {}\n", w.code.as_str(), w.message));
        }
    }
    out
}

/// Format duty-point evaluations as a table followed by their warnings.
pub fn format_evaluations(series_type: SeriesType, results: &[EvaluationResult]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>14} {:>14} {:>12} {:>6} {:>7}\n",
        "flow",
        series_type.as_str(),
        "residual",
        "pass",
        "extrap"
    ));
    out.push_str(&format!("{:->14} {:->14} {:->12} {:->6} {:->7}\n", "", "", "", "", ""));

    for r in results {
        let predicted = r
            .predictions
            .get(&series_type)
            .map(|v| format!("{v:.4}"))
            .unwrap_or_default();
        let (residual, pass) = match &r.residuals {
            Some(res) => (format!("{:.4}", res.value), if res.pass { "yes" } else { "no" }),
            None => (String::new(), ""),
        };
        let extrap = if r.extrapolation { "yes" } else { "" };
        out.push_str(
            format!("{:>14.4} {predicted:>14} {residual:>12} {pass:>6} {extrap:>7}", r.flow).trim_end(),
        );
        out.push('\n');
    }

    let warnings: Vec<&String> = results.iter().flat_map(|r| r.warnings.iter()).collect();
    if !warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for w in warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }

    out
}

/// Format a sample grid as two columns.
pub fn format_grid(grid: &CurveGrid) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>14} {:>14}\n", "flow", "value"));
    for (q, v) in grid.flow.iter().zip(grid.value.iter()) {
        out.push_str(&format!("{q:>14.4} {v:>14.4}\n"));
    }
    out
}

fn fmt_units(units: &Units) -> String {
    let parts: Vec<String> = [
        ("flow", &units.flow),
        ("head", &units.head),
        ("efficiency", &units.efficiency),
        ("power", &units.power),
    ]
    .into_iter()
    .filter_map(|(name, unit)| unit.as_ref().map(|u| format!("{name}={u}")))
    .collect();
    if parts.is_empty() {
        "(none)".to_string()
    } else {
        parts.join(", ")
    }
}

fn fmt_r2(r2: Option<f64>) -> String {
    match r2 {
        Some(v) => format!("{v:.4}"),
        None => "undefined".to_string(),
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6e}")).collect();
    format!("[{}]", parts.join(", "))
}
