//! Polynomial least-squares fitting for a single curve series.
//!
//! Given accepted points `(q_i, y_i)` we solve
//!
//! ```text
//! minimize Σ (y_i - p(q_i))^2,   p(q) = a_d q^d + ... + a_1 q + a_0
//! ```
//!
//! with `d = min(max_degree, n - 1)` so the system is never underdetermined.
//!
//! Numerical notes:
//! - The regression runs in `u = q / max|q|` (columns of comparable size) and
//!   the coefficients are converted back to `q` afterwards.
//! - A rank-deficient design matrix (too few distinct flows for the degree) is
//!   reported as a degenerate series. We never return minimum-norm coefficients.
//! - No randomness anywhere: the same points always give the same bits.

use nalgebra::{DMatrix, DVector};

use crate::domain::{CurvePoint, DataRange, EngineConfig, FitModel, FitQuality, Issue, IssueCode};
use crate::error::CurveError;
use crate::math::{fill_vandermonde_row, horner, solve_least_squares, unscale_coeffs};

/// Sums of squares at or below `ZERO_SS_RTOL * Σ y²` count as zero.
const ZERO_SS_RTOL: f64 = 1e-24;

/// Fitted model plus the fit-time quality warnings.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub model: FitModel,
    pub warnings: Vec<Issue>,
}

/// Degree actually used for `n` points under `max_degree`.
pub fn select_degree(n: usize, max_degree: usize) -> usize {
    max_degree.min(n.saturating_sub(1))
}

/// Fit a polynomial of degree `min(max_degree, n - 1)` to `points`.
///
/// # Panics
/// Panics if `points` is empty. Callers fit only validator-accepted sets.
pub fn fit_polynomial(points: &[CurvePoint], max_degree: usize) -> Result<FitModel, CurveError> {
    assert!(!points.is_empty(), "fit_polynomial requires at least one point");

    if points.iter().any(|p| !(p.flow.is_finite() && p.value.is_finite())) {
        return Err(CurveError::InvalidArgument(
            "cannot fit non-finite flow/value".to_string(),
        ));
    }

    let n = points.len();
    let degree = select_degree(n, max_degree);
    let cols = degree + 1;

    let scale = points.iter().map(|p| p.flow.abs()).fold(0.0, f64::max);
    let scale = if scale > 0.0 { scale } else { 1.0 };

    let mut x = DMatrix::<f64>::zeros(n, cols);
    let mut y = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; cols];
    for (i, p) in points.iter().enumerate() {
        fill_vandermonde_row(p.flow / scale, degree, &mut row);
        for (j, &v) in row.iter().enumerate() {
            x[(i, j)] = v;
        }
        y[i] = p.value;
    }

    let Some(beta) = solve_least_squares(&x, &y) else {
        return Err(CurveError::DegenerateSeries {
            n,
            distinct: count_distinct_flows(points),
            degree,
        });
    };

    let scaled: Vec<f64> = beta.iter().copied().collect();
    let coeffs = unscale_coeffs(&scaled, scale);
    let quality = fit_quality(points, &coeffs);

    // `points` is non-empty, so the range always exists.
    let data_range = DataRange::of_points(points).ok_or_else(|| {
        CurveError::InvalidArgument("cannot derive data range from empty point set".to_string())
    })?;

    Ok(FitModel {
        degree,
        coeffs,
        quality,
        data_range,
    })
}

/// Fit with the configured maximum degree and collect quality warnings.
pub fn fit(points: &[CurvePoint], config: &EngineConfig) -> Result<FitOutcome, CurveError> {
    let model = fit_polynomial(points, config.max_degree)?;
    let warnings = quality_warnings(&model.quality, config.min_r2);

    tracing::debug!(
        n = points.len(),
        degree = model.degree,
        r2 = ?model.quality.r2,
        rmse = model.quality.rmse,
        "fitted polynomial"
    );
    if !warnings.is_empty() {
        tracing::warn!(r2 = ?model.quality.r2, min_r2 = config.min_r2, "fit quality below threshold");
    }

    Ok(FitOutcome { model, warnings })
}

/// R²/RMSE of `coeffs` over `points`.
pub fn fit_quality(points: &[CurvePoint], coeffs: &[f64]) -> FitQuality {
    let n = points.len();
    let mean = points.iter().map(|p| p.value).sum::<f64>() / n as f64;
    let sum_sq = points.iter().map(|p| p.value * p.value).sum::<f64>();
    let zero_tol = ZERO_SS_RTOL * sum_sq.max(1.0);

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for p in points {
        let r = p.value - horner(coeffs, p.flow);
        ss_res += r * r;
        let d = p.value - mean;
        ss_tot += d * d;
    }

    let r2 = if ss_tot <= zero_tol {
        // Constant values: perfect only if the model reproduces them.
        if ss_res <= zero_tol { Some(1.0) } else { None }
    } else {
        Some(1.0 - ss_res / ss_tot)
    };

    FitQuality {
        r2,
        rmse: (ss_res / n as f64).sqrt(),
        n,
    }
}

/// Warnings for an undefined or low R².
pub fn quality_warnings(quality: &FitQuality, min_r2: f64) -> Vec<Issue> {
    match quality.r2 {
        None => vec![Issue::new(
            IssueCode::UndefinedR2,
            "Fit quality is undefined (constant values not reproduced by the model).",
        )],
        Some(r2) if r2 < min_r2 => vec![Issue::new(
            IssueCode::LowR2,
            format!("Fit R² = {r2:.4} is below the acceptance threshold {min_r2}."),
        )],
        Some(_) => Vec::new(),
    }
}

fn count_distinct_flows(points: &[CurvePoint]) -> usize {
    let mut flows: Vec<f64> = points.iter().map(|p| p.flow).collect();
    flows.sort_by(f64::total_cmp);
    flows.dedup();
    flows.len()
}
