//! Fitted polynomial evaluation.
//!
//! This is the only place curve values are computed from stored coefficients.
//! The evaluator, the sample grid used for plotting/exports, and residual
//! reporting all go through [`predict`].

use crate::domain::{CurveGrid, CurveSeries, FitModel};
use crate::error::CurveError;
use crate::math::horner;

/// Default number of samples for a plotted curve.
pub const DEFAULT_SAMPLES: usize = 51;

/// Predict the curve value at `flow`.
pub fn predict(model: &FitModel, flow: f64) -> f64 {
    horner(&model.coeffs, flow)
}

/// Sample `n` evenly spaced points across the model's data range.
///
/// `n` is clamped to at least 2. A zero-width range yields `n` copies of the
/// single flow.
pub fn sample_model(model: &FitModel, n: usize) -> CurveGrid {
    let n = n.max(2);
    let q0 = model.data_range.min_q;
    let q1 = model.data_range.max_q;

    let mut flow = Vec::with_capacity(n);
    let mut value = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        // Pin the last sample to max_q so rounding never leaves the domain.
        let q = if i + 1 == n { q1 } else { q0 + u * (q1 - q0) };
        flow.push(q);
        value.push(predict(model, q));
    }

    CurveGrid { flow, value }
}

/// Sample a persisted series. Errors if the series is not fitted.
pub fn sample_curve(series: &CurveSeries, n: usize) -> Result<CurveGrid, CurveError> {
    let model = series.fit_model()?;
    Ok(sample_model(&model, n))
}
