//! Reporting utilities: per-point residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{CurvePoint, FitModel};
use crate::error::CurveError;
use crate::models::predict;

/// A measured point next to the fitted curve value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointResidual {
    pub point: CurvePoint,
    pub fitted: f64,
    /// `observed - fitted`.
    pub residual: f64,
}

/// Compute fitted values and residuals for each point.
pub fn compute_residuals(points: &[CurvePoint], model: &FitModel) -> Result<Vec<PointResidual>, CurveError> {
    let mut out = Vec::with_capacity(points.len());
    for p in points {
        let fitted = predict(model, p.flow);
        if !fitted.is_finite() {
            return Err(CurveError::InvalidModel(format!(
                "non-finite prediction at flow {}",
                p.flow
            )));
        }
        out.push(PointResidual {
            point: *p,
            fitted,
            residual: p.value - fitted,
        });
    }
    Ok(out)
}
