//! Least squares solver.
//!
//! The fitter solves small, tall regression problems:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - SVD, because the design matrix is tall (more rows than columns) and
//!   nalgebra's `QR::solve` is intended for square systems.
//! - A rank check before solving. A rank-deficient system has infinitely many
//!   minimizers; SVD would happily return the minimum-norm one, which for a
//!   curve fit is nonsense. We report failure instead.

use nalgebra::{DMatrix, DVector};

/// Singular values below `max_sv * RANK_RTOL` count as zero.
const RANK_RTOL: f64 = 1e-10;

/// Solve a full-column-rank least squares problem using SVD.
///
/// Returns `None` if the design matrix is rank deficient (singular normal
/// equations) or the solution is not finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let cols = x.ncols();
    if cols == 0 || x.nrows() < cols || y.len() != x.nrows() {
        return None;
    }

    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    if !(max_sv.is_finite() && max_sv > 0.0) {
        return None;
    }

    let eps = max_sv * RANK_RTOL;
    if svd.rank(eps) < cols {
        return None;
    }

    let beta = svd.solve(y, eps).ok()?;
    if beta.iter().all(|v| v.is_finite()) {
        Some(beta)
    } else {
        None
    }
}
