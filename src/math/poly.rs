//! Polynomial primitives.
//!
//! Coefficients are always stored highest degree first:
//! `[a_d, ..., a_1, a_0]` means `a_d x^d + ... + a_1 x + a_0`.
//!
//! Numerical notes:
//! - Flows can be in the thousands, so a raw Vandermonde matrix with `x^3`
//!   columns is badly scaled. The fitter works in `u = x / s` and converts the
//!   coefficients back with [`unscale_coeffs`].

/// Fill a design row `[u^d, ..., u, 1]`.
///
/// # Panics
/// Panics if `out.len() != degree + 1`.
pub fn fill_vandermonde_row(u: f64, degree: usize, out: &mut [f64]) {
    assert_eq!(out.len(), degree + 1, "design row length must be degree + 1");
    let mut power = 1.0;
    for slot in out.iter_mut().rev() {
        *slot = power;
        power *= u;
    }
}

/// Evaluate a polynomial with Horner's scheme.
///
/// An empty coefficient list evaluates to `0.0`.
pub fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Convert coefficients fitted in `u = x / scale` back to coefficients in `x`.
///
/// The coefficient of `u^k` becomes the coefficient of `x^k` divided by `scale^k`.
pub fn unscale_coeffs(coeffs: &[f64], scale: f64) -> Vec<f64> {
    let degree = coeffs.len().saturating_sub(1);
    coeffs
        .iter()
        .enumerate()
        .map(|(i, &c)| c / scale.powi((degree - i) as i32))
        .collect()
}
