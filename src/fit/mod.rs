//! Curve fitting.
//!
//! Responsibilities:
//!
//! - choose the polynomial degree for a point set
//! - solve the least-squares problem and report fit quality
//! - run validate-then-fit as one all-or-nothing step

pub mod fitter;
pub mod prepare;

pub use fitter::*;
pub use prepare::*;
