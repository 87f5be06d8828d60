//! Point set validation.
//!
//! Produces blocking errors, warnings and the flow-sorted point list that the
//! fitter consumes.

pub mod rules;

pub use rules::*;
