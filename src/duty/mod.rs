//! Duty point evaluation against fitted series.

pub mod evaluator;

pub use evaluator::*;
