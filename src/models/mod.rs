//! Fitted curve models.
//!
//! Models are evaluated by small, pure functions so that the evaluator, exports
//! and reports share one implementation.

pub mod model;

pub use model::*;
