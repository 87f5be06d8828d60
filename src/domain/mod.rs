//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - raw and accepted points (`RawField`, `RawPoint`, `CurvePoint`)
//! - validation output (`Issue`, `ValidationResult`)
//! - fitted models and persisted series (`FitModel`, `CurveSeries`, `CurveSet`)
//! - evaluation output and engine configuration

pub mod types;

pub use types::*;
