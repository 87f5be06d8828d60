//! Error types.
//!
//! - `CurveError` is what the engine returns (validation, fitting, evaluation,
//!   store lookups). Each variant is one class of failure so callers can react
//!   to "bad input" differently from "series not fitted yet".
//! - `AppError` is the binary's error: a message plus a process exit code.

use crate::domain::{Issue, SeriesType};

/// Errors produced by the curve engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CurveError {
    /// The submitted points failed validation. Nothing was fitted or persisted.
    #[error("Point set rejected: {}", summarize_issues(.issues))]
    Rejected { issues: Vec<Issue> },

    /// The design matrix is singular after degree reduction.
    #[error("Degenerate series: {distinct} distinct flow value(s) among {n} point(s) cannot support a degree-{degree} fit")]
    DegenerateSeries { n: usize, distinct: usize, degree: usize },

    /// Evaluation requested on a series that carries no fitted model.
    #[error("Series '{series_type}' has no fitted model")]
    NotFitted { series_type: SeriesType },

    /// A stored model whose type string and coefficients disagree.
    #[error("Invalid stored model: {0}")]
    InvalidModel(String),

    /// A caller-supplied argument outside the accepted domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown curve set / series id at the persistence boundary.
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: u64 },
}

impl CurveError {
    /// Exit code used by the binary for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            CurveError::InvalidArgument(_) => 2,
            CurveError::Rejected { .. } => 3,
            CurveError::DegenerateSeries { .. } => 4,
            CurveError::NotFitted { .. } | CurveError::InvalidModel(_) => 5,
            CurveError::NotFound { .. } => 6,
        }
    }
}

fn summarize_issues(issues: &[Issue]) -> String {
    let parts: Vec<String> = issues
        .iter()
        .map(|i| format!("[{}] {}", i.code.as_str(), i.message))
        .collect();
    parts.join("; ")
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<CurveError> for AppError {
    fn from(err: CurveError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
