//! `pump-curves` library crate.
//!
//! The binary (`pumpcurve`) is a thin wrapper around this library so that:
//!
//! - validation, fitting and evaluation are testable without spawning processes
//! - the engine can be embedded behind other front ends (HTTP, batch jobs)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod duty;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod report;
pub mod store;
pub mod validate;
