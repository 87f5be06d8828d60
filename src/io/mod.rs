//! Input/output helpers.
//!
//! - point ingest + normalization (`ingest`)
//! - series JSON read/write (`curve`)
//! - store file load/save (`store`)

pub mod curve;
pub mod ingest;
pub mod store;

pub use curve::*;
pub use ingest::*;
pub use store::*;
