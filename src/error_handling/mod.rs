//! Error handling.
//!
//! This module provides the error types of every stage of a measurement.
//! Errors that escape a stage are classified with the same taxonomy as the
//! measurement data, so logs and results use one vocabulary.

mod types;

// Re-export public API
pub use types::{CheckError, ExploreError, GenerateError, InitializationError, MeasureError};
