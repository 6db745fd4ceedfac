//! Shared utilities.
//!
//! This module provides:
//! - Deadline and cancellation racing for network calls
//! - The bounded, cancellable body reader
//! - Error message sanitization

mod context;
mod read;
pub mod sanitize;

pub use context::{with_deadline, BoxError, CancelError};
pub use read::{read_all_context, ReadError};
