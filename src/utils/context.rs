//! Cancellation and deadline plumbing shared by every probe.
//!
//! A single [`CancellationToken`] is threaded through a measurement. Each
//! network call is raced against that token and against its own stage
//! timeout, so a cancelled or expired measurement never hangs.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Boxed error type used at the probe seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Reason a call was abandoned before it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelError {
    /// The measurement was cancelled (client went away, server shutting down).
    #[error("context canceled")]
    Canceled,
    /// The stage timeout elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Runs `fut` until it completes, `timeout` elapses, or `cancel` fires.
///
/// # Arguments
///
/// * `cancel` - Measurement-wide cancellation token
/// * `timeout` - Stage timeout
/// * `fut` - The network operation
///
/// # Errors
///
/// Returns the operation's own error boxed, or a boxed [`CancelError`] when the
/// call was abandoned.
pub async fn with_deadline<T, E, F>(
    cancel: &CancellationToken,
    timeout: Duration,
    fut: F,
) -> Result<T, BoxError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CancelError::Canceled.into()),
        result = tokio::time::timeout(timeout, fut) => match result {
            Ok(inner) => inner.map_err(Into::into),
            Err(_) => Err(CancelError::DeadlineExceeded.into()),
        },
    }
}
