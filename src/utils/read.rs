//! Bounded, cancellable body reads.
//!
//! Every body read (the inbound JSON request and any HTTP response body
//! fetched by a probe) goes through [`read_all_context`].

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::utils::context::{BoxError, CancelError};

/// Errors returned by [`read_all_context`].
#[derive(Error, Debug)]
pub enum ReadError {
    /// Cancellation won the race against the background reader.
    #[error("body read interrupted: {0}")]
    Interrupted(#[from] CancelError),

    /// The body stream itself failed.
    #[error("body read failed: {0}")]
    Body(#[source] BoxError),

    /// The background reader went away without reporting a result.
    #[error("background reader exited without a result")]
    ReaderGone,
}

/// Reads at most `limit` bytes from `stream`, racing the read against `cancel`.
///
/// The read runs as a background task. When cancellation wins, this function
/// returns immediately and the background task keeps running until the stream
/// yields an error or ends; its result is discarded. The caller must close the
/// underlying connection (drop the socket, abort the connection task) to stop a
/// lingering background reader.
///
/// Bodies longer than `limit` are truncated to `limit` bytes, like a limit reader.
///
/// # Arguments
///
/// * `stream` - Body chunks
/// * `limit` - Maximum number of bytes to keep
/// * `cancel` - Measurement-wide cancellation token
///
/// # Errors
///
/// Returns [`ReadError::Interrupted`] when cancelled, [`ReadError::Body`] when the
/// stream fails.
pub async fn read_all_context<S, E>(
    stream: S,
    limit: usize,
    cancel: &CancellationToken,
) -> Result<Bytes, ReadError>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = tx.send(read_limited(stream, limit).await);
    });

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CancelError::Canceled.into()),
        result = rx => result.map_err(|_| ReadError::ReaderGone)?,
    }
}

async fn read_limited<S, E>(stream: S, limit: usize) -> Result<Bytes, ReadError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let mut stream = std::pin::pin!(stream);
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ReadError::Body(e.into()))?;
        let room = limit.saturating_sub(buf.len());
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, io::Error>> {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_reads_whole_body_under_limit() {
        let cancel = CancellationToken::new();
        let body = read_all_context(chunks(&[b"hello ", b"world"]), 1024, &cancel)
            .await
            .expect("read should succeed");
        assert_eq!(&body[..], b"hello world");
    }

    #[tokio::test]
    async fn test_truncates_at_limit() {
        let cancel = CancellationToken::new();
        let body = read_all_context(chunks(&[b"abcd", b"efgh", b"ijkl"]), 6, &cancel)
            .await
            .expect("read should succeed");
        assert_eq!(&body[..], b"abcdef");
    }

    #[tokio::test]
    async fn test_stream_error_is_reported() {
        let cancel = CancellationToken::new();
        let stream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let err = read_all_context(stream, 1024, &cancel)
            .await
            .expect_err("read should fail");
        assert!(matches!(err, ReadError::Body(_)));
    }

    #[tokio::test]
    async fn test_cancellation_wins_over_stalled_reader() {
        let cancel = CancellationToken::new();
        let stalled = futures::stream::pending::<Result<Bytes, io::Error>>();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            canceller.cancel();
        });
        let err = read_all_context(stalled, 1024, &cancel)
            .await
            .expect_err("read should be interrupted");
        assert!(matches!(err, ReadError::Interrupted(CancelError::Canceled)));
    }
}
