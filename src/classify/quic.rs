//! QUIC failure rules (quinn connection errors).

use std::error::Error;

use quinn::{ConnectError, ConnectionError, TransportErrorCode};
use rustls::AlertDescription;

use super::failure::*;
use super::tls;

/// Range of QUIC transport codes that carry a TLS alert (RFC 9001 §4.8).
const CRYPTO_ERROR_RANGE: std::ops::Range<u64> = 0x100..0x200;

/// Maps a quinn error to a failure string.
pub(super) fn quic_failure(err: &(dyn Error + 'static)) -> Option<&'static str> {
    if let Some(conn) = err.downcast_ref::<ConnectionError>() {
        return connection_failure(conn);
    }
    if let Some(ConnectError::UnsupportedVersion) = err.downcast_ref::<ConnectError>() {
        return Some(FAILURE_QUIC_INCOMPATIBLE_VERSION);
    }
    None
}

fn connection_failure(err: &ConnectionError) -> Option<&'static str> {
    match err {
        ConnectionError::VersionMismatch => Some(FAILURE_QUIC_INCOMPATIBLE_VERSION),
        ConnectionError::Reset => Some(FAILURE_CONNECTION_RESET),
        ConnectionError::TimedOut => Some(FAILURE_GENERIC_TIMEOUT_ERROR),
        ConnectionError::TransportError(e) => transport_failure(e.code, &e.reason),
        ConnectionError::ConnectionClosed(close) => {
            transport_failure(close.error_code, &String::from_utf8_lossy(&close.reason))
        }
        _ => None,
    }
}

fn transport_failure(code: TransportErrorCode, reason: &str) -> Option<&'static str> {
    if code == TransportErrorCode::CONNECTION_REFUSED {
        return Some(FAILURE_CONNECTION_REFUSED);
    }
    let raw = u64::from(code);
    if !CRYPTO_ERROR_RANGE.contains(&raw) {
        return None;
    }
    tls::reason_failure(reason)
        .or_else(|| tls::alert_failure(AlertDescription::from((raw & 0xff) as u8)))
}
