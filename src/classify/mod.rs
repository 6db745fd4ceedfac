//! Failure classification.
//!
//! Maps raw transport, TLS, QUIC and DNS errors onto the fixed failure
//! taxonomy in [`failure`], and tags each classified error with the protocol
//! phase ([`Operation`]) it happened in.
//!
//! Classification is a prioritized rule chain, first match wins:
//! 1. an [`ErrWrapper`] anywhere in the error chain is reused verbatim
//! 2. OS socket error codes
//! 3. cancellation and deadlines
//! 4. well-known error text (EOF, timeouts, "no such host")
//! 5. TLS certificate errors and TLS alerts carried by QUIC
//! 6. QUIC transport errors
//! 7. `unknown_failure: <message>` with IP addresses scrubbed
//!
//! Probes use the stage-specific classifiers (`classify_resolver_error`,
//! `classify_tls_handshake_error`, `classify_quic_handshake_error`); [`classify`]
//! runs every rule and is used when an error escapes a measurement stage.

mod dns;
pub mod failure;
mod operation;
mod quic;
mod tls;

use std::error::Error;
use std::fmt;
use std::io;

pub use dns::DnsError;
pub use operation::Operation;

use crate::utils::sanitize::scrub_error_message;
use crate::utils::{BoxError, CancelError};
use failure::*;

/// Signature shared by every classifier.
pub type Classifier = fn(&(dyn Error + 'static)) -> String;

/// A classified error: failure string, phase tag and the underlying cause.
///
/// `Display` prints the failure string, so wrapping an already-classified
/// error never changes its classification.
#[derive(Debug)]
pub struct ErrWrapper {
    failure: String,
    operation: Operation,
    source: BoxError,
}

impl ErrWrapper {
    /// Classifies `err` with `classifier` and tags it with `operation`.
    ///
    /// If `err` already contains a classified error, its failure string is
    /// kept and the operation tag is resolved with [`resolve_operation`].
    pub fn new(err: impl Into<BoxError>, operation: Operation, classifier: Classifier) -> Self {
        let source = err.into();
        let failure = classifier(source.as_ref());
        let operation = resolve_operation(source.as_ref(), operation);
        Self {
            failure,
            operation,
            source,
        }
    }

    /// The failure string (a taxonomy member or `unknown_failure: ...`).
    pub fn failure(&self) -> &str {
        &self.failure
    }

    /// The protocol phase this error is attributed to.
    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl fmt::Display for ErrWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.failure)
    }
}

impl Error for ErrWrapper {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Iterates over `err` and its causes.
///
/// `io::Error` hides a custom inner error from `source()`, so the walk also
/// descends through `io::Error::get_ref`.
fn error_chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    let mut next = Some(err);
    std::iter::from_fn(move || {
        let current = next?;
        next = match current.downcast_ref::<io::Error>().and_then(|e| e.get_ref()) {
            Some(inner) => Some(inner as &(dyn Error + 'static)),
            None => current.source(),
        };
        Some(current)
    })
}

fn find_wrapper<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a ErrWrapper> {
    error_chain(err).find_map(|e| e.downcast_ref::<ErrWrapper>())
}

/// Decides the operation tag for a new classification of `err`.
///
/// The new wrapper keeps `operation` unless the nearest classified error in the
/// chain names a major phase while `operation` does not: a write failing during
/// a TLS handshake is reported as `tls_handshake`, not `write`. "Not major"
/// includes `unknown` and `top_level`, so a major child also replaces those.
pub fn resolve_operation(err: &(dyn Error + 'static), operation: Operation) -> Operation {
    let operation = operation.normalized();
    match find_wrapper(err) {
        Some(child) if child.operation().is_major() && !operation.is_major() => {
            child.operation().normalized()
        }
        _ => operation,
    }
}

/// Classifies any error by running every rule in priority order.
pub fn classify(err: &(dyn Error + 'static)) -> String {
    if let Some(wrapper) = find_wrapper(err) {
        return wrapper.failure().to_string();
    }
    let failure = syscall_failure(err)
        .or_else(|| cancel_failure(err))
        .or_else(|| text_failure(err))
        .or_else(|| error_chain(err).find_map(specific_failure));
    match failure {
        Some(failure) => failure.to_string(),
        None => unknown_failure(err),
    }
}

/// Classifies an error from a generic network operation (connect, read, write).
pub fn classify_generic_error(err: &(dyn Error + 'static)) -> String {
    if let Some(wrapper) = find_wrapper(err) {
        return wrapper.failure().to_string();
    }
    let failure = syscall_failure(err)
        .or_else(|| cancel_failure(err))
        .or_else(|| text_failure(err));
    match failure {
        Some(failure) => failure.to_string(),
        None => unknown_failure(err),
    }
}

/// Classifies an error from a DNS lookup.
pub fn classify_resolver_error(err: &(dyn Error + 'static)) -> String {
    if let Some(wrapper) = find_wrapper(err) {
        return wrapper.failure().to_string();
    }
    match error_chain(err).find_map(dns_failure) {
        Some(failure) => failure.to_string(),
        None => classify_generic_error(err),
    }
}

/// Classifies an error from a TLS handshake.
pub fn classify_tls_handshake_error(err: &(dyn Error + 'static)) -> String {
    if let Some(wrapper) = find_wrapper(err) {
        return wrapper.failure().to_string();
    }
    match error_chain(err).find_map(|e| e.downcast_ref::<rustls::Error>().and_then(tls::rustls_failure)) {
        Some(failure) => failure.to_string(),
        None => classify_generic_error(err),
    }
}

/// Classifies an error from a QUIC handshake.
pub fn classify_quic_handshake_error(err: &(dyn Error + 'static)) -> String {
    if let Some(wrapper) = find_wrapper(err) {
        return wrapper.failure().to_string();
    }
    match error_chain(err).find_map(quic::quic_failure) {
        Some(failure) => failure.to_string(),
        None => classify_generic_error(err),
    }
}

fn syscall_failure(err: &(dyn Error + 'static)) -> Option<&'static str> {
    error_chain(err)
        .filter_map(|e| e.downcast_ref::<io::Error>())
        .find_map(io_failure)
}

fn io_failure(err: &io::Error) -> Option<&'static str> {
    if err.raw_os_error().is_some_and(is_ecanceled) {
        return Some(FAILURE_INTERRUPTED);
    }
    match err.kind() {
        io::ErrorKind::ConnectionRefused => Some(FAILURE_CONNECTION_REFUSED),
        io::ErrorKind::ConnectionReset => Some(FAILURE_CONNECTION_RESET),
        io::ErrorKind::ConnectionAborted => Some(FAILURE_CONNECTION_ABORTED),
        io::ErrorKind::HostUnreachable => Some(FAILURE_HOST_UNREACHABLE),
        io::ErrorKind::NetworkUnreachable => Some(FAILURE_NETWORK_UNREACHABLE),
        io::ErrorKind::TimedOut => Some(FAILURE_GENERIC_TIMEOUT_ERROR),
        io::ErrorKind::UnexpectedEof => Some(FAILURE_EOF_ERROR),
        _ => None,
    }
}

fn is_ecanceled(code: i32) -> bool {
    if cfg!(target_os = "linux") {
        code == 125
    } else if cfg!(windows) {
        code == 10103 // WSAECANCELLED
    } else {
        code == 89
    }
}

fn cancel_failure(err: &(dyn Error + 'static)) -> Option<&'static str> {
    error_chain(err).find_map(|e| {
        if let Some(cancel) = e.downcast_ref::<CancelError>() {
            return Some(match cancel {
                CancelError::Canceled => FAILURE_INTERRUPTED,
                CancelError::DeadlineExceeded => FAILURE_GENERIC_TIMEOUT_ERROR,
            });
        }
        if e.is::<tokio::time::error::Elapsed>() {
            return Some(FAILURE_GENERIC_TIMEOUT_ERROR);
        }
        None
    })
}

const TEXT_RULES: &[(&str, &str)] = &[
    ("operation was canceled", FAILURE_INTERRUPTED),
    ("operation canceled", FAILURE_INTERRUPTED),
    ("EOF", FAILURE_EOF_ERROR),
    ("unexpected end of file", FAILURE_EOF_ERROR),
    ("connection closed before message completed", FAILURE_EOF_ERROR),
    ("context deadline exceeded", FAILURE_GENERIC_TIMEOUT_ERROR),
    ("transaction is timed out", FAILURE_GENERIC_TIMEOUT_ERROR),
    ("i/o timeout", FAILURE_GENERIC_TIMEOUT_ERROR),
    ("handshake timeout", FAILURE_GENERIC_TIMEOUT_ERROR),
    ("timed out", FAILURE_GENERIC_TIMEOUT_ERROR),
    ("deadline has elapsed", FAILURE_GENERIC_TIMEOUT_ERROR),
    ("no such host", FAILURE_DNS_NXDOMAIN_ERROR),
    ("use of closed network connection", FAILURE_CONNECTION_ALREADY_CLOSED),
];

fn text_failure(err: &(dyn Error + 'static)) -> Option<&'static str> {
    error_chain(err).find_map(|e| {
        let text = e.to_string();
        let text = text.trim_end();
        TEXT_RULES
            .iter()
            .find(|(suffix, _)| text.ends_with(suffix))
            .map(|(_, failure)| *failure)
    })
}

fn dns_failure(err: &(dyn Error + 'static)) -> Option<&'static str> {
    if let Some(dns) = err.downcast_ref::<DnsError>() {
        return Some(dns::dns_error_failure(dns));
    }
    err.downcast_ref::<hickory_resolver::error::ResolveError>()
        .and_then(dns::resolve_failure)
}

fn specific_failure(err: &(dyn Error + 'static)) -> Option<&'static str> {
    err.downcast_ref::<rustls::Error>()
        .and_then(tls::rustls_failure)
        .or_else(|| quic::quic_failure(err))
        .or_else(|| dns_failure(err))
}

/// Builds the fallback failure from the full error chain, with addresses scrubbed.
fn unknown_failure(err: &(dyn Error + 'static)) -> String {
    let mut message = String::new();
    for cause in error_chain(err) {
        let text = cause.to_string();
        if text.is_empty() || message.ends_with(&text) {
            continue;
        }
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&text);
    }
    format!("{}{}", UNKNOWN_FAILURE_PREFIX, scrub_error_message(&message))
}
