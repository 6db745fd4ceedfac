//! DNS failure rules.

use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use thiserror::Error;

use super::failure::*;

/// Errors a [`Resolver`](crate::probe::Resolver) implementation may return
/// when it does not surface a hickory error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsError {
    /// The domain does not exist.
    #[error("no such host")]
    NoSuchHost,
    /// The lookup succeeded but returned no usable address.
    #[error("no answer")]
    NoAnswer,
    /// The resolver detected a bogon address.
    #[error("dns: detected bogon address")]
    Bogon,
}

pub(super) fn dns_error_failure(err: &DnsError) -> &'static str {
    match err {
        DnsError::NoSuchHost => FAILURE_DNS_NXDOMAIN_ERROR,
        DnsError::NoAnswer => FAILURE_DNS_NO_ANSWER,
        DnsError::Bogon => FAILURE_DNS_BOGON_ERROR,
    }
}

/// Maps a hickory resolver error.
pub(super) fn resolve_failure(err: &ResolveError) -> Option<&'static str> {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => Some(match *response_code {
            ResponseCode::NXDomain => FAILURE_DNS_NXDOMAIN_ERROR,
            ResponseCode::ServFail | ResponseCode::Refused => FAILURE_DNS_SERVER_MISBEHAVING,
            _ => FAILURE_DNS_NO_ANSWER,
        }),
        ResolveErrorKind::Timeout => Some(FAILURE_GENERIC_TIMEOUT_ERROR),
        _ => None,
    }
}
