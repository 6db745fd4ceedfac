//! DNS lookup probe.

use std::net::IpAddr;

use async_trait::async_trait;
use log::debug;
use tokio_util::sync::CancellationToken;

use super::ProbeConfig;
use crate::classify::{classify_resolver_error, DnsError, ErrWrapper, Operation};
use crate::utils::{with_deadline, BoxError};

/// Hostname resolution used by every probe and by the explorer's HTTP client.
///
/// Implementations must accept IP literals and return them unchanged.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves `domain` to its addresses, in resolver order.
    async fn lookup_host(&self, domain: &str) -> Result<Vec<IpAddr>, BoxError>;
}

/// Resolves `domain`, classifying any failure as a `resolve` error.
///
/// An empty answer is reported as `dns_no_answer`.
///
/// # Errors
///
/// Returns an [`ErrWrapper`] tagged [`Operation::Resolve`].
pub async fn dns_lookup(
    config: &ProbeConfig,
    domain: &str,
    cancel: &CancellationToken,
) -> Result<Vec<IpAddr>, ErrWrapper> {
    debug!("dns lookup {domain}");
    let result = with_deadline(
        cancel,
        config.timeouts.dns,
        config.resolver.lookup_host(domain),
    )
    .await
    .and_then(|addrs| {
        if addrs.is_empty() {
            Err(DnsError::NoAnswer.into())
        } else {
            Ok(addrs)
        }
    });
    match result {
        Ok(addrs) => {
            debug!("dns lookup {domain}: {addrs:?}");
            Ok(addrs)
        }
        Err(e) => {
            let err = ErrWrapper::new(e, Operation::Resolve, classify_resolver_error);
            debug!("dns lookup {domain}: {err}");
            Err(err)
        }
    }
}
