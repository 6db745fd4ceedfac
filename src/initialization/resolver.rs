//! DNS resolver initialization.
//!
//! This module provides the hickory-backed [`Resolver`] used by every probe,
//! configured with proper timeouts.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

use crate::probe::Resolver;
use crate::utils::BoxError;

/// [`Resolver`] backed by a hickory `TokioAsyncResolver`.
pub struct HickoryResolver {
    inner: TokioAsyncResolver,
}

impl HickoryResolver {
    /// Wraps an already configured hickory resolver.
    pub fn new(inner: TokioAsyncResolver) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Resolver for HickoryResolver {
    async fn lookup_host(&self, domain: &str) -> Result<Vec<IpAddr>, BoxError> {
        if let Ok(ip) = domain.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        let lookup = self.inner.lookup_ip(domain).await?;
        Ok(lookup.iter().collect())
    }
}

/// Initializes the DNS resolver for hostname lookups.
///
/// Creates a hickory resolver using the default upstream configuration with
/// short per-query timeouts, so slow or unresponsive DNS servers surface as
/// `generic_timeout_error` instead of stalling a measurement.
///
/// # Returns
///
/// A [`Resolver`] wrapped in `Arc` for sharing across requests.
pub fn init_resolver() -> Arc<dyn Resolver> {
    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(crate::config::DNS_TIMEOUT_SECS);
    opts.attempts = 2;
    // Never append search domains to the probed hostname
    opts.ndots = 0;
    // Answers must reflect the network right now, not a previous request
    opts.cache_size = 0;

    Arc::new(HickoryResolver::new(TokioAsyncResolver::tokio(
        ResolverConfig::default(),
        opts,
    )))
}
