//! HTTP client initialization.
//!
//! The explorer emulates a browser-like client: it follows redirects itself,
//! so the shared client has redirects disabled and resolves names through the
//! helper's own [`Resolver`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::ClientBuilder;
use rustls::RootCertStore;

use crate::error_handling::InitializationError;
use crate::probe::{client_tls_config, Resolver, HTTPS_ALPN};
use crate::utils::BoxError;

/// Adapts a [`Resolver`] to reqwest's DNS hook.
struct ReqwestResolver(Arc<dyn Resolver>);

impl Resolve for ReqwestResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.0.clone();
        Box::pin(async move {
            let addrs = resolver.lookup_host(name.as_str()).await?;
            // reqwest replaces port 0 with the URL's port
            let addrs: Addrs = Box::new(
                addrs
                    .into_iter()
                    .map(|ip| SocketAddr::new(ip, 0))
                    .collect::<Vec<_>>()
                    .into_iter(),
            );
            Ok::<_, BoxError>(addrs)
        })
    }
}

/// Initializes the HTTP client used to explore redirect chains.
///
/// Creates a `reqwest::Client` with:
/// - Redirects disabled (the chain is followed manually, hop by hop)
/// - No cookie store (cookies are tracked per measurement)
/// - No idle connection pooling, so measurements never share connections
/// - The helper's resolver and root store, offering `h2`/`http/1.1` ALPN
///
/// # Arguments
///
/// * `resolver` - Resolver used for every hostname
/// * `root_store` - Trust anchors for HTTPS
/// * `timeout` - Per-request timeout
///
/// # Errors
///
/// Returns `InitializationError` if the TLS configuration or the client cannot be built.
pub fn init_redirect_client(
    resolver: Arc<dyn Resolver>,
    root_store: Arc<RootCertStore>,
    timeout: Duration,
) -> Result<reqwest::Client, InitializationError> {
    let tls = client_tls_config(root_store, HTTPS_ALPN)?;
    let client = ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .timeout(timeout)
        .dns_resolver(Arc::new(ReqwestResolver(resolver)))
        .use_preconfigured_tls(tls)
        .build()?;
    Ok(client)
}
