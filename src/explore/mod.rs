//! URL exploration.
//!
//! The explorer fetches a URL the way a browser would, following redirects
//! and keeping cookies, and records one [`RoundTrip`] per hop. When the final
//! HTTPS response advertises HTTP/3 through `Alt-Svc`, the fetch is repeated
//! over QUIC and those hops are appended, tagged with the advertised ALPN.

mod alt_svc;
mod http3;
mod redirects;

use std::time::Duration;

use async_trait::async_trait;
use http::HeaderMap;
use log::{debug, info};
use reqwest::cookie::Jar;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::HEADER_ALT_SVC;
use crate::error_handling::{ExploreError, InitializationError};
use crate::initialization::init_redirect_client;
use crate::measure::MeasureConfig;
use crate::models::RoundTrip;
use crate::probe::ProbeConfig;

pub use alt_svc::{find_h3, parse_alt_svc, AltSvcEntry, SUPPORTED_H3_ALPN};

use redirects::{follow_redirect_chain, ChainSettings};

/// Discovers the round trips implied by a URL.
#[async_trait]
pub trait Explorer: Send + Sync {
    /// Explores `url` sending `headers` on every request.
    ///
    /// # Returns
    ///
    /// The round trips, oldest hop first. HTTP/3 hops, if any, come after the
    /// HTTP ones.
    async fn explore(
        &self,
        url: &Url,
        headers: &HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<Vec<RoundTrip>, ExploreError>;
}

/// Explorer backed by a redirect-less `reqwest` client and the QUIC probes.
pub struct DefaultExplorer {
    client: reqwest::Client,
    probe: ProbeConfig,
    max_redirects: usize,
    enable_quic: bool,
}

impl DefaultExplorer {
    /// Builds an explorer sharing the measurement's resolver and root store.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError` if the HTTP client cannot be built.
    pub fn new(config: &MeasureConfig) -> Result<Self, InitializationError> {
        let probe = config.probe.clone();
        let timeout = request_timeout(&probe);
        let client = init_redirect_client(probe.resolver.clone(), probe.root_store.clone(), timeout)?;
        Ok(Self {
            client,
            probe,
            max_redirects: config.max_redirects,
            enable_quic: config.enable_quic,
        })
    }
}

/// Upper bound for one explorer request: connect, handshake and exchange.
fn request_timeout(probe: &ProbeConfig) -> Duration {
    let t = &probe.timeouts;
    t.dns + t.tcp_connect + t.tls_handshake + t.http_round_trip
}

#[async_trait]
impl Explorer for DefaultExplorer {
    async fn explore(
        &self,
        url: &Url,
        headers: &HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<Vec<RoundTrip>, ExploreError> {
        let jar = Jar::default();
        let settings = ChainSettings {
            client: &self.client,
            max_redirects: self.max_redirects,
            max_body_size: self.probe.max_body_size,
        };
        let chain = follow_redirect_chain(&settings, url, headers, &jar, cancel).await?;
        let mut round_trips = order_round_trips(chain);

        if !self.enable_quic || url.scheme() != "https" {
            return Ok(round_trips);
        }
        let Some(last) = round_trips.last() else {
            return Ok(round_trips);
        };
        let Some(entry) = last
            .response
            .headers
            .get_all(HEADER_ALT_SVC)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(find_h3)
        else {
            return Ok(round_trips);
        };
        let Some(h3_url) = http3::h3_url(&last.request.url, &entry) else {
            debug!("explore: unusable Alt-Svc entry {entry:?}");
            return Ok(round_trips);
        };

        info!("explore: repeating {h3_url} over {}", entry.protocol);
        match http3::follow_h3_chain(
            &self.probe,
            self.max_redirects,
            h3_url.clone(),
            &entry.protocol,
            headers,
            &jar,
            cancel,
        )
        .await
        {
            Ok(h3_chain) => {
                round_trips.extend(order_round_trips(h3_chain));
                Ok(round_trips)
            }
            Err((h3_chain, source)) => {
                round_trips.extend(order_round_trips(h3_chain));
                Err(ExploreError::Http3 {
                    url: h3_url.to_string(),
                    round_trips,
                    source,
                })
            }
        }
    }
}

/// Indexes a chain from its newest hop (index 0 is the final response) and
/// returns it oldest hop first.
///
/// `chain` is in request order.
pub fn order_round_trips(chain: Vec<RoundTrip>) -> Vec<RoundTrip> {
    let len = chain.len();
    let mut indexed: Vec<RoundTrip> = chain
        .into_iter()
        .enumerate()
        .map(|(position, mut rt)| {
            rt.sort_index = len - 1 - position;
            rt
        })
        .collect();
    indexed.sort_by(|a, b| b.sort_index.cmp(&a.sort_index));
    indexed
}
