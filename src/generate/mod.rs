//! Endpoint measurement generation.
//!
//! For every explored round trip the generator resolves the hop's hostname
//! and probes each resolved address with the sequence matching the round
//! trip's protocol:
//!
//! | protocol        | stages                              |
//! |-----------------|-------------------------------------|
//! | `http`          | TCP connect, HTTP                   |
//! | `https`         | TCP connect, TLS handshake, HTTP    |
//! | `h3`, `h3-29`   | QUIC handshake, HTTP/3              |
//!
//! Round trips with any other protocol are skipped.

mod endpoint;

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use log::{debug, warn};
use strum_macros::{AsRefStr, Display, EnumString};
use tokio_util::sync::CancellationToken;

use crate::error_handling::GenerateError;
use crate::measure::MeasureConfig;
use crate::models::{DnsMeasurement, EndpointMeasurement, RoundTrip, UrlMeasurement};
use crate::probe::{dns_lookup, ProbeConfig};

/// Protocols the generator knows how to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum Protocol {
    /// Plain HTTP over TCP
    #[strum(serialize = "http")]
    Http,
    /// HTTP over TLS
    #[strum(serialize = "https")]
    Https,
    /// HTTP/3 over QUIC v1
    #[strum(serialize = "h3")]
    H3,
    /// HTTP/3 over QUIC draft 29
    #[strum(serialize = "h3-29")]
    H3Draft29,
}

impl Protocol {
    /// Port used when the URL does not carry one.
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https | Protocol::H3 | Protocol::H3Draft29 => 443,
        }
    }
}

/// Endpoints the client reported connecting to for the submitted URL.
#[derive(Debug, Clone, Default)]
pub struct ClientEndpoints {
    /// Hostname of the submitted URL.
    pub domain: String,
    /// Literal `ip:port` pairs from the request's `tcp_connect` list.
    pub addrs: Vec<SocketAddr>,
}

impl ClientEndpoints {
    /// Parses the client's `tcp_connect` entries, ignoring anything that is not
    /// a literal `ip:port`.
    pub fn from_tcp_connect(domain: &str, entries: &[String]) -> Self {
        let addrs = entries
            .iter()
            .filter_map(|entry| match entry.parse::<SocketAddr>() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    debug!("ignoring tcp_connect entry {entry:?}");
                    None
                }
            })
            .collect();
        Self {
            domain: domain.to_string(),
            addrs,
        }
    }

    /// Appends the client's addresses for `domain:port` to `resolved`,
    /// skipping duplicates.
    fn merge_into(&self, domain: &str, port: u16, resolved: &mut Vec<IpAddr>) {
        if !self.domain.eq_ignore_ascii_case(domain) {
            return;
        }
        for addr in self.addrs.iter().filter(|addr| addr.port() == port) {
            if !resolved.contains(&addr.ip()) {
                resolved.push(addr.ip());
            }
        }
    }
}

/// Turns round trips into URL measurements.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Measures every endpoint of every round trip, in order.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] carrying the measurements completed so far
    /// when a hop's hostname does not resolve.
    async fn generate(
        &self,
        round_trips: &[RoundTrip],
        client: &ClientEndpoints,
        cancel: &CancellationToken,
    ) -> Result<Vec<UrlMeasurement>, GenerateError>;
}

/// Generator running the real network probes, one endpoint at a time.
pub struct DefaultGenerator {
    probe: ProbeConfig,
}

impl DefaultGenerator {
    /// Creates a generator using the measurement's probe settings.
    pub fn new(config: &MeasureConfig) -> Self {
        Self {
            probe: config.probe.clone(),
        }
    }
}

#[async_trait]
impl Generator for DefaultGenerator {
    async fn generate(
        &self,
        round_trips: &[RoundTrip],
        client: &ClientEndpoints,
        cancel: &CancellationToken,
    ) -> Result<Vec<UrlMeasurement>, GenerateError> {
        let mut measurements = Vec::with_capacity(round_trips.len());
        for rt in round_trips {
            let url = &rt.request.url;
            let domain = host_of(rt);
            let addrs = match dns_lookup(&self.probe, &domain, cancel).await {
                Ok(addrs) => addrs,
                Err(source) => {
                    warn!("generate: cannot resolve {domain}: {source}");
                    return Err(GenerateError {
                        domain,
                        measurements,
                        source,
                    });
                }
            };
            let dns = DnsMeasurement {
                domain: domain.clone(),
                addrs: addrs.clone(),
                failure: None,
            };

            let endpoints = match rt.protocol.parse::<Protocol>() {
                Ok(protocol) => {
                    let port = url.port().unwrap_or_else(|| protocol.default_port());
                    let mut targets = addrs;
                    client.merge_into(&domain, port, &mut targets);
                    let mut endpoints = Vec::with_capacity(targets.len());
                    for ip in targets {
                        let addr = SocketAddr::new(ip, port);
                        endpoints.push(self.measure_endpoint(protocol, addr, &domain, rt, cancel).await);
                    }
                    endpoints
                }
                Err(_) => {
                    debug!("generate: skipping {url} with unknown protocol {:?}", rt.protocol);
                    Vec::new()
                }
            };

            measurements.push(UrlMeasurement {
                url: url.to_string(),
                dns,
                round_trip: rt.clone(),
                endpoints,
            });
        }
        Ok(measurements)
    }
}

impl DefaultGenerator {
    async fn measure_endpoint(
        &self,
        protocol: Protocol,
        addr: SocketAddr,
        sni: &str,
        rt: &RoundTrip,
        cancel: &CancellationToken,
    ) -> EndpointMeasurement {
        match protocol {
            Protocol::Http => {
                EndpointMeasurement::Http(endpoint::http_endpoint(&self.probe, addr, rt, cancel).await)
            }
            Protocol::Https => EndpointMeasurement::Https(
                endpoint::https_endpoint(&self.probe, addr, sni, rt, cancel).await,
            ),
            Protocol::H3 | Protocol::H3Draft29 => EndpointMeasurement::H3(
                endpoint::h3_endpoint(&self.probe, addr, sni, rt, cancel).await,
            ),
        }
    }
}

/// The hop's hostname, without IPv6 brackets.
fn host_of(rt: &RoundTrip) -> String {
    rt.request
        .url
        .host_str()
        .unwrap_or_default()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string()
}
