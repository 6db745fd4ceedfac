//! Protocol probes.
//!
//! Stateless, single-shot network operations: DNS lookup, TCP connect, TLS
//! handshake, QUIC handshake and one HTTP round trip over an already
//! established connection. Every probe runs under its stage timeout and the
//! measurement's cancellation token, and returns failures as classified
//! [`ErrWrapper`](crate::classify::ErrWrapper)s.

mod dns;
mod http;
mod quic;
mod tcp;
mod tls;

use std::sync::Arc;
use std::time::Duration;

use rustls::RootCertStore;

use crate::config::{
    DNS_TIMEOUT_SECS, HTTP_ROUND_TRIP_TIMEOUT_SECS, MAX_ACCEPTABLE_BODY_SIZE,
    QUIC_HANDSHAKE_TIMEOUT_SECS, TCP_CONNECT_TIMEOUT_SECS, TLS_HANDSHAKE_TIMEOUT_SECS,
};

pub use dns::{dns_lookup, Resolver};
pub use http::{h3_round_trip, http_round_trip, HttpProbeResponse};
pub use quic::{quic_handshake, QuicSession, QUIC_VERSION_DRAFT_29};
pub use tcp::tcp_connect;
pub use tls::{client_tls_config, tls_handshake, HTTPS_ALPN};

/// Per-stage timeouts.
#[derive(Debug, Clone, Copy)]
pub struct ProbeTimeouts {
    /// One DNS lookup
    pub dns: Duration,
    /// One TCP connect
    pub tcp_connect: Duration,
    /// One TLS handshake
    pub tls_handshake: Duration,
    /// One QUIC handshake
    pub quic_handshake: Duration,
    /// Request, response headers and body
    pub http_round_trip: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            dns: Duration::from_secs(DNS_TIMEOUT_SECS),
            tcp_connect: Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS),
            tls_handshake: Duration::from_secs(TLS_HANDSHAKE_TIMEOUT_SECS),
            quic_handshake: Duration::from_secs(QUIC_HANDSHAKE_TIMEOUT_SECS),
            http_round_trip: Duration::from_secs(HTTP_ROUND_TRIP_TIMEOUT_SECS),
        }
    }
}

/// Shared settings for every probe of a measurement.
#[derive(Clone)]
pub struct ProbeConfig {
    /// Resolver used for every DNS lookup
    pub resolver: Arc<dyn Resolver>,
    /// Trust anchors for TLS and QUIC handshakes
    pub root_store: Arc<RootCertStore>,
    /// Per-stage timeouts
    pub timeouts: ProbeTimeouts,
    /// Ceiling for every response body read
    pub max_body_size: usize,
}

impl ProbeConfig {
    /// Builds a probe configuration with the Mozilla root store and default timeouts.
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self {
            resolver,
            root_store: Arc::new(root_store),
            timeouts: ProbeTimeouts::default(),
            max_body_size: MAX_ACCEPTABLE_BODY_SIZE,
        }
    }
}
