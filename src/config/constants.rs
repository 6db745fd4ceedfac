//! Configuration constants.
//!
//! This module defines all configuration constants used throughout the helper,
//! including timeouts, size limits, and the API surface defaults.

// Network operation timeouts
/// DNS lookup timeout in seconds
pub const DNS_TIMEOUT_SECS: u64 = 4;
/// TCP connection timeout in seconds
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// TLS handshake timeout in seconds
pub const TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 10;
/// QUIC handshake timeout in seconds
pub const QUIC_HANDSHAKE_TIMEOUT_SECS: u64 = 10;
/// Timeout for a single HTTP round trip (request, response headers and body) in seconds
pub const HTTP_ROUND_TRIP_TIMEOUT_SECS: u64 = 15;
/// Upper bound for a whole measurement request in seconds
///
/// Explore and Generate together must finish within this window, otherwise the
/// measurement is cancelled and the client receives `400 Bad Request`.
pub const MEASURE_TIMEOUT_SECS: u64 = 60;

// Size limits
/// Maximum accepted request body and maximum response body read by probes (16 MiB)
pub const MAX_ACCEPTABLE_BODY_SIZE: usize = 1 << 24;

/// Maximum number of redirects followed while exploring a URL.
pub const MAX_REDIRECT_HOPS: usize = 10;

// API defaults
/// Default listen address for the helper API
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
/// Path of the measurement endpoint
pub const WEBSTEPS_API_PATH: &str = "/api/v1/websteps";
/// Product token sent in the `Server` response header
pub const SERVER_PRODUCT: &str = "websteps-helper";

/// Default User-Agent used when the client did not submit one.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Returns the value of the `Server` header emitted by the API.
pub fn server_header_value() -> String {
    format!("{}/{}", SERVER_PRODUCT, env!("CARGO_PKG_VERSION"))
}
