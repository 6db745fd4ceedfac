//! Failure taxonomy.
//!
//! The fixed set of failure strings reported inside measurements. These values
//! are a wire contract shared with the probes that consume the helper's
//! output; they must never change spelling.

/// Connection refused by the remote host
pub const FAILURE_CONNECTION_REFUSED: &str = "connection_refused";
/// Connection reset by the remote host (or a QUIC stateless reset)
pub const FAILURE_CONNECTION_RESET: &str = "connection_reset";
/// Connection aborted locally
pub const FAILURE_CONNECTION_ABORTED: &str = "connection_aborted";
/// Use of a connection that was already closed
pub const FAILURE_CONNECTION_ALREADY_CLOSED: &str = "connection_already_closed";
/// No route to host
pub const FAILURE_HOST_UNREACHABLE: &str = "host_unreachable";
/// Network unreachable
pub const FAILURE_NETWORK_UNREACHABLE: &str = "network_unreachable";
/// The resolver returned a bogon address
pub const FAILURE_DNS_BOGON_ERROR: &str = "dns_bogon_error";
/// The domain does not exist
pub const FAILURE_DNS_NXDOMAIN_ERROR: &str = "dns_nxdomain_error";
/// The domain exists but has no records of the requested type
pub const FAILURE_DNS_NO_ANSWER: &str = "dns_no_answer";
/// The DNS server failed or refused to answer
pub const FAILURE_DNS_SERVER_MISBEHAVING: &str = "dns_server_misbehaving";
/// Unexpected end of stream
pub const FAILURE_EOF_ERROR: &str = "eof_error";
/// Any timeout
pub const FAILURE_GENERIC_TIMEOUT_ERROR: &str = "generic_timeout_error";
/// The operation was cancelled
pub const FAILURE_INTERRUPTED: &str = "interrupted";
/// Server and client share no QUIC version
pub const FAILURE_QUIC_INCOMPATIBLE_VERSION: &str = "quic_incompatible_version";
/// TLS parameters could not be negotiated
pub const FAILURE_SSL_FAILED_HANDSHAKE: &str = "ssl_failed_handshake";
/// Certificate is not valid for the requested hostname
pub const FAILURE_SSL_INVALID_HOSTNAME: &str = "ssl_invalid_hostname";
/// Certificate chains to an unknown authority
pub const FAILURE_SSL_UNKNOWN_AUTHORITY: &str = "ssl_unknown_authority";
/// Certificate is expired, revoked, or otherwise invalid
pub const FAILURE_SSL_INVALID_CERTIFICATE: &str = "ssl_invalid_certificate";
/// A JSON document could not be parsed
pub const FAILURE_JSON_PARSE_ERROR: &str = "json_parse_error";

/// Prefix of the fallback failure string.
pub const UNKNOWN_FAILURE_PREFIX: &str = "unknown_failure: ";
