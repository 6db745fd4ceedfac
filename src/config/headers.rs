//! HTTP header name constants.
//!
//! Only a small set of client headers is honored when re-measuring a URL.
//! Everything else submitted by the client is dropped.

/// User-Agent header
pub const HEADER_USER_AGENT: &str = "User-Agent";
/// Accept header
pub const HEADER_ACCEPT: &str = "Accept";
/// Accept-Language header
pub const HEADER_ACCEPT_LANGUAGE: &str = "Accept-Language";
/// Alt-Svc header (HTTP/3 discovery)
pub const HEADER_ALT_SVC: &str = "Alt-Svc";

/// Client-submitted headers copied onto the measurement requests.
/// Matching is case-insensitive.
pub const HONORED_REQUEST_HEADERS: &[&str] =
    &[HEADER_USER_AGENT, HEADER_ACCEPT, HEADER_ACCEPT_LANGUAGE];

/// Returns true when a client-submitted header must be kept.
pub fn is_honored_header(name: &str) -> bool {
    HONORED_REQUEST_HEADERS
        .iter()
        .any(|honored| honored.eq_ignore_ascii_case(name))
}
