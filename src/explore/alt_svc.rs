//! `Alt-Svc` header parsing (RFC 7838).
//!
//! ```text
//! Alt-Svc: clear
//! Alt-Svc: <protocol-id>=<alt-authority>; ma=<max-age>
//! Alt-Svc: h3=":443"; ma=86400, h3-29=":443"; ma=86400
//! ```

/// HTTP/3 ALPN tokens the helper can measure, in order of preference.
pub const SUPPORTED_H3_ALPN: &[&str] = &["h3", "h3-29"];

/// One alternative service advertised by a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltSvcEntry {
    /// ALPN protocol id, e.g. `h3`.
    pub protocol: String,
    /// Alternative host; `None` means the origin's host.
    pub host: Option<String>,
    /// Alternative port.
    pub port: u16,
}

/// Parses every well-formed entry of an `Alt-Svc` header value.
///
/// `clear` and malformed entries are skipped.
pub fn parse_alt_svc(value: &str) -> Vec<AltSvcEntry> {
    value.split(',').filter_map(parse_entry).collect()
}

/// Returns the first advertised HTTP/3 entry the helper supports.
pub fn find_h3(value: &str) -> Option<AltSvcEntry> {
    parse_alt_svc(value)
        .into_iter()
        .find(|entry| SUPPORTED_H3_ALPN.contains(&entry.protocol.as_str()))
}

fn parse_entry(entry: &str) -> Option<AltSvcEntry> {
    let service = entry.split(';').next()?.trim();
    let (protocol, authority) = service.split_once('=')?;
    let protocol = protocol.trim();
    let authority = authority.trim().trim_matches('"');
    let (host, port) = authority.rsplit_once(':')?;
    if protocol.is_empty() {
        return None;
    }
    let port = port.parse::<u16>().ok().filter(|p| *p != 0)?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    Some(AltSvcEntry {
        protocol: protocol.to_string(),
        host: (!host.is_empty()).then(|| host.to_string()),
        port,
    })
}
