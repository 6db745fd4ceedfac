//! Measurement data model.
//!
//! [`RoundTrip`]s are produced by the explorer, one per redirect hop. The
//! generator turns each of them into a [`UrlMeasurement`] holding the DNS
//! result and one [`EndpointMeasurement`] per probed address.
//!
//! [`CtrlRequest`] and [`CtrlResponse`] are the JSON bodies exchanged with
//! probes.
//!
//! Everything here is request-scoped: built fresh for each measurement and
//! dropped once the response is serialized.

use std::collections::BTreeMap;
use std::net::IpAddr;

use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use url::Url;

/// A measurement request as submitted by a probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CtrlRequest {
    /// The URL to measure.
    pub http_request: String,
    /// Request headers the probe used; only a few are honored.
    pub http_request_headers: BTreeMap<String, Vec<String>>,
    /// `ip:port` endpoints the probe connected to.
    pub tcp_connect: Vec<String>,
}

/// The measurement report returned to the probe.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CtrlResponse {
    /// One entry per explored round trip, in exploration order.
    pub urls: Vec<UrlMeasurement>,
}

/// One request/response pair along a redirect chain.
#[derive(Debug, Clone)]
pub struct RoundTrip {
    /// Protocol used to fetch this hop (`http`, `https`, `h3`, `h3-29`).
    pub protocol: String,
    /// The request as sent.
    pub request: RoundTripRequest,
    /// The response received for it.
    pub response: RoundTripResponse,
    /// Position counted back from the newest hop of its chain; 0 is the
    /// final response.
    pub sort_index: usize,
}

/// Request half of a [`RoundTrip`].
#[derive(Debug, Clone)]
pub struct RoundTripRequest {
    /// Always `GET` for explored hops.
    pub method: Method,
    /// The hop's URL.
    pub url: Url,
    /// Headers sent, cookies included.
    pub headers: HeaderMap,
}

/// Response half of a [`RoundTrip`]. The body is never kept.
#[derive(Debug, Clone)]
pub struct RoundTripResponse {
    /// Response status.
    pub status_code: u16,
    /// Response headers, `Location` and `Alt-Svc` included.
    pub headers: HeaderMap,
}

/// Everything measured for a single round trip's URL.
#[derive(Debug, Clone, Serialize)]
pub struct UrlMeasurement {
    /// The hop's URL.
    pub url: String,
    /// Resolution of the hop's hostname.
    pub dns: DnsMeasurement,
    /// The hop this measurement was generated from.
    #[serde(skip)]
    pub round_trip: RoundTrip,
    /// One entry per probed address.
    pub endpoints: Vec<EndpointMeasurement>,
}

/// Outcome of resolving a hop's hostname.
#[derive(Debug, Clone, Serialize)]
pub struct DnsMeasurement {
    /// The hostname looked up.
    pub domain: String,
    /// Addresses found, client-reported ones merged in.
    pub addrs: Vec<IpAddr>,
    /// Lookup failure, if any.
    pub failure: Option<String>,
}

/// Result of a TCP connect.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TcpConnectMeasurement {
    /// Connect failure, if any.
    pub failure: Option<String>,
}

/// Result of a TLS handshake; also used for QUIC handshakes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TlsHandshakeMeasurement {
    /// Handshake failure, if any.
    pub failure: Option<String>,
}

/// A single HTTP round trip performed by a probe.
#[derive(Debug, Clone, Serialize)]
pub struct HttpRoundTripMeasurement {
    /// What was sent.
    pub request: HttpRequestMeasurement,
    /// What came back, or the failure.
    pub response: HttpResponseMeasurement,
}

/// Request half of an [`HttpRoundTripMeasurement`].
#[derive(Debug, Clone, Serialize)]
pub struct HttpRequestMeasurement {
    /// Request method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Request headers, keyed by canonical name.
    pub headers: BTreeMap<String, Vec<String>>,
}

/// Response half of an [`HttpRoundTripMeasurement`].
///
/// On failure only `failure` is set; the other fields keep their zero values.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HttpResponseMeasurement {
    /// Body bytes read, capped at the body ceiling.
    pub body_length: i64,
    /// Round trip failure, if any.
    pub failure: Option<String>,
    /// Response headers, keyed by canonical name.
    pub headers: BTreeMap<String, Vec<String>>,
    /// Response status.
    pub status_code: i64,
}

/// Plain HTTP endpoint: TCP connect, then HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct HttpEndpointMeasurement {
    /// The probed `ip:port`.
    pub endpoint: String,
    /// Protocol tag of the round trip.
    pub protocol: String,
    /// TCP connect stage.
    pub tcp_connect: TcpConnectMeasurement,
    /// HTTP stage, present once every earlier stage succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_round_trip: Option<HttpRoundTripMeasurement>,
}

/// HTTPS endpoint: TCP connect, TLS handshake, then HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct HttpsEndpointMeasurement {
    /// The probed `ip:port`.
    pub endpoint: String,
    /// Protocol tag of the round trip.
    pub protocol: String,
    /// TCP connect stage.
    pub tcp_connect: TcpConnectMeasurement,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// TLS stage, present once connected.
    pub tls_handshake: Option<TlsHandshakeMeasurement>,
    /// HTTP stage, present once every earlier stage succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_round_trip: Option<HttpRoundTripMeasurement>,
}

/// HTTP/3 endpoint: QUIC handshake, then HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct H3EndpointMeasurement {
    /// The probed `ip:port`.
    pub endpoint: String,
    /// Protocol tag of the round trip.
    pub protocol: String,
    /// QUIC handshake stage.
    pub quic_handshake: TlsHandshakeMeasurement,
    /// HTTP stage, present once every earlier stage succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_round_trip: Option<HttpRoundTripMeasurement>,
}

/// Measurement of one (address, protocol) endpoint.
///
/// Stages are filled in causal order and a stage is present only if every
/// earlier stage succeeded.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EndpointMeasurement {
    /// Plain HTTP over TCP.
    Http(HttpEndpointMeasurement),
    /// HTTPS over TCP and TLS.
    Https(HttpsEndpointMeasurement),
    /// HTTP/3 over QUIC.
    H3(H3EndpointMeasurement),
}

impl EndpointMeasurement {
    /// The HTTP round trip, if the endpoint got that far.
    pub fn http_round_trip(&self) -> Option<&HttpRoundTripMeasurement> {
        match self {
            EndpointMeasurement::Http(m) => m.http_round_trip.as_ref(),
            EndpointMeasurement::Https(m) => m.http_round_trip.as_ref(),
            EndpointMeasurement::H3(m) => m.http_round_trip.as_ref(),
        }
    }

    /// The probed `ip:port`.
    pub fn endpoint(&self) -> &str {
        match self {
            EndpointMeasurement::Http(m) => &m.endpoint,
            EndpointMeasurement::Https(m) => &m.endpoint,
            EndpointMeasurement::H3(m) => &m.endpoint,
        }
    }

    /// The protocol tag of the round trip this endpoint was generated for.
    pub fn protocol(&self) -> &str {
        match self {
            EndpointMeasurement::Http(m) => &m.protocol,
            EndpointMeasurement::Https(m) => &m.protocol,
            EndpointMeasurement::H3(m) => &m.protocol,
        }
    }
}

/// Converts a header map into the wire representation, keyed by canonical
/// header name (`user-agent` becomes `User-Agent`).
pub fn headers_to_map(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        out.entry(canonical_header_key(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    out
}

/// Canonical MIME header capitalization.
pub fn canonical_header_key(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_ctrl_request_defaults_missing_fields() {
        let req: CtrlRequest =
            serde_json::from_str(r#"{"http_request": "https://example.com/"}"#).expect("valid json");
        assert_eq!(req.http_request, "https://example.com/");
        assert!(req.http_request_headers.is_empty());
        assert!(req.tcp_connect.is_empty());
    }

    #[test]
    fn test_canonical_header_key() {
        assert_eq!(canonical_header_key("user-agent"), "User-Agent");
        assert_eq!(canonical_header_key("ACCEPT-LANGUAGE"), "Accept-Language");
        assert_eq!(canonical_header_key("alt-svc"), "Alt-Svc");
    }

    #[test]
    fn test_headers_to_map_groups_values() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("server", HeaderValue::from_static("nginx"));
        let map = headers_to_map(&headers);
        assert_eq!(map["Set-Cookie"], vec!["a=1", "b=2"]);
        assert_eq!(map["Server"], vec!["nginx"]);
    }

    #[test]
    fn test_endpoint_serialization_omits_absent_stages() {
        let endpoint = EndpointMeasurement::Https(HttpsEndpointMeasurement {
            endpoint: "93.184.216.34:443".into(),
            protocol: "https".into(),
            tcp_connect: TcpConnectMeasurement { failure: None },
            tls_handshake: Some(TlsHandshakeMeasurement {
                failure: Some("ssl_invalid_hostname".into()),
            }),
            http_round_trip: None,
        });
        let json = serde_json::to_value(&endpoint).expect("serializable");
        assert_eq!(json["protocol"], "https");
        assert_eq!(json["tls_handshake"]["failure"], "ssl_invalid_hostname");
        assert!(json.get("http_round_trip").is_none());
        assert!(endpoint.http_round_trip().is_none());
    }
}
