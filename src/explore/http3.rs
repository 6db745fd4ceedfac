//! HTTP/3 repetition of an explored URL.

use std::net::SocketAddr;

use http::{HeaderMap, Method, StatusCode};
use log::debug;
use reqwest::cookie::Jar;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::alt_svc::AltSvcEntry;
use super::redirects::{redirect_location, store_cookies, with_cookies};
use crate::classify::{classify_resolver_error, DnsError, ErrWrapper, Operation};
use crate::models::{RoundTrip, RoundTripRequest, RoundTripResponse};
use crate::probe::{dns_lookup, h3_round_trip, quic_handshake, HttpProbeResponse, ProbeConfig};

/// Builds the URL fetched over HTTP/3: the final URL with the authority
/// advertised in `Alt-Svc`.
pub(super) fn h3_url(final_url: &Url, entry: &AltSvcEntry) -> Option<Url> {
    let mut url = final_url.clone();
    if let Some(host) = &entry.host {
        let host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.clone()
        };
        url.set_host(Some(&host)).ok()?;
    }
    url.set_port(Some(entry.port)).ok()?;
    url.set_fragment(None);
    Some(url)
}

/// Fetches `start` over HTTP/3 and follows HTTPS redirects.
///
/// Each hop opens its own QUIC connection. Redirects leaving HTTPS, invalid
/// locations and the redirect limit end the chain quietly.
///
/// # Returns
///
/// The HTTP/3 round trips in request order, tagged with `alpn`.
///
/// # Errors
///
/// Returns the classified failure of the first hop that fails, together with
/// the round trips collected before it.
pub(super) async fn follow_h3_chain(
    probe: &ProbeConfig,
    max_redirects: usize,
    start: Url,
    alpn: &str,
    headers: &HeaderMap,
    jar: &Jar,
    cancel: &CancellationToken,
) -> Result<Vec<RoundTrip>, (Vec<RoundTrip>, ErrWrapper)> {
    let mut chain = Vec::new();
    let mut current = start;

    loop {
        let request_headers = with_cookies(headers, jar, &current);
        let response = match fetch_once(probe, &current, alpn, &request_headers, cancel).await {
            Ok(response) => response,
            Err(err) => return Err((chain, err)),
        };
        store_cookies(jar, &response.headers, &current);

        let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::OK);
        let next = redirect_location(status, &response.headers)
            .and_then(|location| current.join(location).ok())
            .filter(|next| next.scheme() == "https");

        chain.push(RoundTrip {
            protocol: alpn.to_string(),
            request: RoundTripRequest {
                method: Method::GET,
                url: current.clone(),
                headers: request_headers,
            },
            response: RoundTripResponse {
                status_code: response.status_code,
                headers: response.headers,
            },
            sort_index: 0,
        });

        match next {
            Some(next) if chain.len() < max_redirects => current = next,
            _ => break,
        }
    }
    Ok(chain)
}

async fn fetch_once(
    probe: &ProbeConfig,
    url: &Url,
    alpn: &str,
    headers: &HeaderMap,
    cancel: &CancellationToken,
) -> Result<HttpProbeResponse, ErrWrapper> {
    let host = url.host_str().unwrap_or_default();
    let domain = host.trim_start_matches('[').trim_end_matches(']');
    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = dns_lookup(probe, domain, cancel).await?;

    let mut last_err = None;
    for ip in addrs {
        let addr = SocketAddr::new(ip, port);
        match quic_handshake(probe, addr, domain, alpn, cancel).await {
            Ok(session) => {
                debug!("explore {alpn} GET {url} via {addr}");
                let response = h3_round_trip(probe, &session, url, headers, cancel).await;
                session.close();
                return response;
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        ErrWrapper::new(DnsError::NoAnswer, Operation::Resolve, classify_resolver_error)
    }))
}
