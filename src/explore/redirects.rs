//! HTTP redirect chain exploration.
//!
//! This module follows redirect chains manually, one request per hop, so
//! every request/response pair along the way can be recorded as a round trip.

use http::header::{COOKIE, LOCATION, SET_COOKIE};
use http::{HeaderMap, Method, StatusCode};
use log::{debug, warn};
use reqwest::cookie::{CookieStore, Jar};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error_handling::ExploreError;
use crate::models::{RoundTrip, RoundTripRequest, RoundTripResponse};
use crate::utils::{read_all_context, CancelError};

/// Settings for one redirect chain walk.
pub(super) struct ChainSettings<'a> {
    pub client: &'a reqwest::Client,
    pub max_redirects: usize,
    pub max_body_size: usize,
}

/// Follows the redirect chain starting at `start`, up to `max_redirects` hops.
///
/// Cookies set along the way are stored in `jar` and replayed on later hops.
/// Response bodies are drained (bounded) and discarded.
///
/// # Returns
///
/// The round trips in request order (oldest first), each tagged with its URL scheme.
///
/// # Errors
///
/// Returns an `ExploreError` if a request fails, a `Location` is invalid, or
/// the chain exceeds the redirect limit.
pub(super) async fn follow_redirect_chain(
    settings: &ChainSettings<'_>,
    start: &Url,
    headers: &HeaderMap,
    jar: &Jar,
    cancel: &CancellationToken,
) -> Result<Vec<RoundTrip>, ExploreError> {
    let mut chain: Vec<RoundTrip> = Vec::new();
    let mut current = start.clone();

    loop {
        let request_headers = with_cookies(headers, jar, &current);
        debug!("explore GET {current}");
        let send = settings
            .client
            .get(current.clone())
            .headers(request_headers.clone())
            .send();
        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CancelError::Canceled.into()),
            resp = send => resp.map_err(|source| ExploreError::Fetch {
                url: current.to_string(),
                source,
            })?,
        };

        let status = resp.status();
        let response_headers = resp.headers().clone();
        store_cookies(jar, &response_headers, &current);
        read_all_context(resp.bytes_stream(), settings.max_body_size, cancel)
            .await
            .map_err(|source| ExploreError::Body {
                url: current.to_string(),
                source,
            })?;
        debug!("explore GET {current}: {status}");

        chain.push(RoundTrip {
            protocol: current.scheme().to_string(),
            request: RoundTripRequest {
                method: Method::GET,
                url: current.clone(),
                headers: request_headers,
            },
            response: RoundTripResponse {
                status_code: status.as_u16(),
                headers: response_headers.clone(),
            },
            sort_index: 0,
        });

        let Some(location) = redirect_location(status, &response_headers) else {
            if is_redirect(status) {
                warn!("Redirect status {status} for {current} but no Location header");
            }
            break;
        };
        if chain.len() >= settings.max_redirects {
            return Err(ExploreError::TooManyRedirects(settings.max_redirects));
        }
        current = current
            .join(location)
            .map_err(|source| ExploreError::BadLocation {
                location: location.to_string(),
                source,
            })?;
    }
    Ok(chain)
}

/// Returns true for the statuses a browser follows (301, 302, 303, 307, 308).
pub(super) fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// The `Location` of a redirect response, if it is one.
pub(super) fn redirect_location(status: StatusCode, headers: &HeaderMap) -> Option<&str> {
    if !is_redirect(status) {
        return None;
    }
    headers
        .get(LOCATION)
        .and_then(|loc| loc.to_str().ok())
        .map(str::trim)
        .filter(|loc| !loc.is_empty())
}

/// Copies `headers` and adds the jar's cookies for `url`.
pub(super) fn with_cookies(headers: &HeaderMap, jar: &Jar, url: &Url) -> HeaderMap {
    let mut out = headers.clone();
    out.remove(COOKIE);
    if let Some(cookies) = jar.cookies(url) {
        out.insert(COOKIE, cookies);
    }
    out
}

/// Stores the `Set-Cookie` headers of a response in `jar`.
pub(super) fn store_cookies(jar: &Jar, headers: &HeaderMap, url: &Url) {
    let mut set_cookies = headers.get_all(SET_COOKIE).iter();
    jar.set_cookies(&mut set_cookies, url);
}
