//! Single-shot HTTP round trip over an established connection.
//!
//! HTTP/1.1 and HTTP/2 run over a TCP or TLS stream handed in by the caller;
//! HTTP/3 runs over a [`QuicSession`]. The connection is torn down as soon as
//! the response body has been read, so nothing is ever reused.

use bytes::{Buf, Bytes};
use http::{HeaderMap, Method, Request, Response, Version};
use http_body_util::{BodyDataStream, Empty};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use url::Url;

use super::quic::QuicSession;
use super::ProbeConfig;
use crate::classify::{classify_generic_error, ErrWrapper, Operation};
use crate::utils::{read_all_context, with_deadline, BoxError};

/// What a probe learned from one HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpProbeResponse {
    /// Response status.
    pub status_code: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Number of body bytes read (capped at the configured ceiling).
    pub body_length: usize,
}

/// Sends one `GET url` over `stream` and reads the response.
///
/// Speaks HTTP/2 when `h2` is set (the TLS handshake negotiated `h2`),
/// HTTP/1.1 otherwise. The stream is closed before returning.
///
/// # Errors
///
/// Returns an [`ErrWrapper`] tagged [`Operation::HttpRoundTrip`].
pub async fn http_round_trip<S>(
    config: &ProbeConfig,
    stream: S,
    h2: bool,
    url: &Url,
    headers: &HeaderMap,
    cancel: &CancellationToken,
) -> Result<HttpProbeResponse, ErrWrapper>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    debug!("http round trip {url} h2={h2}");
    let result = with_deadline(cancel, config.timeouts.http_round_trip, async {
        let io = TokioIo::new(stream);
        let (response, driver) = if h2 {
            let request = build_request(url, headers, Version::HTTP_2, Empty::<Bytes>::new())?;
            let (mut sender, conn) = hyper::client::conn::http2::handshake(TokioExecutor::new(), io).await?;
            let driver = spawn_driver(conn);
            (sender.send_request(request).await?, driver)
        } else {
            let request = build_request(url, headers, Version::HTTP_11, Empty::<Bytes>::new())?;
            let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;
            let driver = spawn_driver(conn);
            (sender.send_request(request).await?, driver)
        };
        let summary = read_response(config, response, cancel).await;
        drop(driver);
        summary
    })
    .await;
    finish(url, result)
}

/// Sends one `GET url` over an HTTP/3 session and reads the response.
///
/// # Errors
///
/// Returns an [`ErrWrapper`] tagged [`Operation::HttpRoundTrip`].
pub async fn h3_round_trip(
    config: &ProbeConfig,
    session: &QuicSession,
    url: &Url,
    headers: &HeaderMap,
    cancel: &CancellationToken,
) -> Result<HttpProbeResponse, ErrWrapper> {
    debug!("h3 round trip {url}");
    let result = with_deadline(cancel, config.timeouts.http_round_trip, async {
        let conn = h3_quinn::Connection::new(session.connection().clone());
        let (mut driver, mut sender) = h3::client::new(conn).await?;
        let _driver = AbortOnDropHandle::new(tokio::spawn(async move {
            let _ = futures::future::poll_fn(|cx| driver.poll_close(cx)).await;
        }));

        let request = build_request(url, headers, Version::HTTP_3, ())?;
        let mut stream = sender.send_request(request).await?;
        stream.finish().await?;
        let response = stream.recv_response().await?;

        let body = futures::stream::unfold(stream, |mut stream| async move {
            match stream.recv_data().await {
                Ok(Some(mut chunk)) => Some((Ok(chunk.copy_to_bytes(chunk.remaining())), stream)),
                Ok(None) => None,
                Err(e) => Some((Err(e), stream)),
            }
        });
        let body = read_all_context(body, config.max_body_size, cancel).await?;
        Ok::<_, BoxError>(HttpProbeResponse {
            status_code: response.status().as_u16(),
            headers: response.headers().clone(),
            body_length: body.len(),
        })
    })
    .await;
    finish(url, result)
}

fn finish(url: &Url, result: Result<HttpProbeResponse, BoxError>) -> Result<HttpProbeResponse, ErrWrapper> {
    match result {
        Ok(response) => {
            debug!(
                "http round trip {url}: {} ({} bytes)",
                response.status_code, response.body_length
            );
            Ok(response)
        }
        Err(e) => {
            let err = ErrWrapper::new(e, Operation::HttpRoundTrip, classify_generic_error);
            debug!("http round trip {url}: {err}");
            Err(err)
        }
    }
}

/// Drives a hyper connection in the background until the returned handle is dropped.
fn spawn_driver<F>(conn: F) -> AbortOnDropHandle<()>
where
    F: std::future::Future<Output = Result<(), hyper::Error>> + Send + 'static,
{
    AbortOnDropHandle::new(tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!("http connection closed: {e}");
        }
    }))
}

async fn read_response(
    config: &ProbeConfig,
    response: Response<Incoming>,
    cancel: &CancellationToken,
) -> Result<HttpProbeResponse, BoxError> {
    let (parts, body) = response.into_parts();
    let body = read_all_context(BodyDataStream::new(body), config.max_body_size, cancel).await?;
    Ok(HttpProbeResponse {
        status_code: parts.status.as_u16(),
        headers: parts.headers,
        body_length: body.len(),
    })
}

/// Builds the probe request.
///
/// HTTP/1.1 uses the origin form plus a `Host` header; HTTP/2 and HTTP/3 need
/// the absolute form to fill the `:scheme` and `:authority` pseudo-headers.
fn build_request<B>(
    url: &Url,
    headers: &HeaderMap,
    version: Version,
    body: B,
) -> Result<Request<B>, http::Error> {
    let mut target = url.clone();
    target.set_fragment(None);

    let mut builder = Request::builder().method(Method::GET).version(version);
    if version == Version::HTTP_11 {
        let origin_form = match target.query() {
            Some(query) => format!("{}?{}", target.path(), query),
            None => target.path().to_string(),
        };
        builder = builder
            .uri(origin_form)
            .header(http::header::HOST, host_header(&target));
    } else {
        builder = builder.uri(target.as_str());
    }
    if let Some(map) = builder.headers_mut() {
        map.extend(headers.clone());
    }
    builder.body(body)
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
