//! Per-endpoint probe sequences.
//!
//! Each builder runs its stages in order and stops at the first failure,
//! leaving the later stages absent.

use std::net::SocketAddr;

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::classify::ErrWrapper;
use crate::models::{
    headers_to_map, H3EndpointMeasurement, HttpEndpointMeasurement, HttpRequestMeasurement,
    HttpResponseMeasurement, HttpRoundTripMeasurement, HttpsEndpointMeasurement, RoundTrip,
    TcpConnectMeasurement, TlsHandshakeMeasurement,
};
use crate::probe::{
    h3_round_trip, http_round_trip, quic_handshake, tcp_connect, tls_handshake, HttpProbeResponse,
    ProbeConfig, HTTPS_ALPN,
};

/// TCP connect, then HTTP/1.1.
pub(super) async fn http_endpoint(
    probe: &ProbeConfig,
    addr: SocketAddr,
    rt: &RoundTrip,
    cancel: &CancellationToken,
) -> HttpEndpointMeasurement {
    let mut measurement = HttpEndpointMeasurement {
        endpoint: addr.to_string(),
        protocol: rt.protocol.clone(),
        tcp_connect: TcpConnectMeasurement::default(),
        http_round_trip: None,
    };
    let stream = match tcp_connect(probe, addr, cancel).await {
        Ok(stream) => stream,
        Err(err) => {
            measurement.tcp_connect.failure = Some(err.failure().to_string());
            return measurement;
        }
    };
    let url = &rt.request.url;
    let result = http_round_trip(probe, stream, false, url, &rt.request.headers, cancel).await;
    measurement.http_round_trip = Some(round_trip_measurement(rt, result));
    measurement
}

/// TCP connect, TLS handshake, then HTTP/2 or HTTP/1.1 depending on ALPN.
pub(super) async fn https_endpoint(
    probe: &ProbeConfig,
    addr: SocketAddr,
    sni: &str,
    rt: &RoundTrip,
    cancel: &CancellationToken,
) -> HttpsEndpointMeasurement {
    let mut measurement = HttpsEndpointMeasurement {
        endpoint: addr.to_string(),
        protocol: rt.protocol.clone(),
        tcp_connect: TcpConnectMeasurement::default(),
        tls_handshake: None,
        http_round_trip: None,
    };
    let stream = match tcp_connect(probe, addr, cancel).await {
        Ok(stream) => stream,
        Err(err) => {
            measurement.tcp_connect.failure = Some(err.failure().to_string());
            return measurement;
        }
    };
    let tls = match tls_handshake(probe, stream, sni, HTTPS_ALPN, cancel).await {
        Ok(tls) => {
            measurement.tls_handshake = Some(TlsHandshakeMeasurement::default());
            tls
        }
        Err(err) => {
            measurement.tls_handshake = Some(TlsHandshakeMeasurement {
                failure: Some(err.failure().to_string()),
            });
            return measurement;
        }
    };
    let h2 = tls.get_ref().1.alpn_protocol() == Some(b"h2".as_slice());
    let url = &rt.request.url;
    let result = http_round_trip(probe, tls, h2, url, &rt.request.headers, cancel).await;
    measurement.http_round_trip = Some(round_trip_measurement(rt, result));
    measurement
}

/// QUIC handshake with the round trip's ALPN, then HTTP/3.
pub(super) async fn h3_endpoint(
    probe: &ProbeConfig,
    addr: SocketAddr,
    sni: &str,
    rt: &RoundTrip,
    cancel: &CancellationToken,
) -> H3EndpointMeasurement {
    let mut measurement = H3EndpointMeasurement {
        endpoint: addr.to_string(),
        protocol: rt.protocol.clone(),
        quic_handshake: TlsHandshakeMeasurement::default(),
        http_round_trip: None,
    };
    let session = match quic_handshake(probe, addr, sni, &rt.protocol, cancel).await {
        Ok(session) => session,
        Err(err) => {
            measurement.quic_handshake.failure = Some(err.failure().to_string());
            return measurement;
        }
    };
    let result = h3_round_trip(probe, &session, &rt.request.url, &rt.request.headers, cancel).await;
    session.close();
    measurement.http_round_trip = Some(round_trip_measurement(rt, result));
    measurement
}

fn round_trip_measurement(
    rt: &RoundTrip,
    result: Result<HttpProbeResponse, ErrWrapper>,
) -> HttpRoundTripMeasurement {
    let request = HttpRequestMeasurement {
        method: rt.request.method.to_string(),
        url: rt.request.url.to_string(),
        headers: headers_to_map(&rt.request.headers),
    };
    let response = match result {
        Ok(response) => HttpResponseMeasurement {
            body_length: i64::try_from(response.body_length).unwrap_or(i64::MAX),
            failure: None,
            headers: headers_to_map(&response.headers),
            status_code: i64::from(response.status_code),
        },
        Err(err) => {
            debug!("http round trip {}: {err}", rt.request.url);
            HttpResponseMeasurement {
                failure: Some(err.failure().to_string()),
                ..Default::default()
            }
        }
    };
    HttpRoundTripMeasurement { request, response }
}
