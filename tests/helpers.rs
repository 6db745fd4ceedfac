// Shared test helpers: a fake resolver, local servers and short-timeout configs.
//
// This module provides common utilities used across multiple test files to reduce duplication.

#![allow(dead_code)] // Each test file uses a different subset

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use quinn::crypto::rustls::QuicServerConfig;
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::RootCertStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use websteps_helper::classify::DnsError;
use websteps_helper::probe::Resolver;
use websteps_helper::utils::BoxError;
use websteps_helper::MeasureConfig;

/// Resolver answering from a fixed table; unknown names are NXDOMAIN.
#[derive(Default)]
pub struct FakeResolver {
    table: HashMap<String, Vec<IpAddr>>,
}

impl FakeResolver {
    /// Adds `domain -> ips` to the table.
    pub fn with(mut self, domain: &str, ips: &[IpAddr]) -> Self {
        self.table.insert(domain.to_string(), ips.to_vec());
        self
    }

    /// Resolver mapping every given name to 127.0.0.1.
    pub fn loopback(domains: &[&str]) -> Self {
        Self::to(LOCALHOST, domains)
    }

    /// Resolver mapping every given name to `ip`.
    pub fn to(ip: IpAddr, domains: &[&str]) -> Self {
        domains.iter().fold(Self::default(), |r, d| r.with(d, &[ip]))
    }
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn lookup_host(&self, domain: &str) -> Result<Vec<IpAddr>, BoxError> {
        if let Ok(ip) = domain.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        self.table
            .get(domain)
            .cloned()
            .ok_or_else(|| DnsError::NoSuchHost.into())
    }
}

pub const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Measurement settings around `resolver` with short stage timeouts.
pub fn test_config(resolver: FakeResolver) -> MeasureConfig {
    let mut config = MeasureConfig::new(Arc::new(resolver));
    config.probe.timeouts.dns = Duration::from_secs(2);
    config.probe.timeouts.tcp_connect = Duration::from_secs(2);
    config.probe.timeouts.tls_handshake = Duration::from_secs(2);
    config.probe.timeouts.quic_handshake = Duration::from_millis(500);
    config.probe.timeouts.http_round_trip = Duration::from_secs(5);
    config.measure_timeout = Duration::from_secs(30);
    config
}

/// A private CA and a leaf certificate it signed.
pub struct TestPki {
    pub roots: RootCertStore,
    pub leaf: CertificateDer<'static>,
    pub leaf_key: PrivateKeyDer<'static>,
}

/// Mints a CA and a leaf certificate valid for `leaf_name`.
pub fn test_pki(leaf_name: &str) -> TestPki {
    let mut ca_params = CertificateParams::new(Vec::<String>::new()).expect("CA params");
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let ca_key = KeyPair::generate().expect("CA key");
    let ca_cert = ca_params.self_signed(&ca_key).expect("CA certificate");

    let leaf_params = CertificateParams::new(vec![leaf_name.to_string()]).expect("leaf params");
    let leaf_key = KeyPair::generate().expect("leaf key");
    let leaf = leaf_params
        .signed_by(&leaf_key, &ca_cert, &ca_key)
        .expect("leaf certificate");

    let mut roots = RootCertStore::empty();
    roots.add(ca_cert.der().clone()).expect("add CA to roots");
    TestPki {
        roots,
        leaf: leaf.der().clone(),
        leaf_key: PrivatePkcs8KeyDer::from(leaf_key.serialize_der()).into(),
    }
}

/// Starts a TLS server on 127.0.0.1 answering every request with `200 ok`
/// over HTTP/1.1.
pub async fn start_tls_server(pki: &TestPki) -> SocketAddr {
    start_tls_server_with_headers(pki, &[]).await
}

/// Like [`start_tls_server`], adding `headers` to every response.
pub async fn start_tls_server_with_headers(pki: &TestPki, headers: &[(&str, String)]) -> SocketAddr {
    let mut response = String::from("HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n");
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str("\r\nok");
    let response = Arc::new(response.into_bytes());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .expect("protocol versions")
        .with_no_client_auth()
        .with_single_cert(vec![pki.leaf.clone()], pki.leaf_key.clone_key())
        .expect("server certificate");
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind TLS server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let acceptor = acceptor.clone();
            let response = response.clone();
            tokio::spawn(async move {
                // Handshake failures are what some tests are after
                let Ok(mut tls) = acceptor.accept(stream).await else {
                    return;
                };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match tls.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = tls.write_all(&response).await;
                let _ = tls.shutdown().await;
            });
        }
    });
    addr
}

/// Starts an HTTP/3 server on 127.0.0.1 (UDP) answering every request with
/// `200 ok`. Only the `h3` ALPN is accepted.
pub async fn start_h3_server(pki: &TestPki) -> SocketAddr {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut tls = rustls::ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])
        .expect("protocol versions")
        .with_no_client_auth()
        .with_single_cert(vec![pki.leaf.clone()], pki.leaf_key.clone_key())
        .expect("server certificate");
    tls.alpn_protocols = vec![b"h3".to_vec()];
    let crypto = QuicServerConfig::try_from(tls).expect("QUIC server config");
    let server_config = quinn::ServerConfig::with_crypto(Arc::new(crypto));

    let bind: SocketAddr = (LOCALHOST, 0).into();
    let endpoint = quinn::Endpoint::server(server_config, bind).expect("bind QUIC server");
    let addr = endpoint.local_addr().expect("local addr");
    tokio::spawn(async move {
        while let Some(incoming) = endpoint.accept().await {
            tokio::spawn(async move {
                let Ok(connection) = incoming.await else {
                    return;
                };
                let Ok(mut h3_conn) =
                    h3::server::Connection::<_, Bytes>::new(h3_quinn::Connection::new(connection)).await
                else {
                    return;
                };
                while let Ok(Some((_request, mut stream))) = h3_conn.accept().await {
                    let response = http::Response::builder()
                        .status(200)
                        .body(())
                        .expect("response");
                    if stream.send_response(response).await.is_err() {
                        return;
                    }
                    let _ = stream.send_data(Bytes::from_static(b"ok")).await;
                    let _ = stream.finish().await;
                }
            });
        }
    });
    addr
}

/// A loopback port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}
