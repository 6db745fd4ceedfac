//! TLS handshake probe.

use std::sync::Arc;

use log::debug;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;

use super::ProbeConfig;
use crate::classify::{classify_tls_handshake_error, ErrWrapper, Operation};
use crate::utils::{with_deadline, BoxError};

/// ALPN offered on TCP-based HTTPS endpoints.
pub const HTTPS_ALPN: &[&str] = &["h2", "http/1.1"];

/// Builds a rustls client configuration trusting `roots` and offering `alpn`.
///
/// # Errors
///
/// Returns a `rustls::Error` if the ring provider cannot satisfy the default
/// protocol versions.
pub fn client_tls_config(
    roots: Arc<RootCertStore>,
    alpn: &[&str],
) -> Result<ClientConfig, rustls::Error> {
    let mut config =
        ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();
    config.alpn_protocols = alpn.iter().map(|p| p.as_bytes().to_vec()).collect();
    Ok(config)
}

/// Performs a TLS handshake over `stream` with SNI `sni`.
///
/// # Arguments
///
/// * `config` - Probe settings (root store, timeout)
/// * `stream` - An established TCP connection
/// * `sni` - Server name sent in the ClientHello and verified against the certificate
/// * `alpn` - ALPN protocols to offer
/// * `cancel` - Measurement-wide cancellation token
///
/// # Errors
///
/// Returns an [`ErrWrapper`] tagged [`Operation::TlsHandshake`].
pub async fn tls_handshake(
    config: &ProbeConfig,
    stream: TcpStream,
    sni: &str,
    alpn: &[&str],
    cancel: &CancellationToken,
) -> Result<TlsStream<TcpStream>, ErrWrapper> {
    debug!("tls handshake sni={sni}");
    let result: Result<TlsStream<TcpStream>, BoxError> = async {
        let tls = client_tls_config(config.root_store.clone(), alpn)?;
        let server_name = ServerName::try_from(sni.to_string())?;
        let connector = TlsConnector::from(Arc::new(tls));
        with_deadline(
            cancel,
            config.timeouts.tls_handshake,
            connector.connect(server_name, stream),
        )
        .await
    }
    .await;
    match result {
        Ok(stream) => {
            let negotiated = stream
                .get_ref()
                .1
                .alpn_protocol()
                .map(String::from_utf8_lossy);
            debug!("tls handshake sni={sni}: ok alpn={negotiated:?}");
            Ok(stream)
        }
        Err(e) => {
            let err = ErrWrapper::new(e, Operation::TlsHandshake, classify_tls_handshake_error);
            debug!("tls handshake sni={sni}: {err}");
            Err(err)
        }
    }
}
