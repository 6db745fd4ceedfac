//! QUIC handshake probe.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use log::debug;
use quinn::crypto::rustls::QuicClientConfig;
use quinn::{Connection, Endpoint};
use tokio_util::sync::CancellationToken;

use super::tls::client_tls_config;
use super::ProbeConfig;
use crate::classify::{classify_quic_handshake_error, ErrWrapper, Operation};
use crate::utils::{with_deadline, BoxError};

/// QUIC version negotiated for the `h3-29` ALPN.
pub const QUIC_VERSION_DRAFT_29: u32 = 0xff00_001d;

/// An established QUIC connection and the local endpoint that owns its socket.
pub struct QuicSession {
    endpoint: Endpoint,
    connection: Connection,
}

impl QuicSession {
    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Closes the connection and its local endpoint.
    pub fn close(self) {
        self.connection.close(0u32.into(), b"");
        self.endpoint.close(0u32.into(), b"");
    }
}

/// Performs a QUIC handshake with `addr`.
///
/// # Arguments
///
/// * `config` - Probe settings (root store, timeout)
/// * `addr` - Remote UDP endpoint
/// * `sni` - Server name sent and verified during the handshake
/// * `alpn` - ALPN token, `h3` or `h3-29`; `h3-29` also selects QUIC draft 29
/// * `cancel` - Measurement-wide cancellation token
///
/// # Errors
///
/// Returns an [`ErrWrapper`] tagged [`Operation::QuicHandshake`].
pub async fn quic_handshake(
    config: &ProbeConfig,
    addr: SocketAddr,
    sni: &str,
    alpn: &str,
    cancel: &CancellationToken,
) -> Result<QuicSession, ErrWrapper> {
    debug!("quic handshake {addr} sni={sni} alpn={alpn}");
    let result: Result<QuicSession, BoxError> = async {
        let tls = client_tls_config(config.root_store.clone(), &[alpn])?;
        let mut client_config = quinn::ClientConfig::new(Arc::new(QuicClientConfig::try_from(tls)?));
        if alpn == "h3-29" {
            client_config.version(QUIC_VERSION_DRAFT_29);
        }

        let bind: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let mut endpoint = Endpoint::client(bind)?;
        endpoint.set_default_client_config(client_config);

        let connecting = endpoint.connect(addr, sni)?;
        let connection = with_deadline(cancel, config.timeouts.quic_handshake, connecting).await?;
        Ok(QuicSession {
            endpoint,
            connection,
        })
    }
    .await;
    match result {
        Ok(session) => {
            debug!("quic handshake {addr}: ok");
            Ok(session)
        }
        Err(e) => {
            let err = ErrWrapper::new(e, Operation::QuicHandshake, classify_quic_handshake_error);
            debug!("quic handshake {addr}: {err}");
            Err(err)
        }
    }
}
