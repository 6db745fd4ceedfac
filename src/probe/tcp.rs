//! TCP connect probe.

use std::net::SocketAddr;

use log::debug;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::ProbeConfig;
use crate::classify::{classify_generic_error, ErrWrapper, Operation};
use crate::utils::with_deadline;

/// Opens a TCP connection to `addr`.
///
/// # Errors
///
/// Returns an [`ErrWrapper`] tagged [`Operation::Connect`].
pub async fn tcp_connect(
    config: &ProbeConfig,
    addr: SocketAddr,
    cancel: &CancellationToken,
) -> Result<TcpStream, ErrWrapper> {
    debug!("tcp connect {addr}");
    match with_deadline(cancel, config.timeouts.tcp_connect, TcpStream::connect(addr)).await {
        Ok(stream) => {
            debug!("tcp connect {addr}: ok");
            Ok(stream)
        }
        Err(e) => {
            let err = ErrWrapper::new(e, Operation::Connect, classify_generic_error);
            debug!("tcp connect {addr}: {err}");
            Err(err)
        }
    }
}
