//! Operation tags attached to classified errors.

use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Protocol phase in which an error occurred.
///
/// Major phases (resolve, connect, TLS handshake, QUIC handshake, HTTP round
/// trip) are the ones interference is attributed to. Minor phases (read,
/// write, close and the datagram variants) only name the syscall that surfaced
/// an error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// DNS lookup
    Resolve,
    /// TCP connect
    Connect,
    /// TLS handshake over TCP
    TlsHandshake,
    /// QUIC handshake
    QuicHandshake,
    /// Start of the QUIC handshake
    QuicHandshakeStart,
    /// End of the QUIC handshake
    QuicHandshakeDone,
    /// Single HTTP request/response exchange
    HttpRoundTrip,
    /// Closing a socket
    Close,
    /// Reading from a stream socket
    Read,
    /// Writing to a stream socket
    Write,
    /// Reading a datagram
    ReadFrom,
    /// Writing a datagram
    WriteTo,
    /// Unattributed
    Unknown,
    /// Top-level measurement step
    TopLevel,
}

impl Operation {
    /// Folds QUIC handshake sub-phases into [`Operation::QuicHandshake`].
    pub fn normalized(self) -> Self {
        match self {
            Operation::QuicHandshakeStart | Operation::QuicHandshakeDone => {
                Operation::QuicHandshake
            }
            other => other,
        }
    }

    /// Returns true for the protocol phases interference is attributed to.
    pub fn is_major(self) -> bool {
        matches!(
            self.normalized(),
            Operation::Resolve
                | Operation::Connect
                | Operation::TlsHandshake
                | Operation::QuicHandshake
                | Operation::HttpRoundTrip
        )
    }

    /// Returns true for syscall-level I/O phases.
    pub fn is_minor(self) -> bool {
        matches!(
            self,
            Operation::Close
                | Operation::Read
                | Operation::Write
                | Operation::ReadFrom
                | Operation::WriteTo
        )
    }
}
