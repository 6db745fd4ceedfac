//! TLS failure rules (rustls errors and TLS alerts carried by QUIC).

use rustls::{AlertDescription, CertificateError};

use super::failure::*;

/// Maps a rustls error raised during a handshake.
pub(super) fn rustls_failure(err: &rustls::Error) -> Option<&'static str> {
    match err {
        rustls::Error::InvalidCertificate(cert) => Some(certificate_failure(cert)),
        rustls::Error::AlertReceived(alert) => alert_failure(*alert),
        _ => None,
    }
}

fn certificate_failure(err: &CertificateError) -> &'static str {
    match err {
        CertificateError::NotValidForName => FAILURE_SSL_INVALID_HOSTNAME,
        CertificateError::UnknownIssuer => FAILURE_SSL_UNKNOWN_AUTHORITY,
        // Newer rustls releases attach the presented names to the hostname error.
        other if format!("{other:?}").starts_with("NotValidForName") => {
            FAILURE_SSL_INVALID_HOSTNAME
        }
        _ => FAILURE_SSL_INVALID_CERTIFICATE,
    }
}

/// Maps a TLS alert (RFC 8446) to a failure string.
pub(super) fn alert_failure(alert: AlertDescription) -> Option<&'static str> {
    match alert {
        AlertDescription::BadCertificate
        | AlertDescription::UnsupportedCertificate
        | AlertDescription::CertificateRevoked
        | AlertDescription::CertificateExpired
        | AlertDescription::CertificateUnknown => Some(FAILURE_SSL_INVALID_CERTIFICATE),
        AlertDescription::HandshakeFailure | AlertDescription::DecryptError => {
            Some(FAILURE_SSL_FAILED_HANDSHAKE)
        }
        AlertDescription::UnknownCA => Some(FAILURE_SSL_UNKNOWN_AUTHORITY),
        AlertDescription::UnrecognisedName => Some(FAILURE_SSL_INVALID_HOSTNAME),
        _ => None,
    }
}

/// Maps the reason text of a locally generated QUIC crypto error.
///
/// When certificate verification fails on our side, quinn reports the alert it
/// sent (usually `bad_certificate`) and keeps the rustls error in the reason.
pub(super) fn reason_failure(reason: &str) -> Option<&'static str> {
    let lowered = reason.to_ascii_lowercase();
    if lowered.contains("notvalidforname") || lowered.contains("not valid for name") {
        return Some(FAILURE_SSL_INVALID_HOSTNAME);
    }
    if lowered.contains("unknownissuer") || lowered.contains("unknown issuer") {
        return Some(FAILURE_SSL_UNKNOWN_AUTHORITY);
    }
    None
}
