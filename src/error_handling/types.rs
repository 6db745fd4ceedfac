//! Error type definitions.
//!
//! This module defines the structural error types of the helper. Measurement
//! failures (a refused connection, a bad certificate) are not errors at this
//! level: they are recorded as failure strings inside the measurement.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

use crate::classify::{classify, ErrWrapper};
use crate::models::{RoundTrip, UrlMeasurement};
use crate::utils::{CancelError, ReadError};

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error building the TLS client configuration.
    #[error("TLS configuration error: {0}")]
    TlsConfigError(#[from] rustls::Error),
}

/// Errors from the initial URL check.
#[derive(Error, Debug)]
pub enum CheckError {
    /// The URL could not be parsed or has no host.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The scheme is neither `http` nor `https`.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The hostname does not resolve.
    #[error("no such host {domain}: {source}")]
    NoSuchHost {
        /// The hostname that failed to resolve.
        domain: String,
        /// The classified resolver failure.
        #[source]
        source: ErrWrapper,
    },
}

/// Errors from exploring a URL's redirect chain.
#[derive(Error, Debug)]
pub enum ExploreError {
    /// A request along the chain failed.
    #[error("fetching {url} failed: {source}")]
    Fetch {
        /// The URL being fetched.
        url: String,
        /// The transport error.
        #[source]
        source: ReqwestError,
    },

    /// A response body could not be drained.
    #[error("reading the body of {url} failed: {source}")]
    Body {
        /// The URL being fetched.
        url: String,
        /// The read error.
        #[source]
        source: ReadError,
    },

    /// The measurement was cancelled while exploring.
    #[error("exploration interrupted: {0}")]
    Interrupted(#[from] CancelError),

    /// The chain is longer than the redirect limit.
    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),

    /// A redirect carried a `Location` that is not a valid URL.
    #[error("invalid redirect location {location:?}: {source}")]
    BadLocation {
        /// The raw header value.
        location: String,
        /// Why it did not parse.
        #[source]
        source: url::ParseError,
    },

    /// The HTTP/3 repetition failed after the HTTP fetch succeeded.
    ///
    /// Carries the round trips collected before the failure.
    #[error("HTTP/3 fetch of {url} failed: {source}")]
    Http3 {
        /// The HTTP/3 URL.
        url: String,
        /// Round trips collected before the failure, oldest first.
        round_trips: Vec<RoundTrip>,
        /// The classified failure.
        #[source]
        source: ErrWrapper,
    },
}

impl ExploreError {
    /// Round trips collected before the error, if any.
    pub fn partial_round_trips(&self) -> &[RoundTrip] {
        match self {
            ExploreError::Http3 { round_trips, .. } => round_trips,
            _ => &[],
        }
    }
}

/// Error from generating endpoint measurements: a hop's hostname did not resolve.
#[derive(Error, Debug)]
#[error("resolving {domain} failed: {source}")]
pub struct GenerateError {
    /// The hostname that failed to resolve.
    pub domain: String,
    /// Measurements completed before the failure.
    pub measurements: Vec<UrlMeasurement>,
    /// The classified resolver failure.
    #[source]
    pub source: ErrWrapper,
}

/// Errors returned by the measurement orchestrator.
#[derive(Error, Debug)]
pub enum MeasureError {
    /// The submitted URL was rejected.
    #[error("initial check failed: {0}")]
    Check(#[from] CheckError),

    /// Exploring the redirect chain failed.
    #[error("explore failed: {0}")]
    Explore(#[from] ExploreError),

    /// Generating endpoint measurements failed.
    #[error("generate failed: {0}")]
    Generate(#[from] GenerateError),

    /// The measurement was cancelled or ran out of time.
    #[error("measurement interrupted: {0}")]
    Interrupted(ErrWrapper),
}

impl MeasureError {
    /// The classified failure string for this error.
    pub fn failure(&self) -> String {
        match self {
            MeasureError::Check(CheckError::NoSuchHost { source, .. }) => {
                source.failure().to_string()
            }
            MeasureError::Check(e) => classify(e),
            MeasureError::Explore(e) => classify(e),
            MeasureError::Generate(e) => e.source.failure().to_string(),
            MeasureError::Interrupted(e) => e.failure().to_string(),
        }
    }
}
