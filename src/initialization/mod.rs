//! Application initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - Logger
//! - DNS resolver
//! - HTTP client for redirect exploration
//! - TLS crypto provider
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;
mod resolver;

use rustls::crypto::{ring::default_provider, CryptoProvider};

// Re-export public API
pub use client::init_redirect_client;
pub use logger::init_logger_with;
pub use resolver::{init_resolver, HickoryResolver};

/// Initializes the crypto provider for TLS operations.
///
/// Configures the process-wide crypto provider for `rustls`. Probes build
/// their configurations with an explicit ring provider, but dependencies that
/// rely on the process default (the HTTP client, the QUIC stack) need it set.
pub fn init_crypto_provider() {
    // Reinstalling returns an error, which is harmless
    let _ = CryptoProvider::install_default(default_provider());
}
