//! websteps_helper library: the websteps test helper
//!
//! Given a URL submitted by a remote probe, the helper re-measures it from its
//! own vantage point: it explores the redirect chain (and the HTTP/3 service
//! advertised through `Alt-Svc`), then resolves every hop and probes each
//! address with TCP, TLS or QUIC and a single HTTP round trip. Failures are
//! classified into a fixed vocabulary so the probe can compare them with its
//! own.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use websteps_helper::initialization::init_resolver;
//! use websteps_helper::{CtrlRequest, MeasureConfig, Measurer};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let measurer = Measurer::new(MeasureConfig::new(init_resolver()))?;
//! let request = CtrlRequest {
//!     http_request: "https://example.com/".into(),
//!     ..Default::default()
//! };
//! let response = measurer.measure(&request, &CancellationToken::new()).await?;
//! println!("measured {} URLs", response.urls.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

#![warn(missing_docs)]

pub mod check;
pub mod classify;
pub mod config;
mod error_handling;
pub mod explore;
pub mod generate;
pub mod initialization;
pub mod measure;
pub mod models;
pub mod probe;
pub mod server;
pub mod utils;

// Re-export public API
pub use classify::{classify, ErrWrapper, Operation};
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::{
    CheckError, ExploreError, GenerateError, InitializationError, MeasureError,
};
pub use measure::{MeasureConfig, Measurer};
pub use models::{CtrlRequest, CtrlResponse, EndpointMeasurement, RoundTrip, UrlMeasurement};
pub use run::{run_helper, ServeReport};

// Internal run module (wires configuration, resources and the server)
mod run {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use log::info;
    use tokio::net::TcpListener;

    use crate::config::Config;
    use crate::initialization::init_resolver;
    use crate::measure::{MeasureConfig, Measurer};
    use crate::server::{serve, ServerState};

    /// Summary of a helper run, returned after shutdown.
    #[derive(Debug, Clone)]
    pub struct ServeReport {
        /// Number of requests received on the measurement endpoint
        pub requests: u64,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Runs the test helper until Ctrl-C.
    ///
    /// Builds the resolver and the measurer from `config`, binds the listen
    /// address and serves the helper API, shutting down gracefully on Ctrl-C.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The measurer cannot be built
    /// - The listen address cannot be bound
    /// - The server fails while running
    pub async fn run_helper(config: Config) -> Result<ServeReport> {
        let resolver = init_resolver();
        let measure_config = MeasureConfig::from_config(&config, resolver);
        info!(
            "Measurement timeout {}s, HTTP/3 {}",
            measure_config.measure_timeout.as_secs(),
            if measure_config.enable_quic { "enabled" } else { "disabled" }
        );
        let measurer = Measurer::new(measure_config).context("Failed to initialize measurer")?;
        let state = ServerState::new(Arc::new(measurer));

        let listener = TcpListener::bind(config.listen)
            .await
            .with_context(|| format!("Failed to bind {}", config.listen))?;

        let start_time = std::time::Instant::now();
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
        };
        serve(listener, state.clone(), shutdown).await?;

        Ok(ServeReport {
            requests: state.request_index.load(Ordering::SeqCst),
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }
}
