//! Measurement orchestration.
//!
//! A measurement runs three stages in sequence: the initial check, the
//! explorer and the generator. Any stage error aborts the measurement; the
//! caller gets either a complete report or an error, never both.

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};
use log::{debug, info};
use rustls::RootCertStore;
use tokio_util::sync::CancellationToken;

use crate::check::initial_check;
use crate::classify::{classify_generic_error, ErrWrapper, Operation};
use crate::config::{
    is_honored_header, Config, DEFAULT_USER_AGENT, HEADER_USER_AGENT, MAX_REDIRECT_HOPS,
    MEASURE_TIMEOUT_SECS,
};
use crate::error_handling::{InitializationError, MeasureError};
use crate::explore::{DefaultExplorer, Explorer};
use crate::generate::{ClientEndpoints, DefaultGenerator, Generator};
use crate::models::{CtrlRequest, CtrlResponse};
use crate::probe::{ProbeConfig, Resolver};
use crate::utils::CancelError;

/// Everything a [`Measurer`] needs, handed over at construction.
#[derive(Clone)]
pub struct MeasureConfig {
    /// Resolver, trust anchors, stage timeouts and body ceiling.
    pub probe: ProbeConfig,
    /// Maximum number of requests along a redirect chain.
    pub max_redirects: usize,
    /// Whether to follow `Alt-Svc` and measure HTTP/3.
    pub enable_quic: bool,
    /// User-Agent sent when the probe did not submit one.
    pub user_agent: String,
    /// Upper bound for a whole measurement.
    pub measure_timeout: Duration,
}

impl MeasureConfig {
    /// Default settings around `resolver`.
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            probe: ProbeConfig::new(resolver),
            max_redirects: MAX_REDIRECT_HOPS,
            enable_quic: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            measure_timeout: Duration::from_secs(MEASURE_TIMEOUT_SECS),
        }
    }

    /// Settings from the command line configuration.
    pub fn from_config(config: &Config, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            enable_quic: config.enable_quic,
            user_agent: config.user_agent.clone(),
            measure_timeout: Duration::from_secs(config.timeout_seconds),
            ..Self::new(resolver)
        }
    }

    /// Replaces the trust anchors used for TLS and QUIC.
    pub fn with_root_store(mut self, root_store: RootCertStore) -> Self {
        self.probe.root_store = Arc::new(root_store);
        self
    }
}

/// Runs measurements. Shared by every request; holds no per-request state.
pub struct Measurer {
    config: MeasureConfig,
    explorer: Arc<dyn Explorer>,
    generator: Arc<dyn Generator>,
}

impl Measurer {
    /// Creates a measurer with the network-backed explorer and generator.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError` if the explorer's HTTP client cannot be built.
    pub fn new(config: MeasureConfig) -> Result<Self, InitializationError> {
        let explorer = Arc::new(DefaultExplorer::new(&config)?);
        let generator = Arc::new(DefaultGenerator::new(&config));
        Ok(Self::with_stages(config, explorer, generator))
    }

    /// Creates a measurer with custom stages.
    pub fn with_stages(
        config: MeasureConfig,
        explorer: Arc<dyn Explorer>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            config,
            explorer,
            generator,
        }
    }

    /// The configuration this measurer was built with.
    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    /// Measures the URL in `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`MeasureError`] if a stage fails, the measurement times out
    /// or `cancel` fires.
    pub async fn measure(
        &self,
        request: &CtrlRequest,
        cancel: &CancellationToken,
    ) -> Result<CtrlResponse, MeasureError> {
        let child = cancel.child_token();
        let _guard = child.clone().drop_guard();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(interrupted(CancelError::Canceled)),
            _ = tokio::time::sleep(self.config.measure_timeout) => {
                Err(interrupted(CancelError::DeadlineExceeded))
            }
            result = self.run(request, &child) => result,
        }
    }

    async fn run(
        &self,
        request: &CtrlRequest,
        cancel: &CancellationToken,
    ) -> Result<CtrlResponse, MeasureError> {
        let headers = request_headers(request, &self.config.user_agent);
        let url = initial_check(&request.http_request, &self.config.probe, cancel).await?;

        let round_trips = self.explorer.explore(&url, &headers, cancel).await?;
        info!("explored {url}: {} round trips", round_trips.len());

        let domain = url.host_str().unwrap_or_default();
        let client = ClientEndpoints::from_tcp_connect(domain, &request.tcp_connect);
        let urls = self.generator.generate(&round_trips, &client, cancel).await?;
        debug!("generated {} url measurements for {url}", urls.len());
        Ok(CtrlResponse { urls })
    }
}

fn interrupted(reason: CancelError) -> MeasureError {
    MeasureError::Interrupted(ErrWrapper::new(reason, Operation::TopLevel, classify_generic_error))
}

/// Builds the headers sent on every request from the honored headers the
/// probe submitted, adding the default User-Agent when none was given.
pub fn request_headers(request: &CtrlRequest, default_user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, values) in &request.http_request_headers {
        if !is_honored_header(name) {
            continue;
        }
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        for value in values {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.append(name.clone(), value);
            }
        }
    }
    if !headers.contains_key(HEADER_USER_AGENT) {
        if let Ok(value) = HeaderValue::from_str(default_user_agent) {
            headers.insert(http::header::USER_AGENT, value);
        }
    }
    headers
}
