//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::net::SocketAddr;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::constants::{DEFAULT_LISTEN_ADDR, DEFAULT_USER_AGENT, MEASURE_TIMEOUT_SECS};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Helper configuration.
///
/// Parsed from the command line (and `WEBSTEPS_*` environment variables) by the
/// binary, or built programmatically by library users.
///
/// # Examples
///
/// ```no_run
/// use websteps_helper::Config;
///
/// let config = Config {
///     timeout_seconds: 30,
///     enable_quic: false,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(name = "websteps-helper", version, about)]
pub struct Config {
    /// Address the helper API listens on
    #[arg(long, env = "WEBSTEPS_LISTEN", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen: SocketAddr,

    /// Log level
    #[arg(long, value_enum, env = "WEBSTEPS_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, env = "WEBSTEPS_LOG_FORMAT", default_value = "plain")]
    pub log_format: LogFormat,

    /// Upper bound for a whole measurement in seconds
    #[arg(long, env = "WEBSTEPS_TIMEOUT", default_value_t = MEASURE_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Follow Alt-Svc advertisements and measure HTTP/3 endpoints
    #[arg(long, env = "WEBSTEPS_ENABLE_QUIC", default_value_t = true, action = ArgAction::Set)]
    pub enable_quic: bool,

    /// User-Agent used when the client did not submit one
    #[arg(long, env = "WEBSTEPS_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            timeout_seconds: MEASURE_TIMEOUT_SECS,
            enable_quic: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
