//! Logging setup for Aqua applications
//!
//! The framework itself only emits `tracing` events. This module installs a
//! `tracing-subscriber` formatter for binaries that want one.
//!
//! Environment variables read by [`LogConfig::from_env`]:
//!
//! - `AQUA_DEBUG=1` - Enable debug logging
//! - `AQUA_LOG_LEVEL=trace|debug|info|warn|error` - Set log level
//! - `AQUA_LOG_FORMAT=json|plain|pretty|compact` - Set output format
//!
//! `RUST_LOG`, when set, overrides the level.
//!
//! ```no_run
//! use aqua_core::logging::*;
//!
//! LogConfig::from_env().init();
//! info!("Application started");
//! ```

use std::env;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use tracing::{debug, error, info, trace, warn};

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Convert to string for EnvFilter
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured, machine-readable (default)
    Json,
    Plain,
    /// Multi-line, for development
    Pretty,
    Compact,
}

impl LogFormat {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "plain" | "text" => Some(LogFormat::Plain),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include target (module path)
    pub targets: bool,
    pub timestamps: bool,
    /// Custom filter directive; overrides `level` when set
    pub env_filter: Option<String>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from `AQUA_*` environment variables.
    pub fn from_env() -> Self {
        let debug = env::var("AQUA_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let level = env::var("AQUA_LOG_LEVEL")
            .ok()
            .and_then(|s| LogLevel::from_str(&s))
            .unwrap_or(if debug { LogLevel::Debug } else { LogLevel::Info });

        let format = env::var("AQUA_LOG_FORMAT")
            .ok()
            .and_then(|s| LogFormat::from_str(&s))
            .unwrap_or(LogFormat::Json);

        Self {
            level,
            format,
            ..Self::default()
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.timestamps = enable;
        self
    }

    /// Set a filter such as `"aqua_core=debug,hyper=info"`.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(directive) => {
                EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
        }
    }

    /// Install the global subscriber.
    ///
    /// Returns `false` if a subscriber was already installed, in which case
    /// the existing one is kept.
    pub fn init(self) -> bool {
        let filter = self.filter();
        let registry = tracing_subscriber::registry().with(filter);

        let result = match (self.format, self.timestamps) {
            (LogFormat::Json, _) => registry
                .with(fmt::layer().json().with_target(self.targets))
                .try_init(),
            (LogFormat::Pretty, _) => registry
                .with(fmt::layer().pretty().with_target(self.targets))
                .try_init(),
            (LogFormat::Compact, true) => registry
                .with(fmt::layer().compact().with_target(self.targets))
                .try_init(),
            (LogFormat::Compact, false) => registry
                .with(fmt::layer().compact().without_time().with_target(self.targets))
                .try_init(),
            (LogFormat::Plain, true) => registry
                .with(fmt::layer().with_ansi(false).with_target(self.targets))
                .try_init(),
            (LogFormat::Plain, false) => registry
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .without_time()
                        .with_target(self.targets),
                )
                .try_init(),
        };
        result.is_ok()
    }
}

impl Default for LogConfig {
    /// JSON at INFO level
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            targets: true,
            timestamps: true,
            env_filter: None,
        }
    }
}
