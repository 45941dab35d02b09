//! Structured logging setup

use meetrtc_core::MeetRtcError;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_DIRECTIVE: &str = "meetrtc=info";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directive used when `RUST_LOG` is unset or invalid
    pub default_directive: String,
    /// Print event targets
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_directive: DEFAULT_LOG_DIRECTIVE.to_string(),
            with_target: true,
        }
    }
}

impl LogConfig {
    /// Config with a custom fallback directive
    pub fn with_directive(directive: &str) -> Self {
        Self {
            default_directive: directive.to_string(),
            ..Self::default()
        }
    }

    /// Filter from `RUST_LOG`, falling back to the configured directive
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.default_directive))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
    }
}

/// Install the global fmt subscriber
pub fn init_logging(config: &LogConfig) -> Result<(), MeetRtcError> {
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_target(config.with_target)
        .try_init()
        .map_err(|e| MeetRtcError::InvalidState {
            expected: "no global subscriber".to_string(),
            actual: e.to_string(),
        })
}
