//! Tracing/logging initialization.
//!
//! Output is JSON by default so gate and audit events can be shipped as-is.
//! `RUST_LOG` controls filtering; `FLEETDESK_LOG_FORMAT=compact` switches to
//! human-readable lines for local work.

use tracing_subscriber::EnvFilter;

pub const ENV_LOG_FORMAT: &str = "FLEETDESK_LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVE: &str = "info";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Compact,
}

impl LogFormat {
    /// Unrecognized values fall back to JSON.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub directive: String,
    pub format: LogFormat,
    /// Route output through the libtest capture writer.
    pub test_writer: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            directive: DEFAULT_DIRECTIVE.to_string(),
            format: LogFormat::Json,
            test_writer: false,
        }
    }
}

impl TracingConfig {
    pub fn from_env() -> Self {
        Self {
            format: std::env::var(ENV_LOG_FORMAT)
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Compact output captured per test, filtered at `debug` for FleetDesk crates.
    pub fn for_tests() -> Self {
        Self {
            directive: "warn,fleetdesk_auth=debug,fleetdesk_audit=debug,fleetdesk_api=debug".to_string(),
            format: LogFormat::Compact,
            test_writer: true,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.directive))
    }
}

/// Initialize tracing/logging for the process from environment settings.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(&TracingConfig::from_env());
}

/// Install a global subscriber built from `config`. Returns `false` if one was
/// already installed.
pub fn init_with(config: &TracingConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    match (config.format, config.test_writer) {
        (LogFormat::Json, false) => builder.json().try_init().is_ok(),
        (LogFormat::Json, true) => builder.json().with_test_writer().try_init().is_ok(),
        (LogFormat::Compact, false) => builder.compact().with_target(true).try_init().is_ok(),
        (LogFormat::Compact, true) => builder.compact().with_target(true).with_test_writer().try_init().is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_defaults_to_json() {
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse(" TEXT "), LogFormat::Compact);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Json);
    }

    #[test]
    fn second_init_is_a_no_op() {
        init_with(&TracingConfig::for_tests());
        assert!(!init_with(&TracingConfig::for_tests()));
        init();
    }
}
