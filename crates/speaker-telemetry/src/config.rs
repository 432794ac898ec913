//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name recorded on startup
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error, or a full directive)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Include file and line number in each event
    pub source_location: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "speaker".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            source_location: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SPEAKER_SERVICE_NAME`: Service name (default: speaker)
    /// - `SPEAKER_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `SPEAKER_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `SPEAKER_LOG_SOURCE`: Include file/line (default: false)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("SPEAKER_SERVICE_NAME")
                .unwrap_or_else(|_| "speaker".to_string()),

            log_level: env::var("SPEAKER_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("SPEAKER_JSON_LOGS")
                .map(|v| flag(&v))
                .unwrap_or(is_container),

            source_location: env::var("SPEAKER_LOG_SOURCE")
                .map(|v| flag(&v))
                .unwrap_or(false),
        }
    }

    /// Configuration for test runs: debug output from the speaker crates only.
    pub fn for_tests() -> Self {
        Self {
            service_name: "speaker-tests".to_string(),
            log_level: "speaker_core=debug,speaker_bus=debug".to_string(),
            json_logs: false,
            source_location: true,
        }
    }
}

fn flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
