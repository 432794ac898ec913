//! # Speaker Telemetry
//!
//! Log output for processes embedding the speaker.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use speaker_telemetry::{init_tracing, TelemetryConfig};
//!
//! init_tracing(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SPEAKER_SERVICE_NAME` | `speaker` | Service name logged at startup |
//! | `SPEAKER_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `SPEAKER_JSON_LOGS` | `false` | JSON output, for log shippers |
//! | `SPEAKER_LOG_SOURCE` | `false` | Include file and line number |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}
