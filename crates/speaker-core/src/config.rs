//! Speaker configuration with validation.

use crate::{DEFAULT_REPLY_CHANNEL, DEFAULT_REQUEST_CHANNEL, DEFAULT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} channel name cannot be empty")]
    EmptyChannel(&'static str),

    #[error("request and reply channels must differ (both are {0:?})")]
    SharedChannel(String),

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Speaker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerConfig {
    /// Channel requests are broadcast on
    pub request_channel: String,
    /// Channel replies come back on
    pub reply_channel: String,
    /// Deadline per request, in milliseconds (default: 5000)
    pub timeout_ms: u64,
    /// Subscribe to the reply channel during construction
    pub auto_connect: bool,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            request_channel: DEFAULT_REQUEST_CHANNEL.to_string(),
            reply_channel: DEFAULT_REPLY_CHANNEL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            auto_connect: false,
        }
    }
}

impl SpeakerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_channel.is_empty() {
            return Err(ConfigError::EmptyChannel("request"));
        }

        if self.reply_channel.is_empty() {
            return Err(ConfigError::EmptyChannel("reply"));
        }

        if self.request_channel == self.reply_channel {
            return Err(ConfigError::SharedChannel(self.request_channel.clone()));
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout("timeout cannot be 0".into()));
        }

        Ok(())
    }

    /// Per-request deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn with_request_channel(mut self, channel: impl Into<String>) -> Self {
        self.request_channel = channel.into();
        self
    }

    pub fn with_reply_channel(mut self, channel: impl Into<String>) -> Self {
        self.reply_channel = channel.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }
}
