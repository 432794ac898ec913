//! Speaker error types.
//!
//! Only failures of the request itself surface here. Replies that cannot be
//! matched to a pending request are dropped inside the reply handler and
//! never become errors.

use crate::config::ConfigError;
use crate::identity::RequestId;
use speaker_bus::BusError;
use thiserror::Error;

/// Result alias for speaker operations.
pub type SpeakerResult<T> = Result<T, SpeakerError>;

#[derive(Debug, Error)]
pub enum SpeakerError {
    /// Nobody was subscribed to the request channel at publish time.
    #[error("no responders subscribed to {channel} for request {request_id}")]
    NoResponders {
        request_id: RequestId,
        channel: String,
    },

    /// The deadline passed without a single reply.
    #[error("request {request_id} timed out after {timeout_ms}ms with no replies")]
    Timeout {
        request_id: RequestId,
        timeout_ms: u64,
    },

    /// The completion signal was dropped without an outcome.
    #[error("request {0} was cancelled before completing")]
    Cancelled(RequestId),

    #[error("message bus error: {0}")]
    Bus(#[from] BusError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SpeakerError {
    /// Request this error belongs to, if it came from a request lifecycle.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::NoResponders { request_id, .. } | Self::Timeout { request_id, .. } => {
                Some(*request_id)
            }
            Self::Cancelled(request_id) => Some(*request_id),
            Self::Bus(_) | Self::Serialization(_) | Self::Config(_) => None,
        }
    }

    /// Replies collected before the failure. Always empty: a request that
    /// gathered any reply resolves successfully.
    pub fn results(&self) -> &[serde_json::Value] {
        &[]
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_no_responders(&self) -> bool {
        matches!(self, Self::NoResponders { .. })
    }
}
