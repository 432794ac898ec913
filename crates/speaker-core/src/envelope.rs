//! Wire envelopes for the request and reply channels.
//!
//! Both travel as JSON objects with camelCase keys:
//!
//! ```text
//! request: { "requestId", "type", "message", "processIdentity" }
//! reply:   { "requestId", "processIdentity", "message" }
//! ```
//!
//! `speakerGuid` and `processGuid` are accepted as aliases when decoding so
//! responders built for older deployments keep working.

use crate::identity::{ProcessIdentity, RequestId};
use crate::DEFAULT_REQUEST_TYPE;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Broadcast once per `send` on the request channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    #[serde(alias = "speakerGuid")]
    pub request_id: RequestId,
    #[serde(rename = "type", default = "default_request_type")]
    pub request_type: String,
    #[serde(default)]
    pub message: Value,
    #[serde(alias = "processGuid")]
    pub process_identity: ProcessIdentity,
}

fn default_request_type() -> String {
    DEFAULT_REQUEST_TYPE.to_string()
}

impl RequestEnvelope {
    pub fn encode(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Build the reply a responder sends back for this request.
    pub fn reply(&self, message: Value) -> ReplyEnvelope {
        ReplyEnvelope {
            request_id: Some(self.request_id),
            process_identity: Some(self.process_identity),
            message,
        }
    }
}

/// One responder's answer, delivered on the reply channel.
///
/// Identity fields are optional on the wire; a reply missing either is
/// dropped by the speaker rather than failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyEnvelope {
    #[serde(alias = "speakerGuid", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(alias = "processGuid", default, skip_serializing_if = "Option::is_none")]
    pub process_identity: Option<ProcessIdentity>,
    #[serde(default)]
    pub message: Value,
}

impl ReplyEnvelope {
    pub fn encode(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}
