//! Identifiers for requests and speaker instances.
//!
//! Request ids use UUID v7 so they sort by creation time in logs; process
//! identities use UUID v4.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlates a published request with its replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new request ID (UUID v7)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identity of one running speaker instance.
///
/// Stamped on every request so replies meant for another speaker sharing
/// the same channels can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessIdentity(Uuid);

impl ProcessIdentity {
    /// Generate a new process identity (UUID v4)
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for ProcessIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ProcessIdentity {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Source of fresh identifiers.
pub trait IdentitySource: Send + Sync {
    /// Identity for a newly constructed speaker.
    fn process_identity(&self) -> ProcessIdentity;

    /// Identity for a newly issued request.
    fn request_id(&self) -> RequestId;
}

/// Default identity source backed by random/time-ordered UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdentitySource;

impl IdentitySource for UuidIdentitySource {
    fn process_identity(&self) -> ProcessIdentity {
        ProcessIdentity::new()
    }

    fn request_id(&self) -> RequestId {
        RequestId::new()
    }
}
