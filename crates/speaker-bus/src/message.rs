//! # Bus Messages
//!
//! The unit of delivery on a subscriber connection.

use bytes::Bytes;

/// A message delivered to a subscriber connection.
///
/// Carries the channel it was published on so a connection subscribed to
/// several channels can tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Channel the message was published on.
    pub channel: String,
    /// Raw payload, uninterpreted by the bus.
    pub payload: Bytes,
}

impl BusMessage {
    /// Create a new message.
    pub fn new(channel: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// Whether this message was published on `channel`.
    #[must_use]
    pub fn is_on(&self, channel: &str) -> bool {
        self.channel == channel
    }
}
