//! # Speaker Bus - Channel Pub/Sub Contract
//!
//! The message bus the speaker coordinates over. Mirrors the Redis pub/sub
//! model: named channels, `publish` returns the number of subscribed
//! connections, and each subscriber connection receives every message for
//! every channel it subscribed to on a single stream.
//!
//! ```text
//! ┌──────────────┐   publish(channel)   ┌──────────────┐
//! │  Publisher   │ ───────────────────▶ │  Message Bus │
//! └──────────────┘   -> subscriber cnt  │              │
//!                                       └──────┬───────┘
//!                         (channel, payload)   │
//!                  ┌───────────────────────────┼───────────────┐
//!                  ▼                           ▼               ▼
//!           ┌────────────┐              ┌────────────┐  ┌────────────┐
//!           │ Connection │              │ Connection │  │ Connection │
//!           └────────────┘              └────────────┘  └────────────┘
//! ```
//!
//! Delivery is at-most-once: a connection whose stream lags behind loses
//! the overflowed messages.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod message;
pub mod publisher;
pub mod subscriber;

pub use message::BusMessage;
pub use publisher::{InMemoryMessageBus, MessagePublisher};
pub use subscriber::{BusConnection, MessageStream, MessageSubscriber};

use thiserror::Error;

/// Maximum messages buffered per connection before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Errors surfaced by bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus or connection was shut down.
    #[error("message bus closed")]
    Closed,

    /// Internal subscription table lock was poisoned.
    #[error("subscription table lock poisoned")]
    LockPoisoned,

    /// Channel names must be non-empty.
    #[error("invalid channel name: {0:?}")]
    InvalidChannel(String),

    /// Transport-level failure reported by an external bus implementation.
    #[error("transport error: {0}")]
    Transport(String),
}
