//! # Speaker Core - Scatter-Gather over Publish/Subscribe
//!
//! Turns a broadcast bus into a request/response primitive: one request is
//! published to every subscriber of the request channel, and the caller
//! gets back every reply that arrives on the reply channel before the
//! deadline.
//!
//! ```text
//!   send(msg)                                          responders
//! ┌──────────┐  publish(REQUEST) -> mount = 3   ┌───┐ ┌───┐ ┌───┐
//! │ Speaker  │ ───────────────────────────────▶ │ A │ │ B │ │ C │
//! │          │                                  └─┬─┘ └─┬─┘ └─┬─┘
//! │ registry │ ◀─────────── REPLY ──────────────────┴─────┴─────┘
//! └──────────┘
//!   Ok([a, b, c])       all 3 replied
//!   Ok([a, b])          deadline hit after 2
//!   Err(Timeout)        deadline hit with none
//!   Err(NoResponders)   mount was 0
//! ```
//!
//! The expected reply count ("mount") is the subscriber count the bus
//! reports for the publish, fixed for the life of the request.
//!
//! ## Usage
//!
//! ```ignore
//! use speaker_core::{Speaker, SpeakerConfig};
//!
//! let bus = Arc::new(InMemoryMessageBus::new());
//! let config = SpeakerConfig::default().with_auto_connect(true);
//! let speaker = Speaker::new(config, bus.clone(), Arc::new(bus.connect())).await?;
//!
//! let replies = speaker.send_typed("status", &json!({"verbose": true})).await?;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod identity;
pub mod registry;
pub mod responder;
pub mod speaker;

// Re-export main types
pub use config::{ConfigError, SpeakerConfig};
pub use envelope::{ReplyEnvelope, RequestEnvelope};
pub use error::{SpeakerError, SpeakerResult};
pub use handler::{ReplyDisposition, ReplyHandler};
pub use identity::{IdentitySource, ProcessIdentity, RequestId, UuidIdentitySource};
pub use registry::{RequestRegistry, RequestState, StatsSnapshot, Termination};
pub use responder::Responder;
pub use speaker::Speaker;

/// Default channel requests are broadcast on.
pub const DEFAULT_REQUEST_CHANNEL: &str = "REDIS_SPEAKER";

/// Default channel replies arrive on.
pub const DEFAULT_REPLY_CHANNEL: &str = "REDIS_LISTENER";

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Request type used when the caller does not name one.
pub const DEFAULT_REQUEST_TYPE: &str = "general";
