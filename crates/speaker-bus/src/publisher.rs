//! # Message Publisher
//!
//! Defines the publishing side of the bus and the in-memory bus itself.

use crate::message::BusMessage;
use crate::subscriber::BusConnection;
use crate::{BusError, DEFAULT_CHANNEL_CAPACITY};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

/// Channel name -> (connection id -> that connection's delivery sender).
pub(crate) type ChannelTable = HashMap<String, HashMap<u64, broadcast::Sender<BusMessage>>>;

/// Trait for publishing messages to a channel.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a payload on a channel.
    ///
    /// # Returns
    ///
    /// The number of connections subscribed to `channel` at the moment of
    /// publication. Zero means nobody will see the message.
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<usize, BusError>;

    /// Get the total number of messages published through this handle.
    fn messages_published(&self) -> u64;
}

/// In-memory implementation of the message bus.
///
/// Each subscriber connection owns a `tokio::sync::broadcast` channel; the
/// bus keeps a table of which connections listen on which channels and
/// fans published messages out to them. Suitable for single-process use and
/// tests; distributed deployments plug a Redis-backed implementation in
/// behind the same traits.
pub struct InMemoryMessageBus {
    /// Subscription table shared with every connection.
    channels: Arc<RwLock<ChannelTable>>,

    /// Source of connection ids.
    next_connection_id: AtomicU64,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Per-connection buffer capacity.
    capacity: usize,
}

impl InMemoryMessageBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with specified per-connection capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            next_connection_id: AtomicU64::new(1),
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Open a new subscriber connection.
    ///
    /// The connection receives nothing until it subscribes to a channel.
    #[must_use]
    pub fn connect(&self) -> BusConnection {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let (sender, _) = broadcast::channel(self.capacity);

        debug!(connection = id, "New bus connection opened");

        BusConnection::new(id, sender, self.channels.clone())
    }

    /// Number of connections currently subscribed to `channel`.
    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .map(|table| table.get(channel).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    /// Get the per-connection capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn deliver(&self, channel: &str, payload: Bytes) -> Result<usize, BusError> {
        let table = self.channels.read().map_err(|_| BusError::LockPoisoned)?;

        let Some(subscribers) = table.get(channel) else {
            return Ok(0);
        };

        let message = BusMessage::new(channel, payload);
        for (connection, sender) in subscribers {
            // A subscribed connection with no open stream still counts, the
            // same way a Redis client that never reads is still a subscriber.
            if sender.send(message.clone()).is_err() {
                debug!(connection = *connection, channel, "Connection has no open stream");
            }
        }

        Ok(subscribers.len())
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryMessageBus {
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<usize, BusError> {
        if channel.is_empty() {
            return Err(BusError::InvalidChannel(channel.to_string()));
        }

        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let receivers = self.deliver(channel, payload)?;
        debug!(channel, receivers, "Message published");
        Ok(receivers)
    }

    fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}
