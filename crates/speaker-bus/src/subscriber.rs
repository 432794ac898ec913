//! # Message Subscriber
//!
//! Defines the subscription side of the bus.

use crate::message::BusMessage;
use crate::publisher::ChannelTable;
use crate::BusError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait for a subscriber connection.
///
/// A connection subscribes to any number of channels; every message for any
/// of them arrives on the streams returned by [`MessageSubscriber::messages`].
#[async_trait]
pub trait MessageSubscriber: Send + Sync {
    /// Register interest in a channel. Delivery begins afterward.
    async fn subscribe(&self, channel: &str) -> Result<(), BusError>;

    /// Withdraw interest in a channel.
    async fn unsubscribe(&self, channel: &str) -> Result<(), BusError>;

    /// Open a stream of inbound messages for this connection.
    ///
    /// Only messages published after the stream is opened are received.
    fn messages(&self) -> MessageStream;
}

/// A subscriber connection on the in-memory bus.
///
/// When dropped, the connection is removed from every channel it joined.
pub struct BusConnection {
    /// Connection id, unique per bus.
    id: u64,

    /// Delivery sender; the subscription table holds clones of it.
    sender: broadcast::Sender<BusMessage>,

    /// Reference to the bus subscription table (for cleanup).
    channels: Arc<RwLock<ChannelTable>>,

    /// Channels this connection is subscribed to.
    subscribed: Mutex<HashSet<String>>,
}

impl BusConnection {
    pub(crate) fn new(
        id: u64,
        sender: broadcast::Sender<BusMessage>,
        channels: Arc<RwLock<ChannelTable>>,
    ) -> Self {
        Self {
            id,
            sender,
            channels,
            subscribed: Mutex::new(HashSet::new()),
        }
    }

    /// Get the connection id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Channels this connection is currently subscribed to.
    #[must_use]
    pub fn subscribed_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self
            .subscribed
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        channels.sort();
        channels
    }

    fn join(&self, channel: &str) -> Result<(), BusError> {
        let mut table = self.channels.write().map_err(|_| BusError::LockPoisoned)?;
        table
            .entry(channel.to_string())
            .or_default()
            .insert(self.id, self.sender.clone());

        let mut subscribed = self.subscribed.lock().map_err(|_| BusError::LockPoisoned)?;
        subscribed.insert(channel.to_string());
        Ok(())
    }

    fn leave(&self, channel: &str) -> Result<(), BusError> {
        let mut table = self.channels.write().map_err(|_| BusError::LockPoisoned)?;
        if let Some(connections) = table.get_mut(channel) {
            connections.remove(&self.id);
            if connections.is_empty() {
                table.remove(channel);
            }
        }

        let mut subscribed = self.subscribed.lock().map_err(|_| BusError::LockPoisoned)?;
        subscribed.remove(channel);
        Ok(())
    }
}

#[async_trait]
impl MessageSubscriber for BusConnection {
    async fn subscribe(&self, channel: &str) -> Result<(), BusError> {
        if channel.is_empty() {
            return Err(BusError::InvalidChannel(channel.to_string()));
        }
        self.join(channel)?;
        debug!(connection = self.id, channel, "Subscribed");
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), BusError> {
        self.leave(channel)?;
        debug!(connection = self.id, channel, "Unsubscribed");
        Ok(())
    }

    fn messages(&self) -> MessageStream {
        MessageStream::new(self.sender.subscribe())
    }
}

impl Drop for BusConnection {
    fn drop(&mut self) {
        let Ok(subscribed) = self.subscribed.get_mut() else {
            return;
        };
        let Ok(mut table) = self.channels.write() else {
            return;
        };

        for channel in subscribed.drain() {
            let Some(connections) = table.get_mut(&channel) else {
                continue;
            };
            connections.remove(&self.id);
            if connections.is_empty() {
                table.remove(&channel);
            }
        }
        debug!(connection = self.id, "Bus connection closed");
    }
}

/// A stream of messages delivered to one connection.
pub struct MessageStream {
    receiver: broadcast::Receiver<BusMessage>,
}

impl MessageStream {
    /// Wrap a broadcast receiver.
    #[must_use]
    pub fn new(receiver: broadcast::Receiver<BusMessage>) -> Self {
        Self { receiver }
    }

    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next delivered message
    /// - `None` - The connection was closed
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(lagged = count, "Subscriber lagged, messages dropped");
                }
            }
        }
    }

    /// Try to receive the next message without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was available
    /// - `Ok(None)` - No message available (would block)
    /// - `Err(BusError::Closed)` - The connection was closed
    pub fn try_recv(&mut self) -> Result<Option<BusMessage>, BusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Ok(Some(message)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(BusError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            }
        }
    }
}
