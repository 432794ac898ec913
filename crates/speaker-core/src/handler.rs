//! Reply handler - filters inbound bus traffic down to replies for this
//! speaker's pending requests.
//!
//! Runs once per inbound message on the dispatcher task. Never blocks and
//! never fails: anything that is not a usable reply is dropped and counted.

use crate::envelope::ReplyEnvelope;
use crate::identity::ProcessIdentity;
use crate::registry::{ReplyOutcome, RequestRegistry};
use speaker_bus::BusMessage;
use std::sync::Arc;
use tracing::debug;

/// What the handler did with one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// Payload did not parse as a reply envelope.
    Malformed,
    /// Arrived on a channel other than the reply channel.
    ForeignChannel,
    /// Belongs to another speaker instance.
    ForeignProcess,
    /// Envelope carried no request id.
    MissingRequestId,
    /// Request id unknown or already finished.
    UnknownRequest,
    /// Appended to a pending request.
    Accepted,
    /// Appended and completed its request.
    Completed,
}

impl ReplyDisposition {
    pub fn is_dropped(&self) -> bool {
        !matches!(self, Self::Accepted | Self::Completed)
    }
}

#[derive(Clone)]
pub struct ReplyHandler {
    reply_channel: Arc<str>,
    process_identity: ProcessIdentity,
    registry: Arc<RequestRegistry>,
}

impl ReplyHandler {
    pub fn new(
        reply_channel: &str,
        process_identity: ProcessIdentity,
        registry: Arc<RequestRegistry>,
    ) -> Self {
        Self {
            reply_channel: Arc::from(reply_channel),
            process_identity,
            registry,
        }
    }

    pub fn reply_channel(&self) -> &str {
        &self.reply_channel
    }

    pub fn handle(&self, message: &BusMessage) -> ReplyDisposition {
        let disposition = self.dispatch(message);
        if disposition.is_dropped() {
            self.registry.stats().record_dropped();
            debug!(
                channel = %message.channel,
                process_identity = %self.process_identity,
                ?disposition,
                "Reply dropped"
            );
        }
        disposition
    }

    fn dispatch(&self, message: &BusMessage) -> ReplyDisposition {
        let Ok(envelope) = ReplyEnvelope::decode(&message.payload) else {
            return ReplyDisposition::Malformed;
        };

        if !message.is_on(&self.reply_channel) {
            return ReplyDisposition::ForeignChannel;
        }

        if envelope.process_identity != Some(self.process_identity) {
            return ReplyDisposition::ForeignProcess;
        }

        let Some(request_id) = envelope.request_id else {
            return ReplyDisposition::MissingRequestId;
        };

        match self.registry.record_reply(request_id, envelope.message) {
            ReplyOutcome::Unknown => ReplyDisposition::UnknownRequest,
            ReplyOutcome::Appended => ReplyDisposition::Accepted,
            ReplyOutcome::Completed => ReplyDisposition::Completed,
        }
    }
}
