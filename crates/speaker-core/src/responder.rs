//! Responder - the other side of the conversation.
//!
//! Listens on the request channel and answers each request on the reply
//! channel, echoing the request id and process identity so the originating
//! speaker can match the reply.

use crate::config::SpeakerConfig;
use crate::envelope::RequestEnvelope;
use crate::error::SpeakerResult;
use serde_json::Value;
use speaker_bus::{MessagePublisher, MessageSubscriber};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running responder. Dropping it stops the responder and releases its
/// subscriber connection.
pub struct Responder {
    task: JoinHandle<()>,
}

impl Responder {
    /// Subscribe to `config.request_channel` and answer requests with
    /// `handler`. Returning `None` from the handler stays silent; the
    /// responder still counts toward the speaker's expected replies.
    pub async fn spawn<F>(
        config: &SpeakerConfig,
        publisher: Arc<dyn MessagePublisher>,
        subscriber: Arc<dyn MessageSubscriber>,
        handler: F,
    ) -> SpeakerResult<Self>
    where
        F: Fn(&RequestEnvelope) -> Option<Value> + Send + Sync + 'static,
    {
        let mut stream = subscriber.messages();
        subscriber.subscribe(&config.request_channel).await?;

        let request_channel = config.request_channel.clone();
        let reply_channel = config.reply_channel.clone();

        let task = tokio::spawn(async move {
            // Keep the connection (and its subscription) alive with the task.
            let _subscriber = subscriber;
            info!(request_channel = %request_channel, "Responder started");

            while let Some(message) = stream.recv().await {
                if !message.is_on(&request_channel) {
                    continue;
                }

                let request = match RequestEnvelope::decode(&message.payload) {
                    Ok(request) => request,
                    Err(e) => {
                        debug!(error = %e, "Ignoring malformed request");
                        continue;
                    }
                };

                let Some(answer) = handler(&request) else {
                    debug!(request_id = %request.request_id, "Responder declined request");
                    continue;
                };

                let payload = match request.reply(answer).encode() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(request_id = %request.request_id, error = %e, "Failed to encode reply");
                        continue;
                    }
                };

                if let Err(e) = publisher.publish(&reply_channel, payload).await {
                    warn!(request_id = %request.request_id, error = %e, "Failed to publish reply");
                }
            }

            info!(request_channel = %request_channel, "Responder stopped");
        });

        Ok(Self { task })
    }

    /// Stop answering requests.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        self.task.abort();
    }
}
