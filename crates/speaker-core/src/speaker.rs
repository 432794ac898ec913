//! The speaker: broadcasts a request and gathers every responder's reply.

use crate::config::SpeakerConfig;
use crate::envelope::RequestEnvelope;
use crate::error::{SpeakerError, SpeakerResult};
use crate::handler::ReplyHandler;
use crate::identity::{IdentitySource, ProcessIdentity, RequestId, UuidIdentitySource};
use crate::registry::{MountOutcome, RequestRegistry, RequestState, StatsSnapshot};
use crate::DEFAULT_REQUEST_TYPE;
use serde::Serialize;
use serde_json::Value;
use speaker_bus::{MessagePublisher, MessageSubscriber};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

/// Scatter-gather coordinator over a publish/subscribe bus.
///
/// `send` publishes on the request channel and resolves with one payload
/// per responder, in arrival order. The number of responders expected is
/// the subscriber count the bus reports at publish time.
///
/// Outcomes:
/// - every expected reply arrived: `Ok` with all of them
/// - deadline passed with some replies: `Ok` with those (partial)
/// - deadline passed with none: `Err(SpeakerError::Timeout)`
/// - nobody subscribed: `Err(SpeakerError::NoResponders)`, immediately
///
/// Replies are only seen after [`Speaker::subscribe`] (or construction
/// with `auto_connect`); until then every request runs to its deadline.
pub struct Speaker {
    config: SpeakerConfig,
    process_identity: ProcessIdentity,
    identities: Arc<dyn IdentitySource>,
    publisher: Arc<dyn MessagePublisher>,
    subscriber: Arc<dyn MessageSubscriber>,
    registry: Arc<RequestRegistry>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Speaker {
    /// Create a speaker. Subscribes to the reply channel when
    /// `config.auto_connect` is set.
    ///
    /// `publisher` and `subscriber` may be backed by the same bus but are
    /// separate handles: a Redis connection in subscribe mode cannot publish.
    pub async fn new(
        config: SpeakerConfig,
        publisher: Arc<dyn MessagePublisher>,
        subscriber: Arc<dyn MessageSubscriber>,
    ) -> SpeakerResult<Self> {
        Self::with_identity_source(config, publisher, subscriber, Arc::new(UuidIdentitySource))
            .await
    }

    /// Create a speaker drawing identifiers from `identities`.
    pub async fn with_identity_source(
        config: SpeakerConfig,
        publisher: Arc<dyn MessagePublisher>,
        subscriber: Arc<dyn MessageSubscriber>,
        identities: Arc<dyn IdentitySource>,
    ) -> SpeakerResult<Self> {
        config.validate()?;

        let speaker = Self {
            process_identity: identities.process_identity(),
            identities,
            publisher,
            subscriber,
            registry: Arc::new(RequestRegistry::new()),
            dispatcher: Mutex::new(None),
            config,
        };

        info!(
            process_identity = %speaker.process_identity,
            request_channel = %speaker.config.request_channel,
            reply_channel = %speaker.config.reply_channel,
            timeout_ms = speaker.config.timeout_ms,
            "Speaker created"
        );

        if speaker.config.auto_connect {
            speaker.subscribe().await?;
        }

        Ok(speaker)
    }

    /// Subscribe to the reply channel and start dispatching replies.
    ///
    /// Calling this again while the dispatcher is running is a no-op. If the
    /// subscriber's stream has ended, the dispatcher is started again.
    pub async fn subscribe(&self) -> SpeakerResult<()> {
        let mut dispatcher = self.dispatcher.lock().await;
        match dispatcher.as_ref() {
            Some(task) if !task.is_finished() => {
                debug!(process_identity = %self.process_identity, "Already subscribed");
                return Ok(());
            }
            Some(_) => {
                info!(process_identity = %self.process_identity, "Restarting reply dispatcher");
                *dispatcher = None;
            }
            None => {}
        }

        // Open the stream before subscribing so nothing delivered in between is lost.
        let mut stream = self.subscriber.messages();
        self.subscriber.subscribe(&self.config.reply_channel).await?;

        let handler = self.reply_handler();
        *dispatcher = Some(tokio::spawn(async move {
            info!(reply_channel = %handler.reply_channel(), "Reply dispatcher started");
            while let Some(message) = stream.recv().await {
                handler.handle(&message);
            }
            warn!(
                reply_channel = %handler.reply_channel(),
                "Reply stream ended, dispatcher stopped"
            );
        }));

        Ok(())
    }

    /// Whether the reply dispatcher is running.
    pub async fn is_subscribed(&self) -> bool {
        self.dispatcher
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Broadcast `message` with the default request type (`"general"`).
    pub async fn send<T>(&self, message: &T) -> SpeakerResult<Vec<Value>>
    where
        T: Serialize + ?Sized,
    {
        self.send_typed(DEFAULT_REQUEST_TYPE, message).await
    }

    /// Broadcast `message` tagged with `request_type` and gather the replies.
    pub async fn send_typed<T>(&self, request_type: &str, message: &T) -> SpeakerResult<Vec<Value>>
    where
        T: Serialize + ?Sized,
    {
        let request_id = self.identities.request_id();
        let span = info_span!("speaker_send", request_id = %request_id, request_type = request_type);
        self.gather(request_id, request_type, message)
            .instrument(span)
            .await
    }

    async fn gather<T>(
        &self,
        request_id: RequestId,
        request_type: &str,
        message: &T,
    ) -> SpeakerResult<Vec<Value>>
    where
        T: Serialize + ?Sized,
    {
        let envelope = RequestEnvelope {
            request_id,
            request_type: request_type.to_string(),
            message: serde_json::to_value(message)?,
            process_identity: self.process_identity,
        };
        let payload = envelope.encode()?;

        let completion = self.registry.register(request_id, request_type);
        let mut guard = PendingGuard::new(&self.registry, request_id);

        let mount = self
            .publisher
            .publish(&self.config.request_channel, payload)
            .await?;

        debug!(
            request_id = %request_id,
            request_type = request_type,
            mount = mount,
            "Request published"
        );

        if self
            .registry
            .set_mount(request_id, mount, &self.config.request_channel)
            == MountOutcome::Active
        {
            self.arm_deadline(request_id);
        }
        guard.disarm();

        completion
            .await
            .unwrap_or_else(|_| Err(SpeakerError::Cancelled(request_id)))
    }

    /// Handler applied to every inbound message on the subscriber connection.
    pub fn reply_handler(&self) -> ReplyHandler {
        ReplyHandler::new(
            &self.config.reply_channel,
            self.process_identity,
            self.registry.clone(),
        )
    }

    pub fn config(&self) -> &SpeakerConfig {
        &self.config
    }

    pub fn process_identity(&self) -> ProcessIdentity {
        self.process_identity
    }

    /// Get number of requests still waiting on replies
    pub fn pending_count(&self) -> usize {
        self.registry.pending_count()
    }

    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.registry.is_pending(request_id)
    }

    pub fn request_state(&self, request_id: &RequestId) -> Option<RequestState> {
        self.registry.state(request_id)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.registry.stats().snapshot()
    }

    fn arm_deadline(&self, request_id: RequestId) {
        let registry = Arc::clone(&self.registry);
        let timeout = self.config.timeout();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            registry.expire(request_id, timeout);
        });

        self.registry.arm_timer(request_id, timer.abort_handle());
    }
}

impl Drop for Speaker {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.get_mut().take() {
            dispatcher.abort();
        }
    }
}

/// Discards a registered request if `send` is abandoned before its
/// deadline is armed. After that point the deadline cleans up.
struct PendingGuard<'a> {
    registry: &'a RequestRegistry,
    request_id: RequestId,
    disarmed: bool,
}

impl<'a> PendingGuard<'a> {
    fn new(registry: &'a RequestRegistry, request_id: RequestId) -> Self {
        Self {
            registry,
            request_id,
            disarmed: false,
        }
    }

    fn disarm(&mut self) {
        self.disarmed = true;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.disarmed {
            self.registry.discard(self.request_id);
        }
    }
}
