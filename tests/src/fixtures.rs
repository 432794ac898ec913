//! # Test Fixtures
//!
//! A harness that owns one in-memory bus and hands out speakers,
//! responders and silent subscribers connected to it.

use serde_json::Value;
use speaker_bus::{BusConnection, InMemoryMessageBus, MessageSubscriber};
use speaker_core::{
    RequestEnvelope, Responder, Speaker, SpeakerConfig, SpeakerError, SpeakerResult,
};
use speaker_telemetry::{init_tracing, TelemetryConfig};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install debug-level tracing once per test binary.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        // Another harness may already own the global subscriber.
        let _ = init_tracing(&TelemetryConfig::for_tests());
    });
}

/// One bus plus the configuration every participant shares.
pub struct BusHarness {
    pub bus: Arc<InMemoryMessageBus>,
    pub config: SpeakerConfig,
}

impl BusHarness {
    /// Harness with the given per-request deadline.
    pub fn new(timeout_ms: u64) -> Self {
        init_test_tracing();
        Self {
            bus: Arc::new(InMemoryMessageBus::new()),
            config: SpeakerConfig::default()
                .with_timeout_ms(timeout_ms)
                .with_auto_connect(true),
        }
    }

    /// A subscribed speaker with its own subscriber connection.
    pub async fn speaker(&self) -> SpeakerResult<Speaker> {
        Speaker::new(
            self.config.clone(),
            self.bus.clone(),
            Arc::new(self.bus.connect()),
        )
        .await
    }

    /// A responder answering with `handler`.
    pub async fn responder<F>(&self, handler: F) -> SpeakerResult<Responder>
    where
        F: Fn(&RequestEnvelope) -> Option<Value> + Send + Sync + 'static,
    {
        Responder::spawn(
            &self.config,
            self.bus.clone(),
            Arc::new(self.bus.connect()),
            handler,
        )
        .await
    }

    /// A responder that replies with the request's own message.
    pub async fn echo_responder(&self) -> SpeakerResult<Responder> {
        self.responder(|request| Some(request.message.clone())).await
    }

    /// A connection subscribed to the request channel that never answers.
    pub async fn silent_responder(&self) -> Result<BusConnection, SpeakerError> {
        let conn = self.bus.connect();
        conn.subscribe(&self.config.request_channel).await?;
        Ok(conn)
    }

    /// Number of connections listening for requests.
    pub fn responder_count(&self) -> usize {
        self.bus.subscriber_count(&self.config.request_channel)
    }
}
