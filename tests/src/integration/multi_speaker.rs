//! # Shared Channels
//!
//! Several speakers on the same request and reply channels. Every speaker
//! sees every reply; the process identity keeps them apart.

#[cfg(test)]
mod tests {
    use crate::fixtures::BusHarness;
    use serde_json::json;
    use speaker_bus::{MessagePublisher, MessageSubscriber};
    use speaker_core::RequestEnvelope;
    use std::time::Duration;

    /// Test: two speakers never receive each other's replies
    #[tokio::test(start_paused = true)]
    async fn test_e2e_speakers_share_channels_without_cross_talk() -> anyhow::Result<()> {
        let harness = BusHarness::new(1000);
        let alice = harness.speaker().await?;
        let bob = harness.speaker().await?;
        let _r1 = harness.echo_responder().await?;
        let _r2 = harness.echo_responder().await?;

        let (alice_msg, bob_msg) = (json!("alice"), json!("bob"));
        let (from_alice, from_bob) = tokio::join!(alice.send(&alice_msg), bob.send(&bob_msg));

        assert_eq!(from_alice?, vec![json!("alice"), json!("alice")]);
        assert_eq!(from_bob?, vec![json!("bob"), json!("bob")]);

        // Let both dispatchers drain the other speaker's replies.
        tokio::time::sleep(Duration::from_millis(10)).await;

        for speaker in [&alice, &bob] {
            let stats = speaker.stats();
            assert_eq!(stats.replies_accepted, 2);
            assert_eq!(stats.replies_dropped, 2);
            assert_eq!(stats.total_completed, 1);
        }
        Ok(())
    }

    /// Test: a duplicate reply after completion is dropped
    #[tokio::test(start_paused = true)]
    async fn test_e2e_reply_after_completion_dropped() -> anyhow::Result<()> {
        let harness = BusHarness::new(1000);
        let speaker = harness.speaker().await?;

        let conn = harness.bus.connect();
        let mut requests = conn.messages();
        conn.subscribe(&harness.config.request_channel).await?;

        let bus = harness.bus.clone();
        let reply_channel = harness.config.reply_channel.clone();
        let twice = async move {
            let msg = requests.recv().await.expect("request");
            let request = RequestEnvelope::decode(&msg.payload).expect("envelope");
            for answer in ["first", "second"] {
                let payload = request.reply(json!(answer)).encode().expect("encode");
                bus.publish(&reply_channel, payload).await.expect("publish");
            }
        };

        let once = json!("once");
        let (results, ()) = tokio::join!(speaker.send(&once), twice);
        assert_eq!(results?, vec![json!("first")]);

        tokio::time::sleep(Duration::from_millis(10)).await;

        let stats = speaker.stats();
        assert_eq!(stats.replies_accepted, 1);
        assert_eq!(stats.replies_dropped, 1);
        assert_eq!(speaker.pending_count(), 0);
        Ok(())
    }

    /// Test: a speaker keeps working after its neighbour is dropped
    #[tokio::test(start_paused = true)]
    async fn test_e2e_dropping_one_speaker_leaves_the_other() -> anyhow::Result<()> {
        let harness = BusHarness::new(1000);
        let keeper = harness.speaker().await?;
        let leaver = harness.speaker().await?;
        let _responder = harness.echo_responder().await?;

        assert_eq!(leaver.send(&json!("bye")).await?, vec![json!("bye")]);
        drop(leaver);

        assert_eq!(keeper.send(&json!("still here")).await?, vec![json!("still here")]);
        Ok(())
    }
}
