//! # Speaker Benchmarks
//!
//! Hot paths on the reply side of a scatter-gather request:
//!
//! | Path | Work per item |
//! |------|---------------|
//! | Registry cycle | register, set mount, record N replies |
//! | Reply handler (own) | decode, identity checks, registry completion |
//! | Reply handler (foreign) | decode, identity check, drop |
//! | Envelope codec | JSON encode + decode of a request |

use bytes::Bytes;
use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use rand::Rng;
use serde_json::json;
use speaker_bus::BusMessage;
use speaker_core::{
    ProcessIdentity, ReplyEnvelope, ReplyHandler, RequestEnvelope, RequestId, RequestRegistry,
    DEFAULT_REPLY_CHANNEL, DEFAULT_REQUEST_CHANNEL,
};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Registry: one request from register to Full
// ============================================================================

fn bench_registry_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry-cycle");
    group.measurement_time(Duration::from_secs(5));

    let registry = RequestRegistry::new();

    for mount in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(mount as u64));
        group.bench_with_input(BenchmarkId::new("full_gather", mount), &mount, |b, &mount| {
            b.iter(|| {
                let request_id = RequestId::new();
                let mut completion = registry.register(request_id, "general");
                registry.set_mount(request_id, mount, DEFAULT_REQUEST_CHANNEL);
                for i in 0..mount {
                    registry.record_reply(request_id, json!(i));
                }
                black_box(completion.try_recv().is_ok())
            })
        });
    }

    group.finish();
}

// ============================================================================
// Reply handler: matching and non-matching traffic
// ============================================================================

fn reply_message(request_id: RequestId, process: ProcessIdentity) -> BusMessage {
    let payload = ReplyEnvelope {
        request_id: Some(request_id),
        process_identity: Some(process),
        message: json!({"node": rand::thread_rng().gen::<u32>()}),
    }
    .encode()
    .expect("encode reply");
    BusMessage::new(DEFAULT_REPLY_CHANNEL, payload)
}

fn bench_reply_handler(c: &mut Criterion) {
    let mut group = c.benchmark_group("reply-handler");

    let registry = Arc::new(RequestRegistry::new());
    let process = ProcessIdentity::new();
    let handler = ReplyHandler::new(DEFAULT_REPLY_CHANNEL, process, registry.clone());

    // Fresh single-responder request per iteration; the measured reply
    // completes it and leaves the registry empty.
    group.bench_function("own_reply", |b| {
        b.iter_batched(
            || {
                let request_id = RequestId::new();
                let completion = registry.register(request_id, "general");
                registry.set_mount(request_id, 1, DEFAULT_REQUEST_CHANNEL);
                (completion, reply_message(request_id, process))
            },
            |(completion, own)| {
                let disposition = handler.handle(&own);
                black_box((disposition, completion))
            },
            BatchSize::SmallInput,
        )
    });

    let foreign = reply_message(RequestId::new(), ProcessIdentity::new());
    group.bench_function("foreign_process", |b| {
        b.iter(|| black_box(handler.handle(&foreign)))
    });

    let unknown = reply_message(RequestId::new(), process);
    group.bench_function("unknown_request", |b| {
        b.iter(|| black_box(handler.handle(&unknown)))
    });

    let garbage = BusMessage::new(DEFAULT_REPLY_CHANNEL, Bytes::from_static(b"{not json"));
    group.bench_function("malformed", |b| b.iter(|| black_box(handler.handle(&garbage))));

    group.finish();
}

// ============================================================================
// Envelope codec
// ============================================================================

fn bench_envelope_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope-codec");

    for fields in [1usize, 16, 256] {
        let message: serde_json::Map<_, _> = (0..fields)
            .map(|i| (format!("field_{i}"), json!(i)))
            .collect();
        let envelope = RequestEnvelope {
            request_id: RequestId::new(),
            request_type: "general".into(),
            message: message.into(),
            process_identity: ProcessIdentity::new(),
        };

        group.bench_with_input(BenchmarkId::new("request_roundtrip", fields), &envelope, |b, env| {
            b.iter(|| {
                let bytes = env.encode().expect("encode");
                black_box(RequestEnvelope::decode(&bytes).expect("decode"))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_registry_cycle,
    bench_reply_handler,
    bench_envelope_codec,
);

criterion_main!(benches);
