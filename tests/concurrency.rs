#![allow(clippy::unwrap_used)]
//! Concurrent use of a shared codec, its buffer pool and metrics

use std::sync::Arc;

use overlay_wire::config::WireConfig;
use overlay_wire::core::codec::MessageCodec;
use overlay_wire::protocol::{RelayPingSample, RelayUpdateMessage, SessionData};
use tokio::task::JoinSet;

fn relay_update(seed: usize) -> RelayUpdateMessage {
    RelayUpdateMessage {
        address: Some(format!("10.0.{}.{}:40000", (seed >> 8) & 0xFF, seed & 0xFF).parse().unwrap()),
        sequence: seed as u16,
        ack: (seed as u16).wrapping_sub((seed % 80) as u16),
        current_time: 1_700_000_000 + seed as u64,
        samples: (0..(seed % 16) as i32)
            .map(|i| RelayPingSample {
                relay_index: i * 3,
                rtt: (i * 7) as u8,
                jitter: i as u8,
                packet_loss: (i * 100) as u16,
            })
            .collect(),
        relay_version: format!("1.{}.0", seed % 10),
        counters: vec![seed as u64; seed % 8],
        ..RelayUpdateMessage::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_encode_decode_heavy() {
    let iterations = 2_000usize;
    let workers = 8usize;
    let config = WireConfig::default_with_overrides(|c| c.codec.buffer_pool_size = 4);
    let codec = Arc::new(MessageCodec::new(&config).unwrap());

    let mut tasks = JoinSet::new();
    for worker in 0..workers {
        let codec = codec.clone();
        tasks.spawn(async move {
            for i in 0..iterations {
                let seed = worker * iterations + i;
                let mut update = relay_update(seed);
                let packet = codec.encode(&mut update).unwrap();
                let decoded: RelayUpdateMessage = codec.decode(&packet).unwrap();
                assert_eq!(decoded, update);

                let mut data = SessionData {
                    session_id: seed as u64,
                    slice_number: i as u32,
                    route_relays: vec![seed as u64; i % 6],
                    ..SessionData::default()
                };
                let packet = codec.encode(&mut data).unwrap();
                let decoded: SessionData = codec.decode(&packet).unwrap();
                assert_eq!(decoded, data);
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    let snapshot = codec.metrics().snapshot();
    let total = (workers * iterations * 2) as u64;
    assert_eq!(snapshot.messages_encoded, total);
    assert_eq!(snapshot.messages_decoded, total);
    assert_eq!(snapshot.encode_failures, 0);
    assert_eq!(snapshot.decode_failures, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_are_counted() {
    let codec = Arc::new(MessageCodec::new(&WireConfig::default()).unwrap());
    let workers = 4usize;
    let per_worker = 500usize;

    let mut tasks = JoinSet::new();
    for _ in 0..workers {
        let codec = codec.clone();
        tasks.spawn(async move {
            for _ in 0..per_worker {
                // version 0 is below the supported range
                assert!(codec.decode::<SessionData>(&[0u8; 8]).is_err());
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    let snapshot = codec.metrics().snapshot();
    assert_eq!(snapshot.decode_failures, (workers * per_worker) as u64);
    assert_eq!(snapshot.validation_errors, (workers * per_worker) as u64);
}
