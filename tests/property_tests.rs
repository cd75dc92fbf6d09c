//! Property-based tests using proptest
//!
//! Invariants of the wire layer and the admission structures checked over
//! randomly generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::{Bytes, BytesMut};
use fallback_verifier::admission::AdmissionQueue;
use fallback_verifier::core::codec::FrameCodec;
use fallback_verifier::core::varint::{decode_varint, encode_varint, varint_size};
use fallback_verifier::protocol::registry::ConnectionState;
use fallback_verifier::protocol::{Dispatcher, ProtocolVersion};
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use tokio_util::codec::{Decoder, Encoder};

// Property: varints round-trip and use the minimal width
proptest! {
    #[test]
    fn prop_varint_roundtrip_minimal(value in any::<u32>()) {
        let encoded = encode_varint(value);
        let expected_len = match value {
            0..=0x7F => 1,
            0x80..=0x3FFF => 2,
            0x4000..=0x1F_FFFF => 3,
            0x20_0000..=0x0FFF_FFFF => 4,
            _ => 5,
        };
        prop_assert_eq!(encoded.len(), expected_len);
        prop_assert_eq!(varint_size(value), expected_len);
        prop_assert_eq!(decode_varint(&encoded).unwrap(), (value, expected_len));
    }
}

// Property: any truncation of a multi-byte varint is reported, never misread
proptest! {
    #[test]
    fn prop_truncated_varint_fails(value in 0x80u32..) {
        let encoded = encode_varint(value);
        for cut in 1..encoded.len() {
            prop_assert!(decode_varint(&encoded[..cut]).is_err());
        }
    }
}

// Property: version ordering follows numeric ids; unknown ids never panic
proptest! {
    #[test]
    fn prop_version_order_matches_ids(a in 0usize..ProtocolVersion::SUPPORTED.len(), b in 0usize..ProtocolVersion::SUPPORTED.len()) {
        let (va, vb) = (ProtocolVersion::SUPPORTED[a], ProtocolVersion::SUPPORTED[b]);
        prop_assert_eq!(va.cmp(&vb), va.id().cmp(&vb.id()));
        prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
    }

    #[test]
    fn prop_from_id_total(id in any::<i32>()) {
        let version = ProtocolVersion::from_id(id);
        prop_assert!(version.is_unknown() || version.id() == id);
    }
}

// Property: frames survive arbitrary read boundaries
proptest! {
    #[test]
    fn prop_frames_survive_fragmentation(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..600), 1..8),
        chunk in 1usize..64,
    ) {
        let mut codec = FrameCodec::new();
        let mut wire = BytesMut::new();
        for payload in &payloads {
            codec.encode(Bytes::copy_from_slice(payload), &mut wire).unwrap();
        }

        let mut buffer = BytesMut::new();
        let mut decoded = Vec::new();
        for piece in wire.chunks(chunk) {
            buffer.extend_from_slice(piece);
            while let Some(frame) = codec.decode(&mut buffer).unwrap() {
                decoded.push(frame.to_vec());
            }
        }
        prop_assert_eq!(decoded, payloads);
    }
}

// Property: garbage frames produce errors or ignorable packets, never panics
proptest! {
    #[test]
    fn prop_dispatcher_never_panics(frame in prop::collection::vec(any::<u8>(), 0..256), state in 0u8..4) {
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_version(ProtocolVersion::LATEST);
        dispatcher.set_state(match state {
            0 => ConnectionState::Handshake,
            1 => ConnectionState::Login,
            2 => ConnectionState::Configuration,
            _ => ConnectionState::Game,
        });
        let _ = dispatcher.decode(&frame);
    }
}

// Property: each poll admits at most the batch size, oldest first
proptest! {
    #[test]
    fn prop_queue_fifo_batches(count in 0usize..200, batch in 1usize..50) {
        let queue = AdmissionQueue::new();
        let admitted = Arc::new(Mutex::new(Vec::new()));
        for i in 0..count {
            let addr = IpAddr::V4(Ipv4Addr::from(0x0A00_0000 + i as u32));
            let admitted = admitted.clone();
            let queued = queue
                .enqueue(addr, "fp", Box::new(move || admitted.lock().unwrap().push(i)))
                .unwrap();
            prop_assert!(queued);
        }

        let mut total = 0;
        while !queue.is_empty() {
            let polled = queue.poll(batch).unwrap();
            prop_assert!(polled <= batch);
            prop_assert!(polled > 0);
            total += polled;
        }
        prop_assert_eq!(total, count);
        let order = admitted.lock().unwrap().clone();
        prop_assert_eq!(order, (0..count).collect::<Vec<_>>());
    }
}
