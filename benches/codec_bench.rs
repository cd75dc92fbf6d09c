use bytes::{BufMut, Bytes, BytesMut};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use fallback_verifier::core::codec::FrameCodec;
use fallback_verifier::core::varint::{decode_varint, encode_varint};
use fallback_verifier::core::wire::WireWrite;
use fallback_verifier::protocol::packets::{Clientbound, KeepAlive};
use fallback_verifier::protocol::registry::{self, ConnectionState, Direction, PacketKind};
use fallback_verifier::protocol::{Dispatcher, ProtocolVersion};
use tokio_util::codec::{Decoder, Encoder};

#[allow(clippy::unwrap_used)]
fn bench_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_codec");
    let payload_sizes = [16usize, 256, 4096, 65536];

    for &size in &payload_sizes {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("encode_{size}b"), |b| {
            b.iter_batched(
                || Bytes::from(vec![1u8; size]),
                |payload| {
                    let mut buf = BytesMut::with_capacity(size + 3);
                    FrameCodec::new().encode(payload, &mut buf).unwrap();
                    buf
                },
                BatchSize::SmallInput,
            )
        });

        let mut wire = BytesMut::new();
        FrameCodec::new().encode(Bytes::from(vec![1u8; size]), &mut wire).unwrap();
        group.bench_function(format!("decode_{size}b"), |b| {
            b.iter_batched(
                || wire.clone(),
                |mut buf| FrameCodec::new().decode(&mut buf).unwrap(),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_varint(c: &mut Criterion) {
    let values = [0u32, 127, 25565, 2_097_151, u32::MAX];
    let encoded: Vec<Vec<u8>> = values.iter().map(|&v| encode_varint(v)).collect();

    c.bench_function("varint_encode", |b| {
        b.iter(|| values.iter().map(|&v| encode_varint(v).len()).sum::<usize>())
    });
    c.bench_function("varint_decode", |b| {
        b.iter(|| encoded.iter().map(|e| decode_varint(e).unwrap().0 as u64).sum::<u64>())
    });
}

#[allow(clippy::unwrap_used)]
fn bench_dispatcher(c: &mut Criterion) {
    let version = ProtocolVersion::LATEST;
    let mut dispatcher = Dispatcher::new();
    dispatcher.set_version(version);
    dispatcher.set_state(ConnectionState::Game);

    let id = registry::id_for(ConnectionState::Game, Direction::Serverbound, PacketKind::PositionRotation, version).unwrap();
    let mut frame = BytesMut::new();
    frame.put_varint(id);
    frame.put_f64(1000.5);
    frame.put_f64(64.0);
    frame.put_f64(-250.5);
    frame.put_f32(90.0);
    frame.put_f32(0.0);
    frame.put_u8(1);
    let frame = frame.freeze();

    c.bench_function("dispatch_movement", |b| b.iter(|| dispatcher.decode(&frame).unwrap()));

    let keep_alive = Clientbound::KeepAlive(KeepAlive { id: 0x1234_5678 });
    c.bench_function("encode_keep_alive", |b| b.iter(|| dispatcher.encode(&keep_alive).unwrap()));
}

criterion_group!(benches, bench_frames, bench_varint, bench_dispatcher);
criterion_main!(benches);
