#![no_main]

use bytes::BytesMut;
use fallback_verifier::core::codec::FrameCodec;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Split arbitrary bytes into frames until the codec wants more or errors
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
});
