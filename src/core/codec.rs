//! Length-prefixed frame codec.
//!
//! Inbound frames are prefixed with a varint of at most three bytes (21 bits).
//! Leading runs of zero bytes and zero-length frames are skipped, matching how
//! real servers tolerate keep-alive padding from some clients.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::core::varint::{varint_size, write_varint};
use crate::error::{constants, ProtocolError, Result};

/// Largest frame length expressible in a 21-bit varint.
pub const MAX_FRAME_LEN: usize = (1 << 21) - 1;

/// Max bytes in a frame length prefix.
const MAX_HEADER_LEN: usize = 3;

#[derive(Debug, PartialEq, Eq)]
enum Header {
    /// Not enough bytes buffered yet
    Incomplete,
    /// Only zero bytes are buffered; all of them can be dropped
    Zeroes(usize),
    /// A complete length prefix of `width` bytes
    Length { len: usize, width: usize },
}

fn scan_header(src: &[u8]) -> Result<Header> {
    let zeroes = src.iter().take_while(|&&b| b == 0).count();
    if zeroes > 0 {
        return Ok(Header::Zeroes(zeroes));
    }

    let mut value: u32 = 0;
    for (position, &byte) in src.iter().enumerate() {
        if position >= MAX_HEADER_LEN {
            return Err(ProtocolError::CorruptFrame(constants::ERR_FRAME_TOO_BIG));
        }
        value |= ((byte & 0x7F) as u32) << (position * 7);
        if byte & 0x80 == 0 {
            return Ok(Header::Length {
                len: value as usize,
                width: position + 1,
            });
        }
    }
    if src.len() >= MAX_HEADER_LEN {
        return Err(ProtocolError::CorruptFrame(constants::ERR_FRAME_TOO_BIG));
    }
    Ok(Header::Incomplete)
}

/// Tokio codec splitting a byte stream into packet frames.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Use a tighter inbound frame limit.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            max_frame_len: max_frame_len.min(MAX_FRAME_LEN),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match scan_header(src)? {
                Header::Incomplete => return Ok(None),
                Header::Zeroes(count) => {
                    src.advance(count);
                }
                Header::Length { len: 0, width } => {
                    src.advance(width);
                }
                Header::Length { len, width } => {
                    if len > self.max_frame_len {
                        return Err(ProtocolError::OversizedFrame(len));
                    }
                    if src.len() < width + len {
                        src.reserve(width + len - src.len());
                        return Ok(None);
                    }
                    src.advance(width);
                    trace!(len, "Frame decoded");
                    return Ok(Some(src.split_to(len)));
                }
            }
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        if item.len() > MAX_FRAME_LEN {
            return Err(ProtocolError::OversizedFrame(item.len()));
        }
        dst.reserve(varint_size(item.len() as u32) + item.len());
        write_varint(dst, item.len() as u32);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        FrameCodec::new()
            .encode(Bytes::copy_from_slice(payload), &mut buf)
            .unwrap();
        buf
    }

    #[test]
    fn test_roundtrip() {
        let mut buf = frame(b"hello");
        let decoded = FrameCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(&decoded[..], b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits() {
        let full = frame(&[7u8; 300]);
        let mut buf = BytesMut::from(&full[..10]);
        let mut codec = FrameCodec::new();
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&full[10..]);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().len(), 300);
    }

    #[test]
    fn test_zero_runs_and_empty_frames_skipped() {
        let mut buf = BytesMut::from(&[0u8, 0, 0][..]);
        buf.extend_from_slice(&frame(b"x"));
        let decoded = FrameCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(&decoded[..], b"x");
    }

    #[test]
    fn test_four_byte_length_is_corrupt() {
        let mut buf = BytesMut::from(&[0x80u8, 0x80, 0x80, 0x01][..]);
        assert!(matches!(
            FrameCodec::new().decode(&mut buf),
            Err(ProtocolError::CorruptFrame(_))
        ));
    }

    #[test]
    fn test_frame_limit() {
        let mut buf = frame(&[1u8; 64]);
        let err = FrameCodec::with_max_frame_len(32).decode(&mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::OversizedFrame(64)));
    }
}
