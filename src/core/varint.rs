//! Variable-length integer encoding.
//!
//! 7 payload bits per byte, least significant group first, high bit set on
//! every byte except the last. A 32-bit value needs at most five bytes.

use bytes::{Buf, BufMut};

use crate::error::{constants, ProtocolError, Result};

/// Maximum number of bytes a 32-bit varint can occupy.
pub const MAX_VARINT_LEN: usize = 5;

/// Number of bytes `value` occupies once encoded.
#[inline]
pub fn varint_size(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Append the minimal encoding of `value` to `dst`.
#[inline]
pub fn write_varint<B: BufMut + ?Sized>(dst: &mut B, value: u32) {
    let mut value = value;
    loop {
        if value & !0x7F == 0 {
            dst.put_u8(value as u8);
            return;
        }
        dst.put_u8(((value & 0x7F) | 0x80) as u8);
        value >>= 7;
    }
}

/// Encode `value` into a fresh buffer.
pub fn encode_varint(value: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(varint_size(value));
    write_varint(&mut out, value);
    out
}

/// Read a varint from `src`, consuming exactly the bytes it occupies.
///
/// Fails when the input ends before the terminating byte or when the
/// continuation bit is still set on the fifth byte.
pub fn read_varint<B: Buf>(src: &mut B) -> Result<u32> {
    let mut value: u32 = 0;
    for position in 0..MAX_VARINT_LEN {
        if !src.has_remaining() {
            return Err(ProtocolError::CorruptFrame(constants::ERR_VARINT_INCOMPLETE));
        }
        let byte = src.get_u8();
        value |= ((byte & 0x7F) as u32) << (position * 7);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ProtocolError::CorruptFrame(constants::ERR_VARINT_TOO_BIG))
}

/// Decode a varint from the front of a slice without consuming it.
///
/// Returns the value and the number of bytes it occupied.
pub fn decode_varint(src: &[u8]) -> Result<(u32, usize)> {
    let mut cursor = src;
    let value = read_varint(&mut cursor)?;
    Ok((value, src.len() - cursor.len()))
}
