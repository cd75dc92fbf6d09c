//! Field-level readers and writers for packet bodies.
//!
//! [`PacketReader`] never panics on short input: every accessor checks the
//! remaining length first and reports [`ProtocolError::Malformed`] instead.
//! [`WireWrite`] extends any `BufMut` with the protocol's composite types.

use bytes::BufMut;
use uuid::Uuid;

use crate::core::varint::{read_varint, write_varint};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::version::ProtocolVersion;

/// Default character cap for strings without a tighter limit.
pub const DEFAULT_MAX_STRING: usize = 32767;

/// Cursor over a packet body.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
}

impl<'a> PacketReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.buf.len() < len {
            return Err(ProtocolError::Malformed(constants::ERR_UNEXPECTED_EOF));
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidField(format!("boolean byte {other}"))),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.array()?))
    }

    pub fn read_varint(&mut self) -> Result<i32> {
        let mut cursor = self.buf;
        let value = read_varint(&mut cursor)
            .map_err(|_| ProtocolError::Malformed(constants::ERR_VARINT_INCOMPLETE))?;
        self.buf = cursor;
        Ok(value as i32)
    }

    /// Read a varint-prefixed UTF-8 string capped at `max_chars` characters.
    ///
    /// The byte length may not exceed `max_chars * 3`, and the decoded string
    /// may not hold more than `max_chars` characters.
    pub fn read_string(&mut self, max_chars: usize) -> Result<String> {
        let len = self.read_varint()?;
        if len < 0 {
            return Err(ProtocolError::InvalidLength(len as i64));
        }
        let len = len as usize;
        if len > max_chars.saturating_mul(3) {
            return Err(ProtocolError::Malformed(constants::ERR_STRING_TOO_LONG));
        }
        let raw = self.take(len)?;
        let text = std::str::from_utf8(raw)
            .map_err(|_| ProtocolError::Malformed(constants::ERR_INVALID_UTF8))?;
        // Character count is what the client enforces, so count UTF-16 units like it does
        if text.encode_utf16().count() > max_chars {
            return Err(ProtocolError::Malformed(constants::ERR_STRING_TOO_LONG));
        }
        Ok(text.to_owned())
    }

    /// Read a varint-prefixed byte array of at most `max_len` bytes.
    pub fn read_byte_array(&mut self, max_len: usize) -> Result<&'a [u8]> {
        let len = self.read_varint()?;
        if len < 0 || len as usize > max_len {
            return Err(ProtocolError::InvalidLength(len as i64));
        }
        self.take(len as usize)
    }

    /// Read exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    pub fn read_uuid(&mut self) -> Result<Uuid> {
        let most = self.read_i64()? as u64;
        let least = self.read_i64()? as u64;
        Ok(Uuid::from_u64_pair(most, least))
    }

    /// Consume everything that is left.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let rest = self.buf;
        self.buf = &[];
        rest
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }
}

/// Composite protocol types written onto any `BufMut`.
pub trait WireWrite: BufMut {
    fn put_varint(&mut self, value: i32) {
        write_varint(self, value as u32);
    }

    fn put_varlong(&mut self, value: i64) {
        let mut value = value as u64;
        while value >= 0x80 {
            self.put_u8((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.put_u8(value as u8);
    }

    fn put_bool(&mut self, value: bool) {
        self.put_u8(value as u8);
    }

    fn put_string(&mut self, value: &str) {
        self.put_varint(value.len() as i32);
        self.put_slice(value.as_bytes());
    }

    fn put_byte_array(&mut self, value: &[u8]) {
        self.put_varint(value.len() as i32);
        self.put_slice(value);
    }

    fn put_string_array(&mut self, values: &[&str]) {
        self.put_varint(values.len() as i32);
        for value in values {
            self.put_string(value);
        }
    }

    fn put_uuid(&mut self, value: &Uuid) {
        let (most, least) = value.as_u64_pair();
        self.put_u64(most);
        self.put_u64(least);
    }

    /// Write a UUID the way a given revision expects it in login success.
    fn put_versioned_uuid(&mut self, value: &Uuid, version: ProtocolVersion) {
        if version >= ProtocolVersion::V1_16 {
            self.put_uuid(value);
        } else if version >= ProtocolVersion::V1_7_6 {
            self.put_string(&value.hyphenated().to_string());
        } else {
            self.put_string(&value.simple().to_string());
        }
    }

    /// Pack block coordinates into the 64-bit position format.
    fn put_block_position(&mut self, x: i32, y: i32, z: i32, version: ProtocolVersion) {
        let (x, y, z) = (x as i64, y as i64, z as i64);
        let packed = if version < ProtocolVersion::V1_14 {
            ((x & 0x3FF_FFFF) << 38) | ((y & 0xFFF) << 26) | (z & 0x3FF_FFFF)
        } else {
            ((x & 0x3FF_FFFF) << 38) | ((z & 0x3FF_FFFF) << 12) | (y & 0xFFF)
        };
        self.put_i64(packed);
    }
}

impl<B: BufMut + ?Sized> WireWrite for B {}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_string_roundtrip_and_caps() {
        let mut buf = BytesMut::new();
        buf.put_string("Notch");
        let mut reader = PacketReader::new(&buf);
        assert_eq!(reader.read_string(16).unwrap(), "Notch");
        assert!(reader.is_empty());

        let mut buf = BytesMut::new();
        buf.put_string("a_name_that_is_too_long");
        assert!(PacketReader::new(&buf).read_string(16).is_err());
    }

    #[test]
    fn test_negative_string_length_rejected() {
        let mut buf = BytesMut::new();
        buf.put_varint(-5);
        let err = PacketReader::new(&buf).read_string(16).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidLength(-5)));
    }

    #[test]
    fn test_truncated_fields_do_not_panic() {
        let mut reader = PacketReader::new(&[0x00, 0x01]);
        assert!(reader.read_i64().is_err());
        let mut reader = PacketReader::new(&[0x05, b'a']);
        assert!(reader.read_string(16).is_err());
        let mut reader = PacketReader::new(&[0x02]);
        assert!(reader.read_bool().is_err());
    }

    #[test]
    fn test_uuid_layouts_by_version() {
        let id = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);

        let mut modern = BytesMut::new();
        modern.put_versioned_uuid(&id, ProtocolVersion::V1_16);
        assert_eq!(modern.len(), 16);
        assert_eq!(PacketReader::new(&modern).read_uuid().unwrap(), id);

        let mut hyphenated = BytesMut::new();
        hyphenated.put_versioned_uuid(&id, ProtocolVersion::V1_8);
        assert_eq!(
            PacketReader::new(&hyphenated).read_string(36).unwrap(),
            "01234567-89ab-cdef-0123-456789abcdef"
        );

        let mut simple = BytesMut::new();
        simple.put_versioned_uuid(&id, ProtocolVersion::V1_7_2);
        assert_eq!(
            PacketReader::new(&simple).read_string(32).unwrap(),
            "0123456789abcdef0123456789abcdef"
        );
    }

    #[test]
    fn test_varlong_widths() {
        let mut buf = BytesMut::new();
        buf.put_varlong(0);
        assert_eq!(&buf[..], &[0x00]);

        let mut buf = BytesMut::new();
        buf.put_varlong(300);
        assert_eq!(&buf[..], &[0xAC, 0x02]);

        let mut buf = BytesMut::new();
        buf.put_varlong(-1);
        assert_eq!(buf.len(), 10);
        assert_eq!(buf[9], 0x01);
    }

    #[test]
    fn test_block_position_packing() {
        let mut buf = BytesMut::new();
        buf.put_block_position(1, 2, 3, ProtocolVersion::V1_14);
        let packed = PacketReader::new(&buf).read_i64().unwrap();
        assert_eq!(packed >> 38, 1);
        assert_eq!(packed & 0xFFF, 2);
        assert_eq!((packed >> 12) & 0x3FF_FFFF, 3);
    }
}
