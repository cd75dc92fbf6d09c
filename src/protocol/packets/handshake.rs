use bytes::{BufMut, BytesMut};

use crate::core::wire::{PacketReader, WireWrite};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::packets::{Decode, Encode};
use crate::protocol::version::ProtocolVersion;

/// Longest hostname a client may send, including a Forge marker.
pub const MAX_HOSTNAME_LEN: usize = 255 + "\0FML\0".len() + 1;

/// What the client wants after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Status,
    Login,
    Transfer,
}

impl Intent {
    pub fn from_id(id: i32) -> Option<Intent> {
        match id {
            1 => Some(Intent::Status),
            2 => Some(Intent::Login),
            3 => Some(Intent::Transfer),
            _ => None,
        }
    }

    pub fn id(self) -> i32 {
        match self {
            Intent::Status => 1,
            Intent::Login => 2,
            Intent::Transfer => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_id: i32,
    pub hostname: String,
    pub port: u16,
    pub intent: Intent,
}

impl Decode for Handshake {
    fn decode(src: &mut PacketReader<'_>, _version: ProtocolVersion) -> Result<Self> {
        let protocol_id = src.read_varint()?;
        let hostname = src.read_string(MAX_HOSTNAME_LEN)?;
        if hostname.is_empty() {
            return Err(ProtocolError::Malformed(constants::ERR_EMPTY_HOSTNAME));
        }
        let port = src.read_u16()?;
        let intent = src.read_varint()?;
        let intent = Intent::from_id(intent)
            .ok_or_else(|| ProtocolError::InvalidField(format!("handshake intent {intent}")))?;
        Ok(Self {
            protocol_id,
            hostname,
            port,
            intent,
        })
    }
}

// Only used by tests and load tools that play the client side
impl Encode for Handshake {
    fn encode(&self, dst: &mut BytesMut, _version: ProtocolVersion) -> Result<()> {
        dst.put_varint(self.protocol_id);
        dst.put_string(&self.hostname);
        dst.put_u16(self.port);
        dst.put_varint(self.intent.id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<Handshake> {
        Handshake::decode(&mut PacketReader::new(bytes), ProtocolVersion::Unknown)
    }

    #[test]
    fn test_roundtrip() {
        let packet = Handshake {
            protocol_id: 764,
            hostname: "play.example.net".into(),
            port: 25565,
            intent: Intent::Login,
        };
        let mut buf = BytesMut::new();
        packet.encode(&mut buf, ProtocolVersion::Unknown).unwrap();
        assert_eq!(decode(&buf).unwrap(), packet);
    }

    #[test]
    fn test_empty_hostname_and_bad_intent() {
        let mut buf = BytesMut::new();
        buf.put_varint(47);
        buf.put_string("");
        buf.put_u16(25565);
        buf.put_varint(2);
        assert!(matches!(decode(&buf), Err(ProtocolError::Malformed(_))));

        let mut buf = BytesMut::new();
        buf.put_varint(47);
        buf.put_string("localhost");
        buf.put_u16(25565);
        buf.put_varint(9);
        assert!(matches!(decode(&buf), Err(ProtocolError::InvalidField(_))));
    }

    #[test]
    fn test_oversized_hostname_rejected() {
        let mut buf = BytesMut::new();
        buf.put_varint(47);
        buf.put_string(&"a".repeat(MAX_HOSTNAME_LEN + 1));
        buf.put_u16(25565);
        buf.put_varint(2);
        assert!(decode(&buf).is_err());
    }
}
