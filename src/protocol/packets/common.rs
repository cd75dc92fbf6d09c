//! Packets shared by the configuration and play states.

use bytes::{BufMut, BytesMut};

use crate::core::component::TextComponent;
use crate::core::wire::{PacketReader, WireWrite};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::packets::{Decode, Encode};
use crate::protocol::version::ProtocolVersion;

/// Longest plugin channel name accepted.
pub const MAX_CHANNEL_LEN: usize = 48;

/// Largest plugin payload accepted.
pub const MAX_PLUGIN_DATA: usize = i16::MAX as usize;

/// Largest client information body accepted.
pub const MAX_CLIENT_INFO_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub id: i64,
}

impl Encode for KeepAlive {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        if version >= ProtocolVersion::V1_12_2 {
            dst.put_i64(self.id);
        } else if version >= ProtocolVersion::V1_8 {
            dst.put_varint(self.id as i32);
        } else {
            dst.put_i32(self.id as i32);
        }
        Ok(())
    }
}

impl Decode for KeepAlive {
    fn decode(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        let id = if version >= ProtocolVersion::V1_12_2 {
            src.read_i64()?
        } else if version >= ProtocolVersion::V1_8 {
            src.read_varint()? as i64
        } else {
            src.read_i32()? as i64
        };
        Ok(Self { id })
    }
}

/// Disconnect during login. The reason is always JSON text here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDisconnect {
    pub reason: TextComponent,
}

impl Encode for LoginDisconnect {
    fn encode(&self, dst: &mut BytesMut, _version: ProtocolVersion) -> Result<()> {
        dst.put_string(&self.reason.to_json());
        Ok(())
    }
}

/// Disconnect during configuration or play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    pub reason: TextComponent,
}

impl Encode for Disconnect {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        self.reason.write(dst, version);
        Ok(())
    }
}

/// Client settings. Every client sends this once before it is allowed to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInformation {
    pub locale: String,
    pub view_distance: i8,
    pub chat_visibility: i32,
    pub chat_colors: bool,
    pub skin_parts: u8,
    pub main_hand: i32,
    pub chat_filtering: bool,
    pub client_listing: bool,
    pub particle_status: i32,
}

impl Default for ClientInformation {
    fn default() -> Self {
        Self {
            locale: "en_us".into(),
            view_distance: 10,
            chat_visibility: 0,
            chat_colors: true,
            skin_parts: 0x7F,
            main_hand: 1,
            chat_filtering: false,
            client_listing: true,
            particle_status: 0,
        }
    }
}

impl Decode for ClientInformation {
    fn decode(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        if src.remaining() > MAX_CLIENT_INFO_LEN {
            return Err(ProtocolError::Malformed(constants::ERR_CLIENT_INFO_TOO_BIG));
        }
        let mut info = ClientInformation {
            locale: src.read_string(16)?,
            view_distance: src.read_i8()?,
            chat_visibility: src.read_varint()?,
            chat_colors: src.read_bool()?,
            ..Default::default()
        };
        if version < ProtocolVersion::V1_8 {
            // Difficulty, dropped later
            src.read_i8()?;
        }
        info.skin_parts = src.read_u8()?;
        if version >= ProtocolVersion::V1_9 {
            info.main_hand = src.read_varint()?;
        }
        if version >= ProtocolVersion::V1_17 {
            info.chat_filtering = src.read_bool()?;
        }
        if version >= ProtocolVersion::V1_18 {
            info.client_listing = src.read_bool()?;
        }
        if version >= ProtocolVersion::V1_21_2 {
            info.particle_status = src.read_varint()?;
        }
        Ok(info)
    }
}

impl Encode for ClientInformation {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        dst.put_string(&self.locale);
        dst.put_i8(self.view_distance);
        dst.put_varint(self.chat_visibility);
        dst.put_bool(self.chat_colors);
        if version < ProtocolVersion::V1_8 {
            dst.put_i8(0);
        }
        dst.put_u8(self.skin_parts);
        if version >= ProtocolVersion::V1_9 {
            dst.put_varint(self.main_hand);
        }
        if version >= ProtocolVersion::V1_17 {
            dst.put_bool(self.chat_filtering);
        }
        if version >= ProtocolVersion::V1_18 {
            dst.put_bool(self.client_listing);
        }
        if version >= ProtocolVersion::V1_21_2 {
            dst.put_varint(self.particle_status);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMessage {
    pub channel: String,
    pub data: Vec<u8>,
}

impl PluginMessage {
    /// Whether this message carries the client brand.
    pub fn is_brand(&self) -> bool {
        self.channel == "minecraft:brand" || self.channel == "MC|Brand"
    }
}

impl Decode for PluginMessage {
    fn decode(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        let channel = src.read_string(MAX_CHANNEL_LEN)?;
        let data = if version >= ProtocolVersion::V1_8 {
            src.read_remaining()
        } else {
            let len = src.read_u16()? as usize;
            src.read_bytes(len)?
        };
        if data.len() > MAX_PLUGIN_DATA {
            return Err(ProtocolError::InvalidLength(data.len() as i64));
        }
        Ok(Self {
            channel,
            data: data.to_vec(),
        })
    }
}

impl Encode for PluginMessage {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        dst.put_string(&self.channel);
        if version < ProtocolVersion::V1_8 {
            dst.put_u16(self.data.len() as u16);
        }
        dst.put_slice(&self.data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_client_information() {
        let body = vec![1u8; MAX_CLIENT_INFO_LEN + 1];
        let err = ClientInformation::decode(&mut PacketReader::new(&body), ProtocolVersion::V1_21).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_keep_alive_widths() {
        let packet = KeepAlive { id: 42 };
        let widths = [
            (ProtocolVersion::V1_7_6, 4),
            (ProtocolVersion::V1_8, 1),
            (ProtocolVersion::V1_12_1, 1),
            (ProtocolVersion::V1_12_2, 8),
        ];
        for (version, width) in widths {
            let mut buf = BytesMut::new();
            packet.encode(&mut buf, version).unwrap();
            assert_eq!(buf.len(), width, "{version}");
            let back = KeepAlive::decode(&mut PacketReader::new(&buf), version).unwrap();
            assert_eq!(back, packet);
        }
    }

    #[test]
    fn test_client_information_roundtrip() {
        let info = ClientInformation::default();
        for version in ProtocolVersion::SUPPORTED {
            let mut buf = BytesMut::new();
            info.encode(&mut buf, *version).unwrap();
            let back = ClientInformation::decode(&mut PacketReader::new(&buf), *version).unwrap();
            assert_eq!(back.locale, "en_us");
            assert_eq!(back.view_distance, 10);
        }
    }

    #[test]
    fn test_legacy_plugin_message_is_length_prefixed() {
        let msg = PluginMessage {
            channel: "MC|Brand".into(),
            data: b"\x07vanilla".to_vec(),
        };
        let mut buf = BytesMut::new();
        msg.encode(&mut buf, ProtocolVersion::V1_7_6).unwrap();
        buf.put_u8(0xFF);
        let mut reader = PacketReader::new(&buf);
        let back = PluginMessage::decode(&mut reader, ProtocolVersion::V1_7_6).unwrap();
        assert_eq!(back, msg);
        assert_eq!(reader.remaining(), 1);
        assert!(back.is_brand());
    }

    #[test]
    fn test_legacy_plugin_message_truncated() {
        let mut buf = BytesMut::new();
        buf.put_string("MC|Brand");
        buf.put_u16(10);
        buf.put_slice(b"abc");
        assert!(PluginMessage::decode(&mut PacketReader::new(&buf), ProtocolVersion::V1_7_2).is_err());
    }
}
