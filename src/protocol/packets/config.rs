use bytes::BytesMut;

use crate::core::nbt::Compound;
use crate::core::wire::WireWrite;
use crate::error::{ProtocolError, Result};
use crate::protocol::packets::Encode;
use crate::protocol::version::ProtocolVersion;

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub name: String,
    pub data: Option<Compound>,
}

/// Synchronized registry contents sent during configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryData {
    /// 1.20.2 and 1.20.3 take every registry in one nameless compound.
    Codec(Compound),
    /// From 1.20.5 each registry travels in its own packet.
    Registry {
        id: String,
        entries: Vec<RegistryEntry>,
    },
}

impl Encode for RegistryData {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        match self {
            RegistryData::Codec(codec) if version < ProtocolVersion::V1_20_5 => {
                codec.write_nameless(dst);
            }
            RegistryData::Registry { id, entries } if version >= ProtocolVersion::V1_20_5 => {
                dst.put_string(id);
                dst.put_varint(entries.len() as i32);
                for entry in entries {
                    dst.put_string(&entry.name);
                    dst.put_bool(entry.data.is_some());
                    if let Some(data) = &entry.data {
                        data.write_nameless(dst);
                    }
                }
            }
            _ => {
                return Err(ProtocolError::EncodeError(format!(
                    "registry data layout does not match {version}"
                )))
            }
        }
        Ok(())
    }
}

/// Empty marker sent by both sides to leave configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishConfiguration;

impl Encode for FinishConfiguration {
    fn encode(&self, _dst: &mut BytesMut, _version: ProtocolVersion) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wire::PacketReader;

    #[test]
    fn test_per_registry_layout() {
        let packet = RegistryData::Registry {
            id: "minecraft:dimension_type".into(),
            entries: vec![
                RegistryEntry {
                    name: "minecraft:overworld".into(),
                    data: Some(Compound::new().with("height", 384)),
                },
                RegistryEntry {
                    name: "minecraft:the_end".into(),
                    data: None,
                },
            ],
        };
        let mut buf = BytesMut::new();
        packet.encode(&mut buf, ProtocolVersion::V1_21).unwrap();
        let mut reader = PacketReader::new(&buf);
        assert_eq!(reader.read_string(64).unwrap(), "minecraft:dimension_type");
        assert_eq!(reader.read_varint().unwrap(), 2);
        assert_eq!(reader.read_string(64).unwrap(), "minecraft:overworld");
        assert!(reader.read_bool().unwrap());
    }

    #[test]
    fn test_layout_mismatch_is_an_error() {
        let codec = RegistryData::Codec(Compound::new());
        assert!(codec.encode(&mut BytesMut::new(), ProtocolVersion::V1_20_5).is_err());
        assert!(codec.encode(&mut BytesMut::new(), ProtocolVersion::V1_20_2).is_ok());
    }
}
