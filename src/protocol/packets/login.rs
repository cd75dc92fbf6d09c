use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, BytesMut};
use uuid::Uuid;

use crate::core::wire::{PacketReader, WireWrite};
use crate::error::{ProtocolError, Result};
use crate::protocol::packets::{Decode, Encode};
use crate::protocol::version::ProtocolVersion;

/// Longest username any client is allowed to send.
pub const MAX_USERNAME_LEN: usize = 16;

/// Signatures on 1.19 public keys are never longer than this.
const MAX_SIGNATURE_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    pub username: String,
    pub uuid: Option<Uuid>,
}

impl Decode for LoginStart {
    fn decode(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        let username = src.read_string(MAX_USERNAME_LEN)?;
        let mut uuid = None;

        if version >= ProtocolVersion::V1_19 {
            // 1.19 and 1.19.1 may attach a signed public key
            if version < ProtocolVersion::V1_19_3 && src.read_bool()? {
                let expiry = src.read_i64()?;
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as i64)
                    .unwrap_or_default();
                if expiry < now {
                    return Err(ProtocolError::InvalidField(format!("expired key {expiry}")));
                }
                if src.read_byte_array(MAX_SIGNATURE_LEN)?.is_empty() {
                    return Err(ProtocolError::InvalidField("empty public key".into()));
                }
                if src.read_byte_array(MAX_SIGNATURE_LEN)?.is_empty() {
                    return Err(ProtocolError::InvalidField("empty key signature".into()));
                }
            }

            if version >= ProtocolVersion::V1_20_2 || (version >= ProtocolVersion::V1_19_1 && src.read_bool()?) {
                uuid = Some(src.read_uuid()?);
            }
        }

        Ok(Self { username, uuid })
    }
}

impl Encode for LoginStart {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        dst.put_string(&self.username);
        if version >= ProtocolVersion::V1_19 {
            if version < ProtocolVersion::V1_19_3 {
                dst.put_bool(false);
            }
            if version >= ProtocolVersion::V1_20_2 {
                dst.put_uuid(&self.uuid.unwrap_or_else(Uuid::nil));
            } else if version >= ProtocolVersion::V1_19_1 {
                dst.put_bool(self.uuid.is_some());
                if let Some(uuid) = &self.uuid {
                    dst.put_uuid(uuid);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub uuid: Uuid,
    pub username: String,
}

impl Encode for LoginSuccess {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        dst.put_versioned_uuid(&self.uuid, version);
        dst.put_string(&self.username);
        if version >= ProtocolVersion::V1_19 {
            // No profile properties
            dst.put_varint(0);
        }
        if version.between(ProtocolVersion::V1_20_5, ProtocolVersion::V1_21) {
            // Strict error handling
            dst.put_u8(0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_start_per_version() {
        let packet = LoginStart {
            username: "Steve".into(),
            uuid: Some(Uuid::from_u128(7)),
        };
        for version in [
            ProtocolVersion::V1_8,
            ProtocolVersion::V1_19,
            ProtocolVersion::V1_19_1,
            ProtocolVersion::V1_19_3,
            ProtocolVersion::V1_20_2,
        ] {
            let mut buf = BytesMut::new();
            packet.encode(&mut buf, version).unwrap();
            let decoded = LoginStart::decode(&mut PacketReader::new(&buf), version).unwrap();
            assert_eq!(decoded.username, "Steve");
            let expect_uuid = version >= ProtocolVersion::V1_19_1;
            assert_eq!(decoded.uuid.is_some(), expect_uuid, "{version}");
        }
    }

    #[test]
    fn test_long_username_fails_decode() {
        let mut buf = BytesMut::new();
        buf.put_string("seventeen_chars__");
        assert!(LoginStart::decode(&mut PacketReader::new(&buf), ProtocolVersion::V1_8).is_err());
    }

    #[test]
    fn test_expired_key_rejected() {
        let mut buf = BytesMut::new();
        buf.put_string("Steve");
        buf.put_bool(true);
        buf.put_i64(1);
        assert!(LoginStart::decode(&mut PacketReader::new(&buf), ProtocolVersion::V1_19).is_err());
    }

    #[test]
    fn test_login_success_trailer() {
        let packet = LoginSuccess {
            uuid: Uuid::nil(),
            username: "Steve".into(),
        };
        let mut legacy = BytesMut::new();
        packet.encode(&mut legacy, ProtocolVersion::V1_18_2).unwrap();
        assert_eq!(legacy.len(), 16 + 6);

        let mut strict = BytesMut::new();
        packet.encode(&mut strict, ProtocolVersion::V1_21).unwrap();
        assert_eq!(strict.len(), 16 + 6 + 1 + 1);

        let mut latest = BytesMut::new();
        packet.encode(&mut latest, ProtocolVersion::V1_21_2).unwrap();
        assert_eq!(latest.len(), 16 + 6 + 1);
    }
}
