use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::core::wire::{PacketReader, WireWrite};
use crate::error::{ProtocolError, Result};
use crate::protocol::packets::{Clientbound, Serverbound};
use crate::protocol::registry::{self, ConnectionState, Direction};
use crate::protocol::version::ProtocolVersion;

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Packet(Serverbound),
    /// An id the engine has no use for in the current state.
    Unregistered(i32),
}

/// Turns frames into packets and back for one connection.
///
/// Holds the connection state and negotiated version, which together select
/// the id table. Owned by the task driving the connection.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    state: ConnectionState,
    version: ProtocolVersion,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Handshake,
            version: ProtocolVersion::Unknown,
        }
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[inline]
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn set_state(&mut self, state: ConnectionState) {
        trace!(from = %self.state, to = %state, "Connection state changed");
        self.state = state;
    }

    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.version = version;
    }

    /// Decode one frame (packet id followed by the body).
    ///
    /// Handshake and login accept nothing but known packets; later states
    /// report unknown ids as [`Inbound::Unregistered`].
    pub fn decode(&self, frame: &[u8]) -> Result<Inbound> {
        let mut reader = PacketReader::new(frame);
        let id = reader.read_varint()?;

        let strict = matches!(self.state, ConnectionState::Handshake | ConnectionState::Login);
        let unexpected = || ProtocolError::UnexpectedPacket {
            id,
            state: self.state.as_str(),
        };

        let Some(kind) = registry::kind_for(self.state, Direction::Serverbound, self.version, id) else {
            return if strict { Err(unexpected()) } else { Ok(Inbound::Unregistered(id)) };
        };
        match Serverbound::decode(kind, &mut reader, self.version)? {
            Some(packet) => {
                trace!(packet = packet.name(), len = frame.len(), "Packet decoded");
                Ok(Inbound::Packet(packet))
            }
            None if strict => Err(unexpected()),
            None => Ok(Inbound::Unregistered(id)),
        }
    }

    /// Encode a packet into a frame body (without the length prefix).
    pub fn encode(&self, packet: &Clientbound) -> Result<Bytes> {
        let kind = packet.kind();
        let id = registry::id_for(self.state, Direction::Clientbound, kind, self.version).ok_or_else(|| {
            ProtocolError::EncodeError(format!("{kind:?} has no id in {} for {}", self.state, self.version))
        })?;

        let mut buf = BytesMut::with_capacity(64);
        buf.put_varint(id);
        packet.encode_body(&mut buf, self.version)?;
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packets::{Encode, Handshake, Intent, KeepAlive, LoginStart};

    fn frame_of<P: Encode>(id: i32, packet: &P, version: ProtocolVersion) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_varint(id);
        packet.encode(&mut buf, version).unwrap();
        buf
    }

    #[test]
    fn test_handshake_decodes_before_version_is_known() {
        let dispatcher = Dispatcher::new();
        let handshake = Handshake {
            protocol_id: 47,
            hostname: "localhost".into(),
            port: 25565,
            intent: Intent::Login,
        };
        let frame = frame_of(0x00, &handshake, ProtocolVersion::Unknown);
        assert_eq!(
            dispatcher.decode(&frame).unwrap(),
            Inbound::Packet(Serverbound::Handshake(handshake))
        );
    }

    #[test]
    fn test_login_rejects_unknown_ids() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_state(ConnectionState::Login);
        dispatcher.set_version(ProtocolVersion::V1_8);
        let err = dispatcher.decode(&[0x42]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedPacket { id: 0x42, state: "LOGIN" }));

        let start = LoginStart {
            username: "Steve".into(),
            uuid: None,
        };
        let frame = frame_of(0x00, &start, ProtocolVersion::V1_8);
        assert!(matches!(
            dispatcher.decode(&frame).unwrap(),
            Inbound::Packet(Serverbound::LoginStart(_))
        ));
    }

    #[test]
    fn test_game_tolerates_unknown_ids() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_state(ConnectionState::Game);
        dispatcher.set_version(ProtocolVersion::V1_8);
        assert_eq!(dispatcher.decode(&[0x7F]).unwrap(), Inbound::Unregistered(0x7F));
    }

    #[test]
    fn test_encode_prefixes_the_versioned_id() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_state(ConnectionState::Game);
        for version in [ProtocolVersion::V1_8, ProtocolVersion::V1_12_2, ProtocolVersion::V1_21_9] {
            dispatcher.set_version(version);
            let frame = dispatcher.encode(&Clientbound::KeepAlive(KeepAlive { id: 9 })).unwrap();
            let expected = registry::id_for(
                ConnectionState::Game,
                Direction::Clientbound,
                registry::PacketKind::KeepAlive,
                version,
            )
            .unwrap();
            assert_eq!(PacketReader::new(&frame).read_varint().unwrap(), expected);
        }
    }

    #[test]
    fn test_encode_without_id_is_an_error() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_state(ConnectionState::Login);
        dispatcher.set_version(ProtocolVersion::V1_8);
        assert!(dispatcher.encode(&Clientbound::FinishConfiguration).is_err());
    }
}
