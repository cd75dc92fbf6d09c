//! Packet bodies spoken during verification.
//!
//! Every packet type implements [`Encode`] (clientbound) or [`Decode`]
//! (serverbound); version-dependent fields are branched inside the impl, ids
//! come from the [`registry`](crate::protocol::registry).

use bytes::BytesMut;

use crate::core::wire::PacketReader;
use crate::error::Result;
use crate::protocol::registry::PacketKind;
use crate::protocol::version::ProtocolVersion;

pub mod common;
pub mod config;
pub mod entity;
pub mod handshake;
pub mod login;
pub mod play;
pub mod world;

pub use common::{ClientInformation, Disconnect, KeepAlive, LoginDisconnect, PluginMessage};
pub use config::{FinishConfiguration, RegistryData};
pub use entity::{
    ArmSwing, EntityAnimation, EntityType, PaddleBoat, PlayerInput, RemoveEntities, SetPassengers,
    SpawnEntity, VehicleMove, LEGACY_SWING, SWING_MAIN_ARM,
};
pub use handshake::{Handshake, Intent};
pub use login::{LoginStart, LoginSuccess};
pub use play::{
    ChatMessage, ConfirmTeleport, GameEvent, JoinGame, MapData, Movement, PlayerAbilities,
    PlayerPosition, SetCarriedItem, SetContainerSlot, SetDefaultSpawnPosition, SetHeldItem,
    SystemChat, Transaction, Transfer, UpdateTime,
};
pub use world::{BlockType, BlockUpdate, ChunkData, UpdateSectionBlocks};

/// A packet the engine writes.
pub trait Encode {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()>;
}

/// A packet the engine reads.
pub trait Decode: Sized {
    fn decode(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self>;
}

/// Inbound packets, already decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Serverbound {
    Handshake(Handshake),
    LoginStart(LoginStart),
    LoginAcknowledged,
    FinishConfiguration,
    KeepAlive(KeepAlive),
    ClientInformation(ClientInformation),
    PluginMessage(PluginMessage),
    Chat(ChatMessage),
    Movement(Movement),
    ConfirmTeleport(ConfirmTeleport),
    Transaction(Transaction),
    ClientTickEnd,
    SetCarriedItem(SetCarriedItem),
    ArmSwing(ArmSwing),
    PlayerInput(PlayerInput),
    VehicleMove(VehicleMove),
    PaddleBoat(PaddleBoat),
}

impl Serverbound {
    pub fn name(&self) -> &'static str {
        match self {
            Serverbound::Handshake(_) => "handshake",
            Serverbound::LoginStart(_) => "login_start",
            Serverbound::LoginAcknowledged => "login_acknowledged",
            Serverbound::FinishConfiguration => "finish_configuration",
            Serverbound::KeepAlive(_) => "keep_alive",
            Serverbound::ClientInformation(_) => "client_information",
            Serverbound::PluginMessage(_) => "plugin_message",
            Serverbound::Chat(_) => "chat",
            Serverbound::Movement(_) => "movement",
            Serverbound::ConfirmTeleport(_) => "confirm_teleport",
            Serverbound::Transaction(_) => "transaction",
            Serverbound::ClientTickEnd => "client_tick_end",
            Serverbound::SetCarriedItem(_) => "set_carried_item",
            Serverbound::ArmSwing(_) => "arm_swing",
            Serverbound::PlayerInput(_) => "player_input",
            Serverbound::VehicleMove(_) => "vehicle_move",
            Serverbound::PaddleBoat(_) => "paddle_boat",
        }
    }

    /// Decode the body of an inbound packet whose id resolved to `kind`.
    pub fn decode(
        kind: PacketKind,
        src: &mut PacketReader<'_>,
        version: ProtocolVersion,
    ) -> Result<Option<Self>> {
        let packet = match kind {
            PacketKind::Handshake => Serverbound::Handshake(Handshake::decode(src, version)?),
            PacketKind::LoginStart => Serverbound::LoginStart(LoginStart::decode(src, version)?),
            PacketKind::LoginAcknowledged => Serverbound::LoginAcknowledged,
            PacketKind::FinishConfiguration => Serverbound::FinishConfiguration,
            PacketKind::KeepAlive => Serverbound::KeepAlive(KeepAlive::decode(src, version)?),
            PacketKind::ClientInformation => {
                Serverbound::ClientInformation(ClientInformation::decode(src, version)?)
            }
            PacketKind::PluginMessage => {
                Serverbound::PluginMessage(PluginMessage::decode(src, version)?)
            }
            PacketKind::Chat => Serverbound::Chat(ChatMessage::decode(src, version)?),
            PacketKind::OnGround => Serverbound::Movement(Movement::decode_on_ground(src, version)?),
            PacketKind::Position => Serverbound::Movement(Movement::decode_position(src, version)?),
            PacketKind::Rotation => Serverbound::Movement(Movement::decode_rotation(src, version)?),
            PacketKind::PositionRotation => {
                Serverbound::Movement(Movement::decode_position_rotation(src, version)?)
            }
            PacketKind::ConfirmTeleport => {
                Serverbound::ConfirmTeleport(ConfirmTeleport::decode(src, version)?)
            }
            PacketKind::Transaction => Serverbound::Transaction(Transaction::decode(src, version)?),
            PacketKind::ClientTickEnd => Serverbound::ClientTickEnd,
            PacketKind::SetHeldItem => {
                Serverbound::SetCarriedItem(SetCarriedItem::decode(src, version)?)
            }
            PacketKind::Animation => Serverbound::ArmSwing(ArmSwing::decode(src, version)?),
            PacketKind::PlayerInput => Serverbound::PlayerInput(PlayerInput::decode(src, version)?),
            PacketKind::VehicleMove => Serverbound::VehicleMove(VehicleMove::decode(src, version)?),
            PacketKind::PaddleBoat => Serverbound::PaddleBoat(PaddleBoat::decode(src, version)?),
            _ => return Ok(None),
        };
        Ok(Some(packet))
    }
}

/// Outbound packets.
#[derive(Debug, Clone)]
pub enum Clientbound {
    LoginDisconnect(LoginDisconnect),
    LoginSuccess(LoginSuccess),
    Disconnect(Disconnect),
    KeepAlive(KeepAlive),
    RegistryData(RegistryData),
    FinishConfiguration,
    JoinGame(JoinGame),
    PlayerPosition(PlayerPosition),
    PlayerAbilities(PlayerAbilities),
    SetDefaultSpawnPosition(SetDefaultSpawnPosition),
    MapData(MapData),
    SetContainerSlot(SetContainerSlot),
    SystemChat(SystemChat),
    GameEvent(GameEvent),
    Transfer(Transfer),
    UpdateTime(UpdateTime),
    ChunkData(ChunkData),
    UpdateSectionBlocks(UpdateSectionBlocks),
    SpawnEntity(SpawnEntity),
    SetPassengers(SetPassengers),
    RemoveEntities(RemoveEntities),
    Transaction(Transaction),
    SetHeldItem(SetHeldItem),
    EntityAnimation(EntityAnimation),
}

impl Clientbound {
    pub fn kind(&self) -> PacketKind {
        match self {
            Clientbound::LoginDisconnect(_) | Clientbound::Disconnect(_) => PacketKind::Disconnect,
            Clientbound::LoginSuccess(_) => PacketKind::LoginSuccess,
            Clientbound::KeepAlive(_) => PacketKind::KeepAlive,
            Clientbound::RegistryData(_) => PacketKind::RegistryData,
            Clientbound::FinishConfiguration => PacketKind::FinishConfiguration,
            Clientbound::JoinGame(_) => PacketKind::JoinGame,
            Clientbound::PlayerPosition(_) => PacketKind::PlayerPosition,
            Clientbound::PlayerAbilities(_) => PacketKind::PlayerAbilities,
            Clientbound::SetDefaultSpawnPosition(_) => PacketKind::SetDefaultSpawnPosition,
            Clientbound::MapData(_) => PacketKind::MapData,
            Clientbound::SetContainerSlot(_) => PacketKind::SetContainerSlot,
            Clientbound::SystemChat(_) => PacketKind::SystemChat,
            Clientbound::GameEvent(_) => PacketKind::GameEvent,
            Clientbound::Transfer(_) => PacketKind::Transfer,
            Clientbound::UpdateTime(_) => PacketKind::UpdateTime,
            Clientbound::ChunkData(_) => PacketKind::ChunkData,
            Clientbound::UpdateSectionBlocks(_) => PacketKind::UpdateSectionBlocks,
            Clientbound::SpawnEntity(_) => PacketKind::SpawnEntity,
            Clientbound::SetPassengers(_) => PacketKind::SetPassengers,
            Clientbound::RemoveEntities(_) => PacketKind::RemoveEntities,
            Clientbound::Transaction(_) => PacketKind::Transaction,
            Clientbound::SetHeldItem(_) => PacketKind::SetHeldItem,
            Clientbound::EntityAnimation(_) => PacketKind::EntityAnimation,
        }
    }

    pub fn encode_body(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        match self {
            Clientbound::LoginDisconnect(p) => p.encode(dst, version),
            Clientbound::LoginSuccess(p) => p.encode(dst, version),
            Clientbound::Disconnect(p) => p.encode(dst, version),
            Clientbound::KeepAlive(p) => p.encode(dst, version),
            Clientbound::RegistryData(p) => p.encode(dst, version),
            Clientbound::FinishConfiguration => FinishConfiguration.encode(dst, version),
            Clientbound::JoinGame(p) => p.encode(dst, version),
            Clientbound::PlayerPosition(p) => p.encode(dst, version),
            Clientbound::PlayerAbilities(p) => p.encode(dst, version),
            Clientbound::SetDefaultSpawnPosition(p) => p.encode(dst, version),
            Clientbound::MapData(p) => p.encode(dst, version),
            Clientbound::SetContainerSlot(p) => p.encode(dst, version),
            Clientbound::SystemChat(p) => p.encode(dst, version),
            Clientbound::GameEvent(p) => p.encode(dst, version),
            Clientbound::Transfer(p) => p.encode(dst, version),
            Clientbound::UpdateTime(p) => p.encode(dst, version),
            Clientbound::ChunkData(p) => p.encode(dst, version),
            Clientbound::UpdateSectionBlocks(p) => p.encode(dst, version),
            Clientbound::SpawnEntity(p) => p.encode(dst, version),
            Clientbound::SetPassengers(p) => p.encode(dst, version),
            Clientbound::RemoveEntities(p) => p.encode(dst, version),
            Clientbound::Transaction(p) => p.encode(dst, version),
            Clientbound::SetHeldItem(p) => p.encode(dst, version),
            Clientbound::EntityAnimation(p) => p.encode(dst, version),
        }
    }
}
