//! Play state packets.
//!
//! Layouts follow the vanilla client of each revision. Comments only call out
//! fields whose meaning is not obvious from the name.

use bytes::{BufMut, BytesMut};
use uuid::Uuid;

use crate::core::component::TextComponent;
use crate::core::nbt::Compound;
use crate::core::wire::{PacketReader, WireWrite};
use crate::error::{ProtocolError, Result};
use crate::protocol::dimension;
use crate::protocol::packets::{Decode, Encode};
use crate::protocol::version::ProtocolVersion;

/// Longest chat message accepted from a client.
pub const MAX_CHAT_LEN: usize = 256;

/// Game event asking 1.20.3+ clients to stop waiting for chunks.
pub const GAME_EVENT_START_WAITING_CHUNKS: u8 = 13;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGame {
    pub entity_id: i32,
    pub gamemode: u8,
    pub hardcore: bool,
    pub view_distance: i32,
    pub reduced_debug_info: bool,
    pub show_respawn_screen: bool,
    pub hashed_seed: i64,
    pub secure_profile: bool,
}

impl Default for JoinGame {
    fn default() -> Self {
        Self {
            entity_id: 1,
            gamemode: 2,
            hardcore: false,
            view_distance: 2,
            reduced_debug_info: true,
            show_respawn_screen: false,
            hashed_seed: 0,
            secure_profile: false,
        }
    }
}

impl Encode for JoinGame {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        use ProtocolVersion as V;

        dst.put_i32(self.entity_id);
        if version >= V::V1_16_2 {
            dst.put_bool(self.hardcore);
        }
        if version < V::V1_20_2 {
            // Spectator does not exist before 1.8
            let gamemode = if version < V::V1_8 && self.gamemode == 3 { 1 } else { self.gamemode };
            dst.put_u8(gamemode);
        }

        if version >= V::V1_16 {
            if version < V::V1_20_2 {
                // Previous gamemode: none
                dst.put_i8(-1);
            }
            dst.put_string_array(&[dimension::OVERWORLD]);
            if version < V::V1_20_2 {
                dimension::join_codec(version).write_root(dst, version);
            }
            if version.between(V::V1_16_2, V::V1_18_2) {
                dimension::overworld_element(version).write_root(dst, version);
            } else if version < V::V1_20_2 {
                dst.put_string(dimension::OVERWORLD);
            }
            if version < V::V1_20_2 {
                dst.put_string(dimension::OVERWORLD);
            }
        } else if version > V::V1_9 {
            dst.put_i32(0);
        } else {
            dst.put_i8(0);
        }

        if version >= V::V1_15 && version < V::V1_20_2 {
            dst.put_i64(self.hashed_seed);
        }
        if version < V::V1_14 {
            // Difficulty: peaceful
            dst.put_u8(0);
        }
        // Max players, ignored by the client
        if version >= V::V1_16_2 {
            dst.put_varint(0);
        } else {
            dst.put_u8(0);
        }
        if version < V::V1_16 {
            dst.put_string("flat");
        }
        if version >= V::V1_14 {
            dst.put_varint(self.view_distance);
        }
        if version >= V::V1_18 {
            // Simulation distance
            dst.put_varint(self.view_distance);
        }
        if version >= V::V1_8 {
            dst.put_bool(self.reduced_debug_info);
        }
        if version >= V::V1_15 {
            dst.put_bool(self.show_respawn_screen);
        }
        if version >= V::V1_20_2 {
            // Limited crafting
            dst.put_bool(false);
            if version >= V::V1_20_5 {
                // Index into the dimension type registry
                dst.put_varint(0);
            } else {
                dst.put_string(dimension::OVERWORLD);
            }
            dst.put_string(dimension::OVERWORLD);
            dst.put_i64(self.hashed_seed);
            dst.put_u8(self.gamemode);
            dst.put_i8(-1);
        }
        if version >= V::V1_16 {
            // Debug world, flat world
            dst.put_bool(false);
            dst.put_bool(false);
        }
        if version >= V::V1_19 {
            // No last death location
            dst.put_bool(false);
        }
        if version >= V::V1_20 {
            // Portal cooldown
            dst.put_varint(0);
        }
        if version >= V::V1_21_2 {
            // Sea level
            dst.put_varint(63);
        }
        if version >= V::V1_20_5 {
            dst.put_bool(self.secure_profile);
        }
        Ok(())
    }
}

/// Server-initiated teleport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub teleport_id: i32,
}

impl Encode for PlayerPosition {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        if version >= ProtocolVersion::V1_21_2 {
            dst.put_varint(self.teleport_id);
            dst.put_f64(self.x);
            dst.put_f64(self.y);
            dst.put_f64(self.z);
            // Velocity
            dst.put_f64(0.0);
            dst.put_f64(0.0);
            dst.put_f64(0.0);
            dst.put_f32(self.yaw);
            dst.put_f32(self.pitch);
            // Relative flags
            dst.put_i32(0);
            return Ok(());
        }

        dst.put_f64(self.x);
        // 1.7 expects the eye position
        if version < ProtocolVersion::V1_8 {
            dst.put_f64(self.y + 1.62);
        } else {
            dst.put_f64(self.y);
        }
        dst.put_f64(self.z);
        dst.put_f32(self.yaw);
        dst.put_f32(self.pitch);
        dst.put_u8(0);
        if version > ProtocolVersion::V1_8 {
            dst.put_varint(self.teleport_id);
            if version.between(ProtocolVersion::V1_17, ProtocolVersion::V1_19_3) {
                // Dismount vehicle
                dst.put_bool(false);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerAbilities {
    pub flags: u8,
    pub flying_speed: f32,
    pub field_of_view: f32,
}

impl PlayerAbilities {
    pub const INVULNERABLE: u8 = 0x01;
    pub const FLYING: u8 = 0x02;
    pub const ALLOW_FLYING: u8 = 0x04;

    /// Abilities that keep the player grounded.
    pub fn grounded() -> Self {
        Self {
            flags: 0,
            flying_speed: 0.05,
            field_of_view: 0.1,
        }
    }

    /// Abilities that freeze the player in place while a captcha is shown.
    pub fn frozen() -> Self {
        Self {
            flags: Self::INVULNERABLE | Self::FLYING,
            flying_speed: 0.0,
            field_of_view: 0.0,
        }
    }
}

impl Encode for PlayerAbilities {
    fn encode(&self, dst: &mut BytesMut, _version: ProtocolVersion) -> Result<()> {
        dst.put_u8(self.flags);
        dst.put_f32(self.flying_speed);
        dst.put_f32(self.field_of_view);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetDefaultSpawnPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Encode for SetDefaultSpawnPosition {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        if version < ProtocolVersion::V1_8 {
            dst.put_i32(self.x);
            dst.put_i32(self.y);
            dst.put_i32(self.z);
            return Ok(());
        }
        if version >= ProtocolVersion::V1_21_9 {
            dst.put_string(dimension::OVERWORLD);
        }
        dst.put_block_position(self.x, self.y, self.z, version);
        if version >= ProtocolVersion::V1_17 {
            // Angle
            dst.put_f32(0.0);
            if version >= ProtocolVersion::V1_21_9 {
                // Pitch
                dst.put_f32(0.0);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateTime {
    pub world_age: i64,
    pub time_of_day: i64,
}

impl Encode for UpdateTime {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        dst.put_i64(self.world_age);
        dst.put_i64(self.time_of_day);
        if version >= ProtocolVersion::V1_21_2 {
            // Whether the client advances the clock itself
            dst.put_bool(false);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameEvent {
    pub event: u8,
    pub value: f32,
}

impl Encode for GameEvent {
    fn encode(&self, dst: &mut BytesMut, _version: ProtocolVersion) -> Result<()> {
        dst.put_u8(self.event);
        dst.put_f32(self.value);
        Ok(())
    }
}

/// Move a 1.20.5+ client to another server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub host: String,
    pub port: u16,
}

impl Encode for Transfer {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        if version < ProtocolVersion::V1_20_5 {
            return Err(ProtocolError::EncodeError(format!("{version} cannot be transferred")));
        }
        dst.put_string(&self.host);
        dst.put_varint(self.port as i32);
        Ok(())
    }
}

/// Chat line from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemChat {
    pub message: TextComponent,
}

impl Encode for SystemChat {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        self.message.write(dst, version);
        if version >= ProtocolVersion::V1_19_1 {
            // Not an action bar overlay
            dst.put_bool(false);
        } else if version >= ProtocolVersion::V1_19 {
            dst.put_varint(1);
        } else if version >= ProtocolVersion::V1_8 {
            dst.put_u8(1);
        }
        if version.between(ProtocolVersion::V1_16, ProtocolVersion::V1_18_2) {
            dst.put_uuid(&Uuid::nil());
        }
        Ok(())
    }
}

/// Chat line typed by the client. Signing data is read and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub message: String,
}

/// Byte length of the acknowledged-messages bit set.
const ACKNOWLEDGED_BYTES: usize = 20usize.div_ceil(8);

impl Decode for ChatMessage {
    fn decode(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        let message = src.read_string(MAX_CHAT_LEN)?;

        if version.between(ProtocolVersion::V1_19, ProtocolVersion::V1_19_1) {
            // Expiry
            src.read_i64()?;
            let salt = src.read_i64()?;
            let signature = src.read_byte_array(MAX_CHAT_LEN)?;
            let unsigned = if salt != 0 && !signature.is_empty() {
                false
            } else if (version >= ProtocolVersion::V1_19_1 || salt == 0) && signature.is_empty() {
                true
            } else {
                return Err(ProtocolError::InvalidField("chat signature".into()));
            };
            let signed_preview = src.read_bool()?;
            if signed_preview && unsigned {
                return Err(ProtocolError::InvalidField("chat preview signature".into()));
            }
            if version >= ProtocolVersion::V1_19_1 {
                let seen = src.read_varint()?;
                if !(0..=5).contains(&seen) {
                    return Err(ProtocolError::InvalidLength(seen as i64));
                }
                for _ in 0..seen {
                    src.read_uuid()?;
                    src.read_byte_array(MAX_CHAT_LEN)?;
                }
                if src.read_bool()? {
                    src.read_uuid()?;
                    src.read_byte_array(MAX_CHAT_LEN)?;
                }
            }
        } else if version >= ProtocolVersion::V1_19_3 {
            // Timestamp, salt
            src.read_i64()?;
            src.read_i64()?;
            if src.read_bool()? {
                src.skip(256)?;
            }
            // Message count, acknowledged bit set
            src.read_varint()?;
            src.skip(ACKNOWLEDGED_BYTES)?;
        }

        Ok(Self { message })
    }
}

impl Encode for ChatMessage {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        dst.put_string(&self.message);
        if version.between(ProtocolVersion::V1_19, ProtocolVersion::V1_19_1) {
            dst.put_i64(0);
            dst.put_i64(0);
            dst.put_varint(0);
            dst.put_bool(false);
            if version >= ProtocolVersion::V1_19_1 {
                dst.put_varint(0);
                dst.put_bool(false);
            }
        } else if version >= ProtocolVersion::V1_19_3 {
            dst.put_i64(0);
            dst.put_i64(0);
            dst.put_bool(false);
            dst.put_varint(0);
            dst.put_bytes(0, ACKNOWLEDGED_BYTES);
        }
        Ok(())
    }
}

/// Any of the four client movement packets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    pub position: Option<(f64, f64, f64)>,
    pub rotation: Option<(f32, f32)>,
    pub on_ground: bool,
}

impl Movement {
    fn read_position(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<(f64, f64, f64)> {
        let x = src.read_f64()?;
        let y = src.read_f64()?;
        if version < ProtocolVersion::V1_8 {
            // 1.7 also sends the eye height
            src.read_f64()?;
        }
        let z = src.read_f64()?;
        Ok((x, y, z))
    }

    fn read_rotation(src: &mut PacketReader<'_>) -> Result<(f32, f32)> {
        Ok((src.read_f32()?, src.read_f32()?))
    }

    fn read_on_ground(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<bool> {
        if version < ProtocolVersion::V1_21_2 {
            return src.read_bool();
        }
        // On-ground and horizontal collision bits
        let flags = src.read_u8()?;
        if flags & !0x03 != 0 {
            return Err(ProtocolError::InvalidField(format!("movement flags {flags:#04x}")));
        }
        Ok(flags & 0x01 != 0)
    }

    pub fn decode_on_ground(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            position: None,
            rotation: None,
            on_ground: Self::read_on_ground(src, version)?,
        })
    }

    pub fn decode_position(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        let position = Self::read_position(src, version)?;
        Ok(Self {
            position: Some(position),
            rotation: None,
            on_ground: Self::read_on_ground(src, version)?,
        })
    }

    pub fn decode_rotation(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        let rotation = Self::read_rotation(src)?;
        Ok(Self {
            position: None,
            rotation: Some(rotation),
            on_ground: Self::read_on_ground(src, version)?,
        })
    }

    pub fn decode_position_rotation(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        let position = Self::read_position(src, version)?;
        let rotation = Self::read_rotation(src)?;
        Ok(Self {
            position: Some(position),
            rotation: Some(rotation),
            on_ground: Self::read_on_ground(src, version)?,
        })
    }
}

impl Encode for Movement {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        if let Some((x, y, z)) = self.position {
            dst.put_f64(x);
            dst.put_f64(y);
            if version < ProtocolVersion::V1_8 {
                dst.put_f64(y + 1.62);
            }
            dst.put_f64(z);
        }
        if let Some((yaw, pitch)) = self.rotation {
            dst.put_f32(yaw);
            dst.put_f32(pitch);
        }
        dst.put_u8(self.on_ground as u8);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmTeleport {
    pub teleport_id: i32,
}

impl Decode for ConfirmTeleport {
    fn decode(src: &mut PacketReader<'_>, _version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            teleport_id: src.read_varint()?,
        })
    }
}

impl Encode for ConfirmTeleport {
    fn encode(&self, dst: &mut BytesMut, _version: ProtocolVersion) -> Result<()> {
        dst.put_varint(self.teleport_id);
        Ok(())
    }
}

/// Window transaction reply (before 1.17) or pong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    pub window_id: i8,
    pub id: i32,
    pub accepted: bool,
}

impl Decode for Transaction {
    fn decode(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        if version < ProtocolVersion::V1_17 {
            Ok(Self {
                window_id: src.read_i8()?,
                id: src.read_i16()? as i32,
                accepted: src.read_bool()?,
            })
        } else {
            Ok(Self {
                window_id: 0,
                id: src.read_i32()?,
                accepted: true,
            })
        }
    }
}

impl Encode for Transaction {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        if version < ProtocolVersion::V1_17 {
            dst.put_i8(self.window_id);
            dst.put_i16(self.id as i16);
            dst.put_bool(self.accepted);
        } else {
            dst.put_i32(self.id);
        }
        Ok(())
    }
}

/// Selects a hotbar slot on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetHeldItem {
    pub slot: i8,
}

impl Encode for SetHeldItem {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        if version >= ProtocolVersion::V1_21_2 {
            dst.put_varint(self.slot as i32);
        } else {
            dst.put_i8(self.slot);
        }
        Ok(())
    }
}

/// The client changed its selected hotbar slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCarriedItem {
    pub slot: i16,
}

impl Decode for SetCarriedItem {
    fn decode(src: &mut PacketReader<'_>, _version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            slot: src.read_i16()?,
        })
    }
}

impl Encode for SetCarriedItem {
    fn encode(&self, dst: &mut BytesMut, _version: ProtocolVersion) -> Result<()> {
        dst.put_i16(self.slot);
        Ok(())
    }
}

/// Column or full-image update of a map item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapData {
    pub map_id: i32,
    pub columns: u8,
    pub rows: u8,
    pub x: u8,
    pub y: u8,
    pub data: Vec<u8>,
}

impl Encode for MapData {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        dst.put_varint(self.map_id);
        if version < ProtocolVersion::V1_8 {
            // One column: type byte, start x, start y, then the pixels
            dst.put_u16(self.data.len() as u16 + 3);
            dst.put_u8(0);
            dst.put_u8(self.x);
            dst.put_u8(self.y);
            dst.put_slice(&self.data);
            return Ok(());
        }

        // Scale
        dst.put_u8(0);
        if version >= ProtocolVersion::V1_9 && version < ProtocolVersion::V1_17 {
            // Tracking position
            dst.put_bool(false);
        }
        if version >= ProtocolVersion::V1_14 {
            // Locked
            dst.put_bool(false);
        }
        // No icons
        if version >= ProtocolVersion::V1_17 {
            dst.put_bool(false);
        } else {
            dst.put_varint(0);
        }
        dst.put_u8(self.columns);
        dst.put_u8(self.rows);
        dst.put_u8(self.x);
        dst.put_u8(self.y);
        dst.put_byte_array(&self.data);
        Ok(())
    }
}

/// Filled map item id per revision.
pub fn filled_map_item_id(version: ProtocolVersion) -> i32 {
    use ProtocolVersion as V;
    match version {
        v if v <= V::V1_12_2 => 358,
        v if v <= V::V1_13_1 => 608,
        v if v <= V::V1_13_2 => 613,
        v if v <= V::V1_15_2 => 671,
        v if v <= V::V1_16_4 => 733,
        v if v <= V::V1_18_2 => 847,
        v if v <= V::V1_19_1 => 886,
        v if v <= V::V1_19_3 => 914,
        v if v <= V::V1_19_4 => 937,
        v if v <= V::V1_20_2 => 941,
        v if v <= V::V1_20_3 => 979,
        v if v <= V::V1_21 => 982,
        v if v <= V::V1_21_2 => 1022,
        v if v <= V::V1_21_4 => 1031,
        v if v <= V::V1_21_5 => 1042,
        v if v <= V::V1_21_7 => 1059,
        _ => 1104,
    }
}

/// Data component id of `minecraft:map_id` (1.20.5+).
pub fn map_id_component(version: ProtocolVersion) -> i32 {
    if version <= ProtocolVersion::V1_21 {
        26
    } else if version <= ProtocolVersion::V1_21_4 {
        36
    } else {
        37
    }
}

/// Puts a filled map (map id 0) into an inventory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetContainerSlot {
    pub window_id: i32,
    pub slot: i16,
    pub count: u8,
}

impl Encode for SetContainerSlot {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        use ProtocolVersion as V;

        if version >= V::V1_21_2 {
            dst.put_varint(self.window_id);
        } else {
            dst.put_u8(self.window_id as u8);
        }
        if version >= V::V1_17_1 {
            // State id
            dst.put_varint(0);
        }
        dst.put_i16(self.slot);
        if version.between(V::V1_13_2, V::V1_20_3) {
            // Present
            dst.put_bool(true);
        }
        if version >= V::V1_20_5 {
            dst.put_varint(self.count as i32);
        }

        let item = filled_map_item_id(version);
        if version < V::V1_13_2 {
            dst.put_i16(item as i16);
        } else {
            dst.put_varint(item);
        }
        if version < V::V1_20_5 {
            dst.put_u8(self.count);
        }
        if version < V::V1_13 {
            // Damage carries the map id
            dst.put_i16(0);
        }

        if version < V::V1_8 {
            // No tag
            dst.put_i16(-1);
        } else if version < V::V1_17 {
            dst.put_u8(0);
        } else if version < V::V1_20_5 {
            Compound::new().with("map", 0).write_root(dst, version);
        } else {
            // One added component, none removed
            dst.put_varint(1);
            dst.put_varint(0);
            dst.put_varint(map_id_component(version));
            dst.put_varint(0);
        }
        Ok(())
    }
}
