//! Entity and vehicle packets.

use bytes::{BufMut, BytesMut};
use uuid::Uuid;

use crate::core::wire::{PacketReader, WireWrite};
use crate::error::{ProtocolError, Result};
use crate::protocol::packets::{Decode, Encode};
use crate::protocol::version::ProtocolVersion;

/// Vehicles a player is seated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Boat,
    Minecart,
}

impl EntityType {
    /// Object type before 1.14, entity type registry id after.
    pub fn id(self, version: ProtocolVersion) -> i32 {
        use ProtocolVersion as V;
        let v = version;
        match self {
            EntityType::Boat => match v {
                _ if v <= V::V1_13_2 => 1,
                _ if v <= V::V1_14_4 => 5,
                _ if v <= V::V1_16_4 => 6,
                _ if v <= V::V1_18_2 => 7,
                _ if v <= V::V1_19_3 => 8,
                _ if v <= V::V1_20_3 => 9,
                _ if v <= V::V1_21 => 10,
                // Split per wood type; this is the oak boat
                _ if v <= V::V1_21_2 => 84,
                _ if v <= V::V1_21_4 => 83,
                _ if v <= V::V1_21_5 => 84,
                _ if v <= V::V1_21_7 => 85,
                _ => 87,
            },
            EntityType::Minecart => match v {
                _ if v <= V::V1_13_2 => 10,
                _ if v <= V::V1_14_4 => 41,
                _ if v <= V::V1_15_2 => 42,
                _ if v <= V::V1_16_4 => 45,
                _ if v <= V::V1_18_2 => 50,
                _ if v <= V::V1_19_1 => 53,
                _ if v <= V::V1_19_3 => 54,
                _ if v <= V::V1_20_2 => 64,
                _ if v <= V::V1_20_3 => 65,
                _ if v <= V::V1_21 => 69,
                _ if v <= V::V1_21_2 => 81,
                _ if v <= V::V1_21_4 => 80,
                _ if v <= V::V1_21_5 => 81,
                _ if v <= V::V1_21_7 => 82,
                _ => 84,
            },
        }
    }
}

/// Spawns a non-living entity at rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnEntity {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub entity_type: EntityType,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Encode for SpawnEntity {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        use ProtocolVersion as V;

        dst.put_varint(self.entity_id);
        if version >= V::V1_9 {
            dst.put_uuid(&self.uuid);
        }
        let kind = self.entity_type.id(version);
        if version >= V::V1_14 {
            dst.put_varint(kind);
        } else {
            dst.put_u8(kind as u8);
        }
        if version >= V::V1_9 {
            dst.put_f64(self.x);
            dst.put_f64(self.y);
            dst.put_f64(self.z);
        } else {
            // Fixed point, 1/32 block
            dst.put_i32((self.x * 32.0) as i32);
            dst.put_i32((self.y * 32.0) as i32);
            dst.put_i32((self.z * 32.0) as i32);
        }
        // Pitch, yaw
        dst.put_u8(0);
        dst.put_u8(0);
        if version >= V::V1_19 {
            // Head yaw, object data
            dst.put_u8(0);
            dst.put_varint(0);
        } else {
            dst.put_i32(0);
        }
        if version >= V::V1_9 {
            // Velocity; older revisions omit it when the data is zero
            dst.put_i16(0);
            dst.put_i16(0);
            dst.put_i16(0);
        }
        Ok(())
    }
}

/// Seats one passenger on a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPassengers {
    pub vehicle_id: i32,
    pub passenger_id: i32,
}

impl Encode for SetPassengers {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        if version >= ProtocolVersion::V1_9 {
            dst.put_varint(self.vehicle_id);
            dst.put_varint(1);
            dst.put_varint(self.passenger_id);
        } else {
            // Attach entity: rider first, then vehicle, not a leash
            dst.put_i32(self.passenger_id);
            dst.put_i32(self.vehicle_id);
            dst.put_bool(false);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveEntities {
    pub ids: Vec<i32>,
}

impl Encode for RemoveEntities {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        if version == ProtocolVersion::V1_17 {
            // 1.17 briefly removed one entity per packet
            let [id] = self.ids.as_slice() else {
                return Err(ProtocolError::EncodeError(format!(
                    "{} entities in a single-entity removal",
                    self.ids.len()
                )));
            };
            dst.put_varint(*id);
            return Ok(());
        }
        if version < ProtocolVersion::V1_8 {
            dst.put_u8(self.ids.len() as u8);
            for id in &self.ids {
                dst.put_i32(*id);
            }
        } else {
            dst.put_varint(self.ids.len() as i32);
            for id in &self.ids {
                dst.put_varint(*id);
            }
        }
        Ok(())
    }
}

/// Animation id that swings the main arm.
pub const SWING_MAIN_ARM: u8 = 0;

/// Plays an animation on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityAnimation {
    pub entity_id: i32,
    pub animation: u8,
}

impl Encode for EntityAnimation {
    fn encode(&self, dst: &mut BytesMut, _version: ProtocolVersion) -> Result<()> {
        dst.put_varint(self.entity_id);
        dst.put_u8(self.animation);
        Ok(())
    }
}

/// Arm swing. 1.7 names the entity and the animation, 1.8 sends nothing,
/// 1.9+ names the hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmSwing {
    pub entity_id: Option<i32>,
    pub animation: u8,
    pub hand: i32,
}

/// Legacy animation id of a plain swing.
pub const LEGACY_SWING: u8 = 1;

impl ArmSwing {
    pub fn main_hand(entity_id: i32) -> Self {
        Self {
            entity_id: Some(entity_id),
            animation: LEGACY_SWING,
            hand: 0,
        }
    }
}

impl Decode for ArmSwing {
    fn decode(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        if version < ProtocolVersion::V1_8 {
            return Ok(Self {
                entity_id: Some(src.read_i32()?),
                animation: src.read_u8()?,
                hand: 0,
            });
        }
        let hand = if version > ProtocolVersion::V1_8 {
            src.read_varint()?
        } else {
            0
        };
        Ok(Self {
            entity_id: None,
            animation: LEGACY_SWING,
            hand,
        })
    }
}

impl Encode for ArmSwing {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        if version < ProtocolVersion::V1_8 {
            dst.put_i32(self.entity_id.unwrap_or_default());
            dst.put_u8(self.animation);
        } else if version > ProtocolVersion::V1_8 {
            dst.put_varint(self.hand);
        }
        Ok(())
    }
}

/// Steering input while riding. 1.21.2+ only reports key state, so the
/// axes stay zero there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerInput {
    pub sideways: f32,
    pub forward: f32,
    pub jump: bool,
    pub sneak: bool,
}

impl Decode for PlayerInput {
    fn decode(src: &mut PacketReader<'_>, version: ProtocolVersion) -> Result<Self> {
        if version >= ProtocolVersion::V1_21_2 {
            let keys = src.read_u8()?;
            return Ok(Self {
                sideways: 0.0,
                forward: 0.0,
                jump: keys & 0x10 != 0,
                sneak: keys & 0x20 != 0,
            });
        }
        let sideways = src.read_f32()?;
        let forward = src.read_f32()?;
        let (jump, sneak) = if version < ProtocolVersion::V1_8 {
            (src.read_bool()?, src.read_bool()?)
        } else {
            let flags = src.read_u8()?;
            (flags & 0x01 != 0, flags & 0x02 != 0)
        };
        Ok(Self {
            sideways,
            forward,
            jump,
            sneak,
        })
    }
}

impl Encode for PlayerInput {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        if version >= ProtocolVersion::V1_21_2 {
            dst.put_u8(((self.jump as u8) << 4) | ((self.sneak as u8) << 5));
            return Ok(());
        }
        dst.put_f32(self.sideways);
        dst.put_f32(self.forward);
        if version < ProtocolVersion::V1_8 {
            dst.put_bool(self.jump);
            dst.put_bool(self.sneak);
        } else {
            dst.put_u8(self.jump as u8 | ((self.sneak as u8) << 1));
        }
        Ok(())
    }
}

/// Position of the vehicle the client is steering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleMove {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Decode for VehicleMove {
    fn decode(src: &mut PacketReader<'_>, _version: ProtocolVersion) -> Result<Self> {
        // 1.21.2+ append an on-ground flag, which is not needed here
        Ok(Self {
            x: src.read_f64()?,
            y: src.read_f64()?,
            z: src.read_f64()?,
            yaw: src.read_f32()?,
            pitch: src.read_f32()?,
        })
    }
}

impl Encode for VehicleMove {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        dst.put_f64(self.x);
        dst.put_f64(self.y);
        dst.put_f64(self.z);
        dst.put_f32(self.yaw);
        dst.put_f32(self.pitch);
        if version >= ProtocolVersion::V1_21_2 {
            dst.put_bool(false);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddleBoat {
    pub left: bool,
    pub right: bool,
}

impl Decode for PaddleBoat {
    fn decode(src: &mut PacketReader<'_>, _version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            left: src.read_bool()?,
            right: src.read_bool()?,
        })
    }
}

impl Encode for PaddleBoat {
    fn encode(&self, dst: &mut BytesMut, _version: ProtocolVersion) -> Result<()> {
        dst.put_bool(self.left);
        dst.put_bool(self.right);
        Ok(())
    }
}
