//! Terrain packets: empty chunks and the collision platform.

use bytes::{BufMut, BytesMut};

use crate::core::nbt::{Compound, Tag};
use crate::core::wire::WireWrite;
use crate::error::{ProtocolError, Result};
use crate::protocol::dimension;
use crate::protocol::packets::Encode;
use crate::protocol::version::ProtocolVersion;

/// Blocks the collision platform can be built from. Each has a distinct
/// height, so a client has to simulate the collision to land correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    EnchantingTable,
    Trapdoor,
    EndPortalFrame,
    DaylightSensor,
    CobblestoneWall,
    StoneSlab,
    WhiteCarpet,
}

impl BlockType {
    pub const ALL: [BlockType; 7] = [
        BlockType::EnchantingTable,
        BlockType::Trapdoor,
        BlockType::EndPortalFrame,
        BlockType::DaylightSensor,
        BlockType::CobblestoneWall,
        BlockType::StoneSlab,
        BlockType::WhiteCarpet,
    ];

    /// Top of the collision box above the block's origin.
    pub fn height(self, version: ProtocolVersion) -> f64 {
        match self {
            BlockType::EnchantingTable => 0.75,
            BlockType::Trapdoor => 0.1875,
            BlockType::EndPortalFrame => 0.8125,
            BlockType::DaylightSensor => 0.375,
            BlockType::CobblestoneWall => 1.5,
            BlockType::StoneSlab => 0.5,
            // 1.7 carpets have no collision height
            BlockType::WhiteCarpet if version < ProtocolVersion::V1_8 => 0.0,
            BlockType::WhiteCarpet => 0.0625,
        }
    }

    /// Block id before 1.13, block state id after.
    pub fn state_id(self, version: ProtocolVersion) -> i32 {
        use ProtocolVersion as V;
        let v = version;
        match self {
            BlockType::EnchantingTable => match v {
                _ if v <= V::V1_12_2 => 116,
                _ if v <= V::V1_13_1 => 4612,
                _ if v <= V::V1_13_2 => 4613,
                _ if v <= V::V1_15_2 => 5116,
                _ if v <= V::V1_16_1 => 5132,
                _ if v <= V::V1_16_4 => 5136,
                _ if v <= V::V1_18_2 => 5333,
                _ if v <= V::V1_19_1 => 5719,
                _ if v <= V::V1_19_3 => 7159,
                _ if v <= V::V1_19_4 => 7385,
                _ => 7389,
            },
            BlockType::Trapdoor => match v {
                _ if v <= V::V1_7_6 => 96,
                _ if v <= V::V1_12_2 => 167,
                _ if v <= V::V1_13_1 => 6509,
                _ if v <= V::V1_13_2 => 6510,
                _ if v <= V::V1_15_2 => 7016,
                _ if v <= V::V1_16_1 => 7552,
                _ if v <= V::V1_16_4 => 7556,
                _ if v <= V::V1_18_2 => 7802,
                _ if v <= V::V1_19_1 => 8293,
                _ if v <= V::V1_19_3 => 9937,
                _ if v <= V::V1_19_4 => 10269,
                _ if v <= V::V1_20 => 10273,
                _ => 10414,
            },
            BlockType::EndPortalFrame => match v {
                _ if v <= V::V1_12_2 => 120,
                _ if v <= V::V1_13_1 => 4633,
                _ if v <= V::V1_13_2 => 4634,
                _ if v <= V::V1_15_2 => 5137,
                _ if v <= V::V1_16_1 => 5153,
                _ if v <= V::V1_16_4 => 5157,
                _ if v <= V::V1_18_2 => 5358,
                _ if v <= V::V1_19_1 => 5744,
                _ if v <= V::V1_19_3 => 7184,
                _ if v <= V::V1_19_4 => 7410,
                _ => 7414,
            },
            BlockType::DaylightSensor => match v {
                _ if v <= V::V1_12_2 => 151,
                _ if v <= V::V1_13_1 => 5651,
                _ if v <= V::V1_13_2 => 5652,
                _ if v <= V::V1_15_2 => 6158,
                _ if v <= V::V1_16_1 => 6694,
                _ if v <= V::V1_16_4 => 6698,
                _ if v <= V::V1_18_2 => 6916,
                _ if v <= V::V1_19_1 => 7327,
                _ if v <= V::V1_19_3 => 8811,
                _ if v <= V::V1_19_4 => 9063,
                _ if v <= V::V1_20 => 9067,
                _ => 9207,
            },
            BlockType::CobblestoneWall => match v {
                _ if v <= V::V1_12_2 => 139,
                _ if v <= V::V1_13_1 => 5196,
                _ if v <= V::V1_13_2 => 5197,
                _ if v <= V::V1_15_2 => 5700,
                _ if v <= V::V1_16_1 => 5660,
                _ if v <= V::V1_16_4 => 5664,
                _ if v <= V::V1_18_2 => 5866,
                _ if v <= V::V1_19_1 => 6252,
                _ if v <= V::V1_19_3 => 7692,
                _ if v <= V::V1_19_4 => 7918,
                _ => 7922,
            },
            BlockType::StoneSlab => match v {
                _ if v <= V::V1_12_2 => 44,
                _ if v <= V::V1_13_1 => 7296,
                _ if v <= V::V1_13_2 => 7297,
                _ if v <= V::V1_15_2 => 7809,
                _ if v <= V::V1_16_1 => 8345,
                _ if v <= V::V1_16_4 => 8349,
                _ if v <= V::V1_18_2 => 8595,
                _ if v <= V::V1_19_1 => 9092,
                _ if v <= V::V1_19_3 => 10748,
                _ if v <= V::V1_19_4 => 11086,
                _ if v <= V::V1_20 => 11090,
                _ => 11231,
            },
            BlockType::WhiteCarpet => match v {
                _ if v <= V::V1_12_2 => 171,
                _ if v <= V::V1_13_1 => 6823,
                _ if v <= V::V1_13_2 => 6824,
                _ if v <= V::V1_15_2 => 7330,
                _ if v <= V::V1_16_1 => 7866,
                _ if v <= V::V1_16_4 => 7870,
                _ if v <= V::V1_18_2 => 8116,
                _ if v <= V::V1_19_1 => 8607,
                _ if v <= V::V1_19_3 => 10251,
                _ if v <= V::V1_19_4 => 10583,
                _ if v <= V::V1_20 => 10587,
                _ => 10728,
            },
        }
    }
}

/// One block inside a chunk section. Coordinates are local to the chunk
/// horizontally and absolute vertically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockUpdate {
    pub x: u8,
    pub y: i32,
    pub z: u8,
    pub block: BlockType,
}

impl BlockUpdate {
    /// `xxxx zzzz yyyyyyyy`, the record key before 1.16.2.
    fn legacy_position(&self) -> u16 {
        (u16::from(self.x & 15) << 12) | (u16::from(self.z & 15) << 8) | (self.y & 0xFF) as u16
    }

    /// `xxxx zzzz yyyy`, the low bits of a 1.16.2+ record.
    fn section_position(&self) -> i64 {
        (i64::from(self.x & 15) << 8) | (i64::from(self.z & 15) << 4) | i64::from(self.y & 15)
    }
}

/// Several block changes inside one chunk section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSectionBlocks {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub blocks: Vec<BlockUpdate>,
}

impl Encode for UpdateSectionBlocks {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        use ProtocolVersion as V;

        let Some(first) = self.blocks.first() else {
            return Err(ProtocolError::EncodeError("empty block update".to_string()));
        };

        if version < V::V1_16_2 {
            dst.put_i32(self.chunk_x);
            dst.put_i32(self.chunk_z);
            if version < V::V1_8 {
                // Record count, then the byte size of the records
                dst.put_i16(self.blocks.len() as i16);
                dst.put_i32(4 * self.blocks.len() as i32);
            } else {
                dst.put_varint(self.blocks.len() as i32);
            }
            for block in &self.blocks {
                dst.put_u16(block.legacy_position());
                let id = block.block.state_id(version);
                if version >= V::V1_13 {
                    dst.put_varint(id);
                } else if version >= V::V1_8 {
                    // Metadata lives in the low nibble
                    dst.put_varint(id << 4);
                } else {
                    dst.put_i16((id << 4) as i16);
                }
            }
            return Ok(());
        }

        let section_y = i64::from(first.y >> 4);
        let section = ((i64::from(self.chunk_x) & 0x3F_FFFF) << 42)
            | (section_y & 0xF_FFFF)
            | ((i64::from(self.chunk_z) & 0x3F_FFFF) << 20);
        dst.put_i64(section);
        if version < V::V1_20 {
            // Suppress light updates
            dst.put_bool(true);
        }
        dst.put_varint(self.blocks.len() as i32);
        for block in &self.blocks {
            let id = i64::from(block.block.state_id(version));
            dst.put_varlong((id << 12) | block.section_position());
        }
        Ok(())
    }
}

/// A chunk column with no blocks in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkData {
    pub x: i32,
    pub z: i32,
}

/// Heightmap type id of `MOTION_BLOCKING` in the 1.21.5+ heightmap list.
const MOTION_BLOCKING: i32 = 4;

impl ChunkData {
    /// Nine bits per column; entries span long boundaries before 1.16.
    fn heightmap_longs(version: ProtocolVersion) -> usize {
        if version < ProtocolVersion::V1_16 {
            36
        } else {
            37
        }
    }

    fn write_heightmaps(dst: &mut BytesMut, version: ProtocolVersion) {
        let longs = Self::heightmap_longs(version);
        if version >= ProtocolVersion::V1_21_5 {
            dst.put_varint(1);
            dst.put_varint(MOTION_BLOCKING);
            dst.put_varint(longs as i32);
            dst.put_bytes(0, longs * 8);
            return;
        }
        Compound::new()
            .with("MOTION_BLOCKING", Tag::LongArray(vec![0; longs]))
            .write_root(dst, version);
    }

    /// 1.18+ sections: no blocks, all air, all plains.
    fn write_sections(dst: &mut BytesMut, version: ProtocolVersion) {
        let sized = version < ProtocolVersion::V1_21_5;
        let section_len = if sized { 8 } else { 6 };
        let sections = dimension::section_count(version);
        dst.put_varint((section_len * sections) as i32);
        for _ in 0..sections {
            // Non-air block count
            dst.put_i16(0);
            // Single-valued block states (air), then single-valued biomes (plains)
            for _ in 0..2 {
                dst.put_u8(0);
                dst.put_varint(0);
                if sized {
                    dst.put_varint(0);
                }
            }
        }
    }
}

impl Encode for ChunkData {
    fn encode(&self, dst: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        use ProtocolVersion as V;

        dst.put_i32(self.x);
        dst.put_i32(self.z);

        if version >= V::V1_17 {
            if version <= V::V1_17_1 {
                // Section mask
                dst.put_varint(0);
            }
        } else {
            // Full chunk
            dst.put_bool(true);
            if version.between(V::V1_16, V::V1_16_1) {
                // Ignore old data
                dst.put_bool(true);
            }
            if version > V::V1_8 {
                dst.put_varint(0);
            } else {
                // One section, so old clients do not treat the column as void
                dst.put_i16(1);
            }
        }

        if version >= V::V1_14 {
            Self::write_heightmaps(dst, version);
            if version.between(V::V1_15, V::V1_17_1) {
                if version >= V::V1_16_2 {
                    dst.put_varint(1024);
                    for _ in 0..1024 {
                        dst.put_varint(0);
                    }
                } else {
                    dst.put_bytes(0, 1024 * 4);
                }
            }
        }

        if version < V::V1_8 {
            // Add bit mask, compressed size
            dst.put_i16(0);
            dst.put_i32(0);
        } else if version < V::V1_13 {
            dst.put_varint(0);
        } else if version < V::V1_15 {
            // Biomes
            dst.put_byte_array(&[0; 1024]);
        } else if version < V::V1_18 {
            dst.put_varint(0);
        } else {
            Self::write_sections(dst, version);
        }

        if version >= V::V1_9_4 {
            // Block entities
            dst.put_varint(0);
        }

        if version >= V::V1_18 {
            if version < V::V1_20 {
                // Trust edges
                dst.put_bool(true);
            }
            // Four empty light masks, then no sky or block light arrays
            for _ in 0..6 {
                dst.put_varint(0);
            }
        }
        Ok(())
    }
}
