//! Rendered challenge split into map packets.

use super::palette::MapPalette;
use super::raster::Raster;
use crate::error::{ProtocolError, Result};
use crate::protocol::packets::play::MapData;
use crate::protocol::ProtocolVersion;

/// Maps are square.
pub const MAP_SIZE: usize = 128;

/// Id of the map item handed to the client.
pub const CAPTCHA_MAP_ID: i32 = 0;

/// Answer plus its image in both wire shapes.
#[derive(Debug, Clone)]
pub struct Challenge {
    answer: String,
    legacy: Vec<MapData>,
    modern: MapData,
}

impl Challenge {
    /// Quantize `raster` to map colors and build the packets.
    pub fn new(answer: String, raster: &Raster, palette: &MapPalette) -> Result<Self> {
        if raster.width() != MAP_SIZE || raster.height() != MAP_SIZE {
            return Err(ProtocolError::InvalidField(format!(
                "Captcha image must be {MAP_SIZE}x{MAP_SIZE}, got {}x{}",
                raster.width(),
                raster.height()
            )));
        }
        let pixels: Vec<u8> = raster.pixels().iter().map(|rgb| palette.index_of(*rgb)).collect();
        Ok(Self::from_indices(answer, pixels))
    }

    /// Build from row-major palette indices (`MAP_SIZE * MAP_SIZE` of them).
    fn from_indices(answer: String, pixels: Vec<u8>) -> Self {
        // Clients before 1.8 take one column per packet, top to bottom
        let legacy = (0..MAP_SIZE)
            .map(|x| MapData {
                map_id: CAPTCHA_MAP_ID,
                columns: 1,
                rows: MAP_SIZE as u8,
                x: x as u8,
                y: 0,
                data: (0..MAP_SIZE).map(|y| pixels[y * MAP_SIZE + x]).collect(),
            })
            .collect();
        let modern = MapData {
            map_id: CAPTCHA_MAP_ID,
            columns: MAP_SIZE as u8,
            rows: MAP_SIZE as u8,
            x: 0,
            y: 0,
            data: pixels,
        };
        Self {
            answer,
            legacy,
            modern,
        }
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Packets that draw the image for `version`.
    pub fn map_packets(&self, version: ProtocolVersion) -> &[MapData] {
        if version < ProtocolVersion::V1_8 {
            &self.legacy
        } else {
            std::slice::from_ref(&self.modern)
        }
    }

    /// Whether `input` matches the answer under the configured case rule.
    pub fn is_correct(&self, input: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            input == self.answer
        } else {
            input.eq_ignore_ascii_case(&self.answer)
        }
    }
}
