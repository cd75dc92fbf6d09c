//! Map color palette.
//!
//! A map pixel is a palette index: `base * 4 + shade`. Only the base colors
//! that 1.7 clients already know are used, so one image serves every
//! revision. RGB values resolve to the nearest entry through a 15-bit lookup
//! table built once.

use super::raster::Rgb;

/// Base map colors, index 0 (transparent) excluded.
const BASE_COLORS: [u32; 35] = [
    0x7FB238, // grass
    0xF7E9A3, // sand
    0xC7C7C7, // wool
    0xFF0000, // fire
    0xA0A0FF, // ice
    0xA7A7A7, // metal
    0x007C00, // plant
    0xFFFFFF, // snow
    0xA4A8B8, // clay
    0x976D4D, // dirt
    0x707070, // stone
    0x4040FF, // water
    0x8F7748, // wood
    0xFFFCF5, // quartz
    0xD87F33, // orange
    0xB24CD8, // magenta
    0x6699D8, // light blue
    0xE5E533, // yellow
    0x7FCC19, // lime
    0xF27FA5, // pink
    0x4C4C4C, // gray
    0x999999, // light gray
    0x4C7F99, // cyan
    0x7F3FB2, // purple
    0x334CB2, // blue
    0x664C33, // brown
    0x667F33, // green
    0x993333, // red
    0x191919, // black
    0xFAEE4D, // gold
    0x5CDBD5, // diamond
    0x4A80FF, // lapis
    0x00D93A, // emerald
    0x815631, // podzol
    0x700200, // nether
];

/// Brightness multipliers of the four shades, out of 255.
const SHADES: [u32; 4] = [180, 220, 255, 135];

const LOOKUP_BITS: u32 = 5;

#[derive(Debug, Clone)]
pub struct MapPalette {
    entries: Vec<(u8, Rgb)>,
    lookup: Vec<u8>,
}

impl Default for MapPalette {
    fn default() -> Self {
        Self::new()
    }
}

impl MapPalette {
    pub fn new() -> Self {
        let mut entries = Vec::with_capacity(BASE_COLORS.len() * SHADES.len());
        for (base, rgb) in BASE_COLORS.iter().enumerate() {
            for (shade, multiplier) in SHADES.iter().enumerate() {
                let channel = |shift: u32| ((rgb >> shift & 0xFF) * multiplier / 255) as u8;
                let index = ((base + 1) * 4 + shade) as u8;
                entries.push((index, Rgb([channel(16), channel(8), channel(0)])));
            }
        }

        let levels = 1usize << LOOKUP_BITS;
        let mut lookup = Vec::with_capacity(levels * levels * levels);
        for r in 0..levels {
            for g in 0..levels {
                for b in 0..levels {
                    let center = |level: usize| ((level << (8 - LOOKUP_BITS)) | 0x4) as u8;
                    lookup.push(nearest(&entries, Rgb([center(r), center(g), center(b)])));
                }
            }
        }

        Self { entries, lookup }
    }

    /// Palette index closest to `color`.
    pub fn index_of(&self, color: Rgb) -> u8 {
        let q = |channel: u8| (channel >> (8 - LOOKUP_BITS)) as usize;
        let key = (q(color.r()) << (2 * LOOKUP_BITS)) | (q(color.g()) << LOOKUP_BITS) | q(color.b());
        self.lookup.get(key).copied().unwrap_or(0)
    }

    /// RGB value of a palette index, if the index is in use.
    pub fn color_of(&self, index: u8) -> Option<Rgb> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == index)
            .map(|(_, rgb)| *rgb)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn nearest(entries: &[(u8, Rgb)], color: Rgb) -> u8 {
    let mut best = (u32::MAX, 0u8);
    for (index, candidate) in entries {
        let d = |a: u8, b: u8| {
            let diff = a as i32 - b as i32;
            (diff * diff) as u32
        };
        // Green weighs most to the eye
        let distance = 2 * d(color.r(), candidate.r())
            + 4 * d(color.g(), candidate.g())
            + 3 * d(color.b(), candidate.b());
        if distance < best.0 {
            best = (distance, *index);
        }
    }
    best.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shaded_grass_matches_client_table() {
        let palette = MapPalette::new();
        // Index 4 is grass at the darkest-but-one shade: 0x597D27
        assert_eq!(palette.color_of(4), Some(Rgb([0x59, 0x7D, 0x27])));
        assert_eq!(palette.color_of(6), Some(Rgb([0x7F, 0xB2, 0x38])));
        assert_eq!(palette.color_of(0), None);
    }

    #[test]
    fn test_exact_colors_resolve_to_themselves() {
        let palette = MapPalette::new();
        assert_eq!(palette.index_of(Rgb([255, 255, 255])), 8 * 4 + 2);
        assert_eq!(palette.index_of(Rgb([255, 0, 0])), 4 * 4 + 2);
    }

    #[test]
    fn test_indices_stay_in_legacy_range() {
        let palette = MapPalette::new();
        assert_eq!(palette.len(), 140);
        for r in (0..=255u8).step_by(17) {
            for g in (0..=255u8).step_by(17) {
                let index = palette.index_of(Rgb([r, g, 128]));
                assert!((4..144).contains(&index), "{index}");
            }
        }
    }
}
