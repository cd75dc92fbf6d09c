//! Answer generation and rendering.

use super::filters::{CircleInverse, CurvesOverlay, Filter, GridOverlay, NoiseBackground, NoiseOverlay};
use super::font::{self, GLYPH_WIDTH};
use super::map::MAP_SIZE;
use super::raster::{GlyphTransform, Gradient, Raster, Rgb};
use crate::config::CaptchaConfig;
use rand::{Rng, RngCore};

/// Renders random answers through a filter pipeline.
pub struct CaptchaGenerator {
    width: usize,
    height: usize,
    alphabet: Vec<char>,
    answer_length: usize,
    background: Box<dyn Filter>,
    overlays: Vec<Box<dyn Filter>>,
}

impl std::fmt::Debug for CaptchaGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptchaGenerator")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("alphabet", &self.alphabet.iter().collect::<String>())
            .field("answer_length", &self.answer_length)
            .field("overlays", &self.overlays.len())
            .finish()
    }
}

impl CaptchaGenerator {
    /// Generator for map-sized images with the standard pipeline.
    pub fn new(config: &CaptchaConfig) -> Self {
        let alphabet = config
            .alphabet
            .chars()
            .filter(|c| font::glyph(*c).is_some())
            .collect();
        Self {
            width: MAP_SIZE,
            height: MAP_SIZE,
            alphabet,
            answer_length: config.answer_length.max(1),
            background: Box::new(NoiseBackground::default()),
            overlays: vec![
                Box::new(CurvesOverlay { amount: 3 }),
                Box::new(GridOverlay {
                    amount: 6,
                    line_width: 1.0,
                    random_offset: 12,
                }),
                Box::new(CircleInverse {
                    amount: 1,
                    min_radius: 12,
                    radius_expansion: 18,
                }),
                Box::new(NoiseOverlay {
                    density: 1.0,
                    amount: 20.0,
                }),
            ],
        }
    }

    /// Random answer drawn from the alphabet.
    pub fn answer(&self, rng: &mut dyn RngCore) -> String {
        if self.alphabet.is_empty() {
            return String::new();
        }
        (0..self.answer_length)
            .map(|_| self.alphabet[rng.random_range(0..self.alphabet.len())])
            .collect()
    }

    pub fn render(&self, answer: &str, rng: &mut dyn RngCore) -> Raster {
        let mut raster = Raster::new(self.width, self.height);
        self.background.apply(&mut raster, rng);
        self.draw_answer(&mut raster, answer, rng);
        for overlay in &self.overlays {
            overlay.apply(&mut raster, rng);
        }
        raster
    }

    pub fn generate(&self, rng: &mut dyn RngCore) -> (String, Raster) {
        let answer = self.answer(rng);
        let raster = self.render(&answer, rng);
        (answer, raster)
    }

    fn draw_answer(&self, raster: &mut Raster, answer: &str, rng: &mut dyn RngCore) {
        let count = answer.chars().count().max(1);
        let (width, height) = (self.width as f32, self.height as f32);
        let cell = (GLYPH_WIDTH + 1) as f32;
        let scale = ((width - 16.0) / (count as f32 * cell)).min(4.0);
        let advance = cell * scale;

        let paint = Gradient {
            from: Rgb::from_hue(rng.random()),
            to: Rgb::from_hue(rng.random()),
            width,
            height,
        };
        let outline = Gradient {
            from: Rgb::BLACK,
            to: Rgb::BLACK,
            width,
            height,
        };

        let mut x = (width - advance * count as f32) / 2.0 + advance / 2.0;
        let jitter = height / 12.0;
        for c in answer.chars() {
            let Some(glyph) = font::glyph(c) else {
                x += advance;
                continue;
            };
            let transform = GlyphTransform {
                x,
                y: height / 2.0 + rng.random_range(-jitter..=jitter),
                scale: scale * rng.random_range(0.9..1.1),
                rotation: rng.random_range(-5.0f32..5.0).to_radians(),
                shear: ((x + height) / 16.0).sin() / 6.0,
            };
            if rng.random_bool(0.25) {
                let shadow = GlyphTransform {
                    scale: transform.scale * 1.15,
                    ..transform
                };
                raster.fill_glyph(glyph, shadow, &outline);
            }
            raster.fill_glyph(glyph, transform, &paint);
            x += advance;
        }
    }
}
