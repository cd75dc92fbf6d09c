//! Image transforms that make the answer hard to OCR.
//!
//! Every filter implements [`Filter`] and mutates the raster in place. The
//! generator runs them in a fixed order: background first, occlusions last.

use super::raster::{Raster, Rgb};
use rand::{Rng, RngCore};
use std::f32::consts::TAU;

pub trait Filter: Send + Sync {
    fn apply(&self, raster: &mut Raster, rng: &mut dyn RngCore);
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut dyn RngCore) -> f32 {
    let u1: f32 = 1.0 - rng.random::<f32>();
    let u2: f32 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// Fractal value noise tinted between two dark colors.
#[derive(Debug, Clone)]
pub struct NoiseBackground {
    pub scale: f32,
    pub octaves: u32,
    pub amount: f32,
}

impl Default for NoiseBackground {
    fn default() -> Self {
        Self {
            scale: 15.0,
            octaves: 4,
            amount: 0.6,
        }
    }
}

struct ValueNoise {
    size: usize,
    lattice: Vec<f32>,
}

impl ValueNoise {
    fn new(size: usize, rng: &mut dyn RngCore) -> Self {
        let lattice = (0..size * size).map(|_| rng.random::<f32>()).collect();
        Self { size, lattice }
    }

    fn corner(&self, x: usize, y: usize) -> f32 {
        self.lattice[(y % self.size) * self.size + (x % self.size)]
    }

    fn sample(&self, x: f32, y: f32) -> f32 {
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        // Smoothstep between lattice points
        let (sx, sy) = (fx * fx * (3.0 - 2.0 * fx), fy * fy * (3.0 - 2.0 * fy));
        let (ix, iy) = (x0 as usize, y0 as usize);
        let top = self.corner(ix, iy) + (self.corner(ix + 1, iy) - self.corner(ix, iy)) * sx;
        let bottom =
            self.corner(ix, iy + 1) + (self.corner(ix + 1, iy + 1) - self.corner(ix, iy + 1)) * sx;
        top + (bottom - top) * sy
    }
}

impl Filter for NoiseBackground {
    fn apply(&self, raster: &mut Raster, rng: &mut dyn RngCore) {
        let noise = ValueNoise::new(64, rng);
        let dark = Rgb::from_hue(rng.random()).lerp(Rgb::BLACK, 0.75);
        let light = Rgb::from_hue(rng.random()).lerp(Rgb::BLACK, 0.35);
        let scale = self.scale.max(1.0);
        raster.map_pixels(|x, y, _| {
            let (mut total, mut amplitude, mut frequency, mut norm) = (0.0, 1.0, 1.0, 0.0);
            for _ in 0..self.octaves.max(1) {
                total += noise.sample(x as f32 / scale * frequency, y as f32 / scale * frequency)
                    * amplitude;
                norm += amplitude;
                amplitude *= 0.5;
                frequency *= 2.0;
            }
            dark.lerp(light, total / norm * self.amount)
        });
    }
}

/// Random cubic curves across the image.
#[derive(Debug, Clone)]
pub struct CurvesOverlay {
    pub amount: usize,
}

impl Filter for CurvesOverlay {
    fn apply(&self, raster: &mut Raster, rng: &mut dyn RngCore) {
        let (width, height) = (raster.width() as f32, raster.height() as f32);
        let half_width = width / 2.0;
        let stroke = 1.0 + rng.random::<f32>();
        for _ in 0..self.amount {
            let cx = width * rng.random::<f32>();
            let cy = height * rng.random::<f32>();
            let angle = TAU * (rng.random::<f32>() - 0.5);
            let (sin, cos) = angle.sin_cos();
            let (sin, cos) = (sin * half_width, cos * half_width);
            let color = Rgb::from_hue(rng.random());
            raster.draw_cubic(
                [
                    (cx - cos, cy - sin),
                    (cx + sin / 2.0, cy - cos / 2.0),
                    (cx - sin / 2.0, cy + cos / 2.0),
                    (cx + cos, cy + sin),
                ],
                stroke,
                color,
            );
        }
    }
}

/// Slightly slanted grid lines.
#[derive(Debug, Clone)]
pub struct GridOverlay {
    pub amount: usize,
    pub line_width: f32,
    pub random_offset: u32,
}

impl Filter for GridOverlay {
    fn apply(&self, raster: &mut Raster, rng: &mut dyn RngCore) {
        if self.amount == 0 {
            return;
        }
        let (width, height) = (raster.width() as f32, raster.height() as f32);
        let spacing_x = width / self.amount as f32 + self.line_width;
        let spacing_y = height / self.amount as f32 + self.line_width;
        let (mut x, mut y) = (spacing_x / 2.0, spacing_y / 2.0);
        let color = Rgb::LIGHT_GRAY.lerp(Rgb::BLACK, 0.4);
        for _ in 0..self.amount {
            let stroke = self.line_width * 0.5 + self.line_width * rng.random::<f32>();
            let dx = rng.random_range(0..self.random_offset.max(1)) as f32;
            let dy = rng.random_range(0..self.random_offset.max(1)) as f32;
            raster.draw_line((x, 0.0), (x + dx, height), stroke, color);
            raster.draw_line((0.0, y), (width, y + dy), stroke, color);
            x += spacing_x + self.line_width;
            y += spacing_y + self.line_width;
        }
    }
}

/// Discs whose content is replaced by `LIGHT_GRAY - color`.
#[derive(Debug, Clone)]
pub struct CircleInverse {
    pub amount: usize,
    pub min_radius: u32,
    pub radius_expansion: u32,
}

impl Filter for CircleInverse {
    fn apply(&self, raster: &mut Raster, rng: &mut dyn RngCore) {
        let (width, height) = (raster.width(), raster.height());
        let (min_x, min_y) = (width / 4, height / 4);
        for _ in 0..self.amount {
            // Centers stay in the middle half of the image
            let cx = (min_x + rng.random_range(0..(width - min_x * 2).max(1))) as i64;
            let cy = (min_y + rng.random_range(0..(height - min_y * 2).max(1))) as i64;
            let radius = (self.min_radius + rng.random_range(0..self.radius_expansion.max(1))) as i64;
            raster.map_pixels(|x, y, pixel| {
                let (dx, dy) = (x as i64 - cx, y as i64 - cy);
                if dx * dx + dy * dy > radius * radius {
                    return pixel;
                }
                let gray = Rgb::LIGHT_GRAY;
                Rgb([
                    gray.r().saturating_sub(pixel.r()),
                    gray.g().saturating_sub(pixel.g()),
                    gray.b().saturating_sub(pixel.b()),
                ])
            });
        }
    }
}

/// Per-channel Gaussian jitter.
#[derive(Debug, Clone)]
pub struct NoiseOverlay {
    pub density: f32,
    pub amount: f32,
}

impl Filter for NoiseOverlay {
    fn apply(&self, raster: &mut Raster, rng: &mut dyn RngCore) {
        raster.map_pixels(|_, _, pixel| {
            if rng.random::<f32>() > self.density {
                return pixel;
            }
            let mut jitter =
                |channel: u8| (channel as f32 + gaussian(rng) * self.amount).clamp(0.0, 255.0) as u8;
            Rgb([jitter(pixel.r()), jitter(pixel.g()), jitter(pixel.b())])
        });
    }
}
