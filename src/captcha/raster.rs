//! RGB raster with the few drawing primitives the captcha needs.

use super::font::{self, Glyph, GLYPH_HEIGHT, GLYPH_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const LIGHT_GRAY: Rgb = Rgb([192, 192, 192]);

    pub fn r(self) -> u8 {
        self.0[0]
    }

    pub fn g(self) -> u8 {
        self.0[1]
    }

    pub fn b(self) -> u8 {
        self.0[2]
    }

    /// Fully saturated, full brightness color for a hue in `[0, 1)`.
    pub fn from_hue(hue: f32) -> Rgb {
        let h = (hue.rem_euclid(1.0)) * 6.0;
        let sector = h.floor();
        let f = h - sector;
        let up = (f * 255.0 + 0.5) as u8;
        let down = ((1.0 - f) * 255.0 + 0.5) as u8;
        match sector as u8 {
            0 => Rgb([255, up, 0]),
            1 => Rgb([down, 255, 0]),
            2 => Rgb([0, 255, up]),
            3 => Rgb([0, down, 255]),
            4 => Rgb([up, 0, 255]),
            _ => Rgb([255, 0, down]),
        }
    }

    /// Linear interpolation towards `other`; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t + 0.5) as u8;
        Rgb([
            mix(self.r(), other.r()),
            mix(self.g(), other.g()),
            mix(self.b(), other.b()),
        ])
    }
}

/// Two-stop linear gradient from the top-left to the bottom-right corner.
#[derive(Debug, Clone, Copy)]
pub struct Gradient {
    pub from: Rgb,
    pub to: Rgb,
    pub width: f32,
    pub height: f32,
}

impl Gradient {
    pub fn at(&self, x: f32, y: f32) -> Rgb {
        let len = self.width * self.width + self.height * self.height;
        if len <= 0.0 {
            return self.from;
        }
        let t = (x * self.width + y * self.height) / len;
        self.from.lerp(self.to, t)
    }
}

/// Placement of one glyph: translation, rotation and shear around its center.
#[derive(Debug, Clone, Copy)]
pub struct GlyphTransform {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub rotation: f32,
    pub shear: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Raster {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major pixels.
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.pixels
            .get(y * self.width + x)
            .copied()
            .unwrap_or(Rgb::BLACK)
    }

    pub fn set(&mut self, x: usize, y: usize, color: Rgb) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Apply `f` to every pixel with its coordinates.
    pub fn map_pixels(&mut self, mut f: impl FnMut(usize, usize, Rgb) -> Rgb) {
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                self.pixels[idx] = f(x, y, self.pixels[idx]);
            }
        }
    }

    /// Blend `color` over the pixel with coverage `alpha`.
    pub fn blend(&mut self, x: i32, y: i32, color: Rgb, alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.pixels[idx] = self.pixels[idx].lerp(color, alpha);
    }

    /// Soft-edged disc, the stamp used for stroking.
    pub fn fill_disc(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb) {
        let reach = radius.ceil() as i32 + 1;
        let (bx, by) = (cx.round() as i32, cy.round() as i32);
        for y in by - reach..=by + reach {
            for x in bx - reach..=bx + reach {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let distance = (dx * dx + dy * dy).sqrt();
                let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(x, y, color, coverage);
                }
            }
        }
    }

    pub fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgb) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = (dx.abs().max(dy.abs()) * 2.0).ceil().max(1.0) as usize;
        let radius = width / 2.0;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            self.fill_disc(from.0 + dx * t, from.1 + dy * t, radius, color);
        }
    }

    /// Cubic Bezier through `p0`, `p1`, `p2`, `p3`, flattened into segments.
    pub fn draw_cubic(&mut self, points: [(f32, f32); 4], width: f32, color: Rgb) {
        const SEGMENTS: usize = 24;
        let [p0, p1, p2, p3] = points;
        let eval = |t: f32| {
            let u = 1.0 - t;
            let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            (
                a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
                a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
            )
        };
        let mut previous = p0;
        for segment in 1..=SEGMENTS {
            let next = eval(segment as f32 / SEGMENTS as f32);
            self.draw_line(previous, next, width, color);
            previous = next;
        }
    }

    /// Fill a glyph through `transform`, painting with `paint`.
    ///
    /// Each pixel is sampled 2x2 and inverse-mapped into glyph space, so edges
    /// come out antialiased at any rotation.
    pub fn fill_glyph(&mut self, glyph: &Glyph, transform: GlyphTransform, paint: &Gradient) {
        let half_w = GLYPH_WIDTH as f32 / 2.0;
        let half_h = GLYPH_HEIGHT as f32 / 2.0;
        let (sin, cos) = transform.rotation.sin_cos();
        let reach = ((half_w + half_h + transform.shear.abs() * half_h) * transform.scale).ceil() as i32 + 1;
        let (cx, cy) = (transform.x.round() as i32, transform.y.round() as i32);

        for py in cy - reach..=cy + reach {
            for px in cx - reach..=cx + reach {
                let mut hits = 0u8;
                for (ox, oy) in [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)] {
                    // Undo translation, rotation, scale, then shear
                    let dx = px as f32 + ox - transform.x;
                    let dy = py as f32 + oy - transform.y;
                    let rx = (dx * cos + dy * sin) / transform.scale;
                    let ry = (-dx * sin + dy * cos) / transform.scale;
                    let gx = rx - transform.shear * ry + half_w;
                    let gy = ry + half_h;
                    if gx >= 0.0 && gy >= 0.0 && font::is_set(glyph, gx as usize, gy as usize) {
                        hits += 1;
                    }
                }
                if hits > 0 {
                    let color = paint.at(px as f32, py as f32);
                    self.blend(px, py, color, hits as f32 / 4.0);
                }
            }
        }
    }
}
