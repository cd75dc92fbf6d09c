//! # Map Captcha
//!
//! Random answers rendered onto a 128x128 map and shipped as map packets.
//!
//! - [`font`]: bitmap glyphs
//! - [`raster`]: pixel buffer and drawing primitives
//! - [`filters`]: background noise, curves, grid, inverted circles, jitter
//! - [`generator`]: answer plus rendered image
//! - [`palette`]: RGB to map color index
//! - [`map`]: [`Challenge`], the packets for legacy and modern clients
//! - [`preparer`]: [`CaptchaPool`], challenges rendered ahead of time

pub mod filters;
pub mod font;
pub mod generator;
pub mod map;
pub mod palette;
pub mod preparer;
pub mod raster;

pub use generator::CaptchaGenerator;
pub use map::{Challenge, CAPTCHA_MAP_ID, MAP_SIZE};
pub use palette::MapPalette;
pub use preparer::CaptchaPool;
