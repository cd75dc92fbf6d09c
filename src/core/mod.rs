//! # Core Wire Components
//!
//! Low-level framing and field encoding shared by every packet.
//!
//! ## Components
//! - **VarInt**: 1-5 byte variable-length integers
//! - **Codec**: Tokio codec splitting the byte stream into frames
//! - **Wire**: bounds-checked field readers and `BufMut` writers
//! - **NBT**: binary tag writer for registry and item data
//! - **Component**: chat text in JSON or NBT form
//!
//! ## Wire Format
//! ```text
//! [Length(VarInt, 1-3 bytes)] [Packet Id(VarInt)] [Fields(N)]
//! ```
//!
//! ## Safety
//! - Maximum frame size: 2 MiB (21-bit length prefix)
//! - Lengths are validated before any allocation
//! - Field reads never panic on truncated input

pub mod codec;
pub mod component;
pub mod nbt;
pub mod varint;
pub mod wire;
