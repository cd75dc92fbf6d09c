//! # Protocol Layer
//!
//! Version-aware packet definitions and the per-connection dispatcher.
//!
//! - [`version`]: ordered table of supported revisions
//! - [`registry`]: packet ids per state, direction and version band
//! - [`packets`]: packet bodies with version-branched layouts
//! - [`dimension`]: registry codecs sent before the client may join
//! - [`dispatcher`]: frame to packet and packet to frame for one connection

pub mod dimension;
pub mod dispatcher;
pub mod packets;
pub mod registry;
pub mod version;

pub use dispatcher::{Dispatcher, Inbound};
pub use registry::{ConnectionState, Direction, PacketKind};
pub use version::ProtocolVersion;
