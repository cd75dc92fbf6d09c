//! # Transport
//!
//! TCP front door. [`serve`] accepts sockets and runs [`drive_connection`]
//! on each; the [`Host`] decides what happens to connections that pass or
//! bypass verification.

pub mod connection;
pub mod host;
pub mod server;

pub use connection::{drive_connection, ConnectionOutcome};
pub use host::{ClosingHost, ForwardingHost, Host};
pub use server::{serve, serve_listener};
