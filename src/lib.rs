//! # Fallback Verifier
//!
//! Bot verification for the front door of a versioned game protocol server.
//! Unauthenticated clients are held in a synthetic login that imitates the
//! real server just long enough to tell genuine clients from connectors.
//!
//! ## Layout
//! - [`core`]: varints, wire primitives, frame codec, NBT and text components
//! - [`protocol`]: version table, packet registry, packet layouts, dispatcher
//! - [`admission`]: ratelimiter, blacklist, verified cache, queue, attack tracker
//! - [`captcha`]: map captcha rendering and the precomputed pool
//! - [`session`]: the per-connection verification state machine
//! - [`transport`]: TCP server, connection driver and host hooks
//! - [`engine`]: shared state and periodic ticks
//!
//! ## Example
//! ```no_run
//! use fallback_verifier::{config::VerifierConfig, engine::Engine, transport};
//! use std::sync::Arc;
//!
//! # async fn run() -> fallback_verifier::error::Result<()> {
//! let engine = Engine::new(VerifierConfig::default())?;
//! let (tx, rx) = tokio::sync::watch::channel(false);
//! engine.prepare_captchas();
//! let _ticks = engine.spawn_ticks(rx.clone());
//! tokio::spawn(fallback_verifier::engine::shutdown_on_ctrl_c(tx));
//! transport::serve(engine, Arc::new(transport::ForwardingHost::new("127.0.0.1:25566")), rx).await
//! # }
//! ```

pub mod admission;
pub mod captcha;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod utils;

pub use config::VerifierConfig;
pub use engine::Engine;
pub use error::{ProtocolError, Result};
