//! Example: Verifying front door for a local game server
//!
//! Listens on the configured address, verifies new players and forwards
//! status pings and remembered players to a backend.
//!
//! Run with: `cargo run --example fallback_proxy -- [config.toml] [backend]`

use fallback_verifier::engine::{shutdown_on_ctrl_c, Engine};
use fallback_verifier::transport::{serve, ForwardingHost};
use fallback_verifier::utils::logging::init_logging;
use fallback_verifier::VerifierConfig;
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => VerifierConfig::from_file(path)?,
        None => VerifierConfig::from_env()?,
    };
    let backend = args.next().unwrap_or_else(|| "127.0.0.1:25566".to_string());

    init_logging(&config.logging)?;

    let engine = Engine::new(config)?;
    engine.prepare_captchas();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ticks = engine.spawn_ticks(shutdown_rx.clone());
    tokio::spawn(shutdown_on_ctrl_c(shutdown_tx));

    serve(engine, Arc::new(ForwardingHost::new(backend)), shutdown_rx).await?;

    for tick in ticks {
        let _ = tick.await;
    }
    Ok(())
}
