use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, instrument, warn};

use super::connection::{drive_connection, ConnectionOutcome};
use super::host::Host;
use crate::engine::{shutdown_signal, Engine};
use crate::error::Result;

/// Bind `server.address` and serve until `shutdown` turns `true`.
#[instrument(skip(engine, host, shutdown), fields(address = %engine.config().server.address))]
pub async fn serve(engine: Engine, host: Arc<dyn Host>, shutdown: watch::Receiver<bool>) -> Result<()> {
    let listener = TcpListener::bind(&engine.config().server.address).await?;
    serve_listener(listener, engine, host, shutdown).await
}

/// Serve on an already bound listener.
pub async fn serve_listener(
    listener: TcpListener,
    engine: Engine,
    host: Arc<dyn Host>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    info!(address = %listener.local_addr()?, "Listening");
    let slots = Arc::new(Semaphore::new(engine.config().server.max_connections));
    let stopping = shutdown_signal(shutdown);
    tokio::pin!(stopping);

    loop {
        tokio::select! {
            _ = &mut stopping => {
                info!("Shutting down server. Waiting for connections to close...");
                drain(&engine).await;
                return Ok(());
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        // Reserved before spawning so a burst of accepts cannot overshoot
                        let Ok(permit) = slots.clone().try_acquire_owned() else {
                            debug!(peer = %peer, "Connection limit reached, dropping");
                            continue;
                        };
                        let engine = engine.clone();
                        let host = host.clone();
                        tokio::spawn(async move {
                            handle(stream, peer, engine, host).await;
                            drop(permit);
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}

/// Wait for live connections, up to `server.shutdown_timeout`.
async fn drain(engine: &Engine) {
    let timeout = tokio::time::sleep(engine.config().server.shutdown_timeout);
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            _ = &mut timeout => {
                warn!("Shutdown timeout reached, forcing exit");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                let connections = engine.stats().connections_active.load(Ordering::Relaxed);
                info!(connections = %connections, "Waiting for connections to close");
                if connections == 0 {
                    info!("All connections closed, shutting down");
                    break;
                }
            }
        }
    }
}

async fn handle(stream: TcpStream, peer: SocketAddr, engine: Engine, host: Arc<dyn Host>) {
    engine.stats().connection_opened();
    if let Err(e) = stream.set_nodelay(true) {
        debug!(peer = %peer, error = %e, "Could not set TCP_NODELAY");
    }

    match drive_connection(stream, peer.ip(), &engine).await {
        ConnectionOutcome::PassThrough { stream, replay } => host.on_pass_through(peer, stream, replay),
        ConnectionOutcome::Verified { username, fingerprint } => host.on_verified(peer, &username, &fingerprint),
        ConnectionOutcome::Rejected(rejection) => host.on_rejected(peer, rejection),
        ConnectionOutcome::Failed(error) => host.on_failed(peer, &error),
        ConnectionOutcome::Disconnected => {}
    }
    engine.stats().connection_closed();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerifierConfig;
    use crate::transport::ClosingHost;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_connection_limit_reserved_at_accept() {
        let config = VerifierConfig::default_with_overrides(|c| c.server.max_connections = 2);
        let engine = Engine::new(config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (stop, shutdown) = watch::channel(false);
        let server = tokio::spawn(serve_listener(listener, engine, Arc::new(ClosingHost), shutdown));

        let mut clients = Vec::new();
        for _ in 0..3 {
            clients.push(TcpStream::connect(address).await.unwrap());
        }

        // Nobody has sent a byte yet, so only a refused socket reads EOF
        let mut refused = 0;
        for client in &mut clients {
            let mut buf = [0u8; 1];
            match tokio::time::timeout(Duration::from_millis(300), client.read(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) => refused += 1,
                Ok(Ok(_)) => panic!("server sent data before the handshake"),
                Err(_) => {}
            }
        }
        assert_eq!(refused, 1);

        stop.send(true).unwrap();
        drop(clients);
        server.await.unwrap().unwrap();
    }
}
