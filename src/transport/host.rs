//! Hook points for the server the engine sits in front of.

use bytes::Bytes;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::{ProtocolError, Rejection};

/// Receives connections and verdicts from [`serve`](super::serve).
///
/// Callbacks run on the connection's task; long work belongs in a spawned task.
pub trait Host: Send + Sync + 'static {
    /// A connection the engine does not verify. `replay` must be written to
    /// the real server before anything else from `stream`.
    fn on_pass_through(&self, peer: SocketAddr, stream: TcpStream, replay: Bytes);

    fn on_verified(&self, peer: SocketAddr, username: &str, _fingerprint: &str) {
        debug!(peer = %peer, user = username, "Verified");
    }

    fn on_rejected(&self, peer: SocketAddr, rejection: Rejection) {
        debug!(peer = %peer, reason = %rejection, "Rejected");
    }

    fn on_failed(&self, peer: SocketAddr, error: &ProtocolError) {
        debug!(peer = %peer, error = %error, "Failed");
    }
}

/// Closes pass-through connections. For deployments where verified clients
/// reconnect to another listener or are transferred away.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClosingHost;

impl Host for ClosingHost {
    fn on_pass_through(&self, peer: SocketAddr, _stream: TcpStream, replay: Bytes) {
        debug!(peer = %peer, replay = replay.len(), "Closing pass-through connection");
    }
}

/// Pipes pass-through connections to a backend server.
#[derive(Debug, Clone)]
pub struct ForwardingHost {
    backend: String,
}

impl ForwardingHost {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
        }
    }

    async fn forward(backend: String, mut client: TcpStream, replay: Bytes) -> std::io::Result<(u64, u64)> {
        let mut upstream = TcpStream::connect(&backend).await?;
        upstream.set_nodelay(true)?;
        upstream.write_all(&replay).await?;
        tokio::io::copy_bidirectional(&mut client, &mut upstream).await
    }
}

impl Host for ForwardingHost {
    fn on_pass_through(&self, peer: SocketAddr, stream: TcpStream, replay: Bytes) {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            match Self::forward(backend.clone(), stream, replay).await {
                Ok((sent, received)) => {
                    debug!(peer = %peer, sent, received, "Forwarded connection closed");
                }
                Err(e) => warn!(peer = %peer, backend = %backend, error = %e, "Forwarding failed"),
            }
        });
    }

    fn on_verified(&self, peer: SocketAddr, username: &str, _fingerprint: &str) {
        info!(peer = %peer, user = username, "Verified, waiting for reconnect");
    }
}
