//! Drives one connection from the handshake to an outcome.

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use std::net::IpAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument, warn};

use crate::admission::{LoginAttempt, LoginDecision};
use crate::core::codec::FrameCodec;
use crate::core::component::TextComponent;
use crate::core::varint::write_varint;
use crate::engine::Engine;
use crate::error::{FailureClass, ProtocolError, Rejection, Result};
use crate::protocol::packets::{Clientbound, Disconnect, Intent, LoginDisconnect, LoginStart, Serverbound};
use crate::protocol::{ConnectionState, Dispatcher, Inbound, ProtocolVersion};
use crate::session::{self, Action, Session, SessionParams};

/// How a connection ended.
#[derive(Debug)]
pub enum ConnectionOutcome<S> {
    /// Status pings and logins that skip verification. `replay` holds every
    /// byte read so far, framed as received, for the host to feed onward.
    PassThrough { stream: S, replay: Bytes },
    /// The client passed and was disconnected or transferred
    Verified { username: String, fingerprint: String },
    /// Refused by the login policy
    Rejected(Rejection),
    /// Failed verification
    Failed(ProtocolError),
    /// The peer went away or the socket broke
    Disconnected,
}

impl<S> ConnectionOutcome<S> {
    pub fn is_verified(&self) -> bool {
        matches!(self, ConnectionOutcome::Verified { .. })
    }
}

struct Connection<S> {
    framed: Framed<S, FrameCodec>,
    dispatcher: Dispatcher,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn read_frame(&mut self) -> Result<BytesMut> {
        self.read_frame_until(Instant::now() + self.read_timeout, || ProtocolError::IdleTimeout)
            .await
    }

    async fn read_frame_until<F>(&mut self, deadline: Instant, on_timeout: F) -> Result<BytesMut>
    where
        F: FnOnce() -> ProtocolError,
    {
        match timeout_at(deadline, self.framed.next()).await {
            Err(_) => Err(on_timeout()),
            Ok(None) => Err(ProtocolError::ConnectionClosed),
            Ok(Some(frame)) => frame,
        }
    }

    async fn read_packet(&mut self) -> Result<(BytesMut, Serverbound)> {
        let frame = self.read_frame().await?;
        match self.dispatcher.decode(&frame)? {
            Inbound::Packet(packet) => Ok((frame, packet)),
            Inbound::Unregistered(id) => Err(ProtocolError::UnexpectedPacket {
                id,
                state: self.dispatcher.state().as_str(),
            }),
        }
    }

    /// Encode the actions in order and flush once.
    async fn apply(&mut self, actions: Vec<Action>) -> Result<()> {
        for action in actions {
            match action {
                Action::Send(packet) => {
                    let frame = self.dispatcher.encode(&packet)?;
                    self.framed.feed(frame).await?;
                }
                Action::SwitchState(state) => self.dispatcher.set_state(state),
            }
        }
        self.flush().await
    }

    async fn send(&mut self, packet: Clientbound) -> Result<()> {
        self.apply(vec![Action::Send(packet)]).await
    }

    async fn flush(&mut self) -> Result<()> {
        match timeout(self.write_timeout, self.framed.flush()).await {
            Ok(result) => result,
            Err(_) => Err(ProtocolError::IdleTimeout),
        }
    }

    /// Best effort; the connection is closing either way.
    async fn disconnect(&mut self, reason: &str) {
        let reason = TextComponent::text(reason).color("red");
        let packet = match self.dispatcher.state() {
            ConnectionState::Handshake => return,
            ConnectionState::Login => Clientbound::LoginDisconnect(LoginDisconnect { reason }),
            ConnectionState::Configuration | ConnectionState::Game => {
                Clientbound::Disconnect(Disconnect { reason })
            }
        };
        if let Err(e) = self.send(packet).await {
            debug!(error = %e, "Could not send disconnect");
        }
    }

    fn into_pass_through(self, mut replay: BytesMut) -> ConnectionOutcome<S> {
        let parts = self.framed.into_parts();
        replay.extend_from_slice(&parts.read_buf);
        ConnectionOutcome::PassThrough {
            stream: parts.io,
            replay: replay.freeze(),
        }
    }
}

/// Re-frame an inbound packet for the replay buffer.
fn push_frame(replay: &mut BytesMut, frame: &[u8]) {
    write_varint(replay, frame.len() as u32);
    replay.extend_from_slice(frame);
}

/// Run the verification on `stream`.
///
/// Works on any byte stream; the caller owns accepting and closing. Every
/// failure is reported through the outcome, never as a panic.
#[instrument(skip_all, fields(peer = %peer))]
pub async fn drive_connection<S>(stream: S, peer: IpAddr, engine: &Engine) -> ConnectionOutcome<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let verification = &engine.config().verification;
    let mut conn = Connection {
        framed: Framed::new(stream, FrameCodec::new()),
        dispatcher: Dispatcher::new(),
        read_timeout: verification.read_timeout,
        write_timeout: verification.write_timeout,
    };
    let mut replay = BytesMut::new();

    // Handshake
    let handshake = match conn.read_packet().await {
        Ok((frame, Serverbound::Handshake(handshake))) => {
            push_frame(&mut replay, &frame);
            handshake
        }
        Ok((_, other)) => {
            let error = ProtocolError::OrderViolation(format!("{} before handshake", other.name()));
            return fail(&mut conn, engine, peer, error).await;
        }
        Err(e) => return fail(&mut conn, engine, peer, e).await,
    };
    if handshake.intent == Intent::Status {
        return conn.into_pass_through(replay);
    }
    let version = ProtocolVersion::from_id(handshake.protocol_id);
    conn.dispatcher.set_version(version);
    conn.dispatcher.set_state(ConnectionState::Login);

    // Login start
    let login = match conn.read_packet().await {
        Ok((frame, Serverbound::LoginStart(login))) => {
            push_frame(&mut replay, &frame);
            login
        }
        Ok((_, other)) => {
            let error = ProtocolError::OrderViolation(format!("{} before login start", other.name()));
            return fail(&mut conn, engine, peer, error).await;
        }
        // Layouts of unknown versions are guesswork; refuse instead of penalizing
        Err(_) if version.is_unknown() => LoginStart {
            username: String::new(),
            uuid: None,
        },
        Err(e) => return fail(&mut conn, engine, peer, e).await,
    };

    let fingerprint = session::fingerprint(&login.username, peer);
    let attempt = LoginAttempt {
        addr: peer,
        version,
        username: &login.username,
        fingerprint: &fingerprint,
    };
    let ticket = match engine.controller().check_login(&attempt) {
        Ok(LoginDecision::Queued(ticket)) => ticket,
        Ok(LoginDecision::PassThrough) => return conn.into_pass_through(replay),
        Ok(LoginDecision::Reject(rejection)) => return reject(&mut conn, rejection).await,
        Err(e) => return fail(&mut conn, engine, peer, e).await,
    };

    let under_attack = ticket.under_attack;
    let _verifying = ticket.guard;
    match timeout(conn.read_timeout, ticket.admitted).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) | Err(_) => {
            engine.controller().queue.cancel(peer);
            return reject(&mut conn, Rejection::QueueTimeout).await;
        }
    }

    let captcha = match engine.challenge_for(under_attack) {
        Ok(captcha) => captcha,
        Err(rejection) => return reject(&mut conn, rejection).await,
    };

    engine.stats().verification_started();
    let controller = engine.controller();
    if controller.should_log() {
        info!(user = %login.username, version = %version, "Verifying");
    }
    let mut session = Session::new(
        SessionParams {
            addr: peer,
            version,
            username: login.username,
            uuid: login.uuid,
            challenge: captcha.challenge,
            captcha_required: captcha.required,
        },
        engine.config().clone(),
        controller.patterns().clone(),
        Instant::now().into_std(),
    );

    match run_session(&mut conn, &mut session).await {
        Ok(()) => {
            controller.record_success(session.fingerprint());
            if controller.should_log() {
                info!(user = %session.username(), "Verification passed");
            }
            ConnectionOutcome::Verified {
                username: session.username().to_string(),
                fingerprint: session.fingerprint().to_string(),
            }
        }
        Err(e) => {
            debug!(stage = %session.stage(), "Session ended early");
            fail(&mut conn, engine, peer, e).await
        }
    }
}

async fn run_session<S>(conn: &mut Connection<S>, session: &mut Session) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    session.start(Instant::now().into_std())?;
    conn.apply(session.drain_actions()).await?;

    while !session.is_passed() {
        let idle = Instant::now() + conn.read_timeout;
        let stage_deadline = Instant::from_std(session.deadline());
        let frame = conn
            .read_frame_until(idle.min(stage_deadline), || {
                match session.check_deadline(Instant::now().into_std()) {
                    Err(e) => e,
                    Ok(()) => ProtocolError::IdleTimeout,
                }
            })
            .await?;

        let now = Instant::now().into_std();
        match conn.dispatcher.decode(&frame)? {
            Inbound::Packet(packet) => session.handle(packet, now)?,
            Inbound::Unregistered(id) => session.handle_unregistered(id)?,
        }
        conn.apply(session.drain_actions()).await?;
    }
    Ok(())
}

async fn reject<S>(conn: &mut Connection<S>, rejection: Rejection) -> ConnectionOutcome<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn.disconnect(rejection.as_str()).await;
    ConnectionOutcome::Rejected(rejection)
}

async fn fail<S>(conn: &mut Connection<S>, engine: &Engine, peer: IpAddr, error: ProtocolError) -> ConnectionOutcome<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let controller = engine.controller();
    if error.class() == FailureClass::Transport {
        debug!(error = %error, "Peer left during verification");
        return ConnectionOutcome::Disconnected;
    }

    conn.disconnect(&error.to_string()).await;
    let score = controller.record_failure(peer, &error);
    if controller.should_log() {
        warn!(error = %error, score = ?score, "Verification failed");
    }
    ConnectionOutcome::Failed(error)
}
