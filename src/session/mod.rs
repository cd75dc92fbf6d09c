//! # Verification Session
//!
//! Per-connection state machine, written sans-IO: the session consumes
//! decoded packets plus the current time and queues [`Action`]s for the
//! transport to carry out. It never touches a socket, so every flow can be
//! driven from a test with synthetic packets.
//!
//! ## Stage order
//! ```text
//! 1.20.2+   LoginAcknowledge -> ConfigKeepAlive -> ConfigFinish ┐
//! 1.8-1.20  KeepAlive ──────────────────────────────────────────┤
//! 1.7       ────────────────────────────────────────────────────┤
//!                                                               v
//!           Teleport (1.9+) -> Position -> Falling -> ClientData
//!           -> Interaction -> Vehicle -> Captcha -> Passed
//! ```
//! Stages only move forward and disabled checks are skipped. Each has a
//! deadline measured from its entry; the captcha stage instead ends
//! `captcha.max_duration` after login.

mod captcha;
mod interaction;
mod movement;
mod prejoin;
mod vehicle;

use crate::captcha::Challenge;
use crate::config::{CompiledPatterns, VerifierConfig};
use crate::core::component::TextComponent;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::packets::{Clientbound, LoginSuccess, Serverbound};
use crate::protocol::{ConnectionState, ProtocolVersion};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;
use uuid::Uuid;

pub use captcha::CaptchaState;

/// Verification stages after LOGIN_START, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    LoginAcknowledge,
    ConfigKeepAlive,
    ConfigFinish,
    KeepAlive,
    Teleport,
    Position,
    Falling,
    ClientData,
    Interaction,
    Vehicle,
    Captcha,
    Passed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::LoginAcknowledge => "login_acknowledge",
            Stage::ConfigKeepAlive => "config_keep_alive",
            Stage::ConfigFinish => "config_finish",
            Stage::KeepAlive => "keep_alive",
            Stage::Teleport => "teleport",
            Stage::Position => "position",
            Stage::Falling => "gravity",
            Stage::ClientData => "client_data",
            Stage::Interaction => "interaction",
            Stage::Vehicle => "vehicle",
            Stage::Captcha => "captcha",
            Stage::Passed => "passed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work the transport performs on the session's behalf, in order.
#[derive(Debug, Clone)]
pub enum Action {
    Send(Clientbound),
    /// Later packets use the registry of this state
    SwitchState(ConnectionState),
}

/// Cache key for a player: SHA-256 over the lowercased name and the address.
pub fn fingerprint(username: &str, addr: IpAddr) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.to_ascii_lowercase().as_bytes());
    hasher.update([0]);
    hasher.update(addr.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Who is being verified.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub addr: IpAddr,
    pub version: ProtocolVersion,
    pub username: String,
    pub uuid: Option<Uuid>,
    /// Challenge to solve, or to fall back on after a failed movement check
    pub challenge: Option<Arc<Challenge>>,
    /// Whether the captcha runs even when every other check passes
    pub captcha_required: bool,
}

pub struct Session {
    config: Arc<VerifierConfig>,
    patterns: CompiledPatterns,
    addr: IpAddr,
    version: ProtocolVersion,
    username: String,
    uuid: Uuid,
    fingerprint: String,
    stage: Stage,
    login_started: Instant,
    stage_started: Instant,
    packets: u32,
    pending_keep_alive: Option<i64>,
    received_client_info: bool,
    received_brand: bool,
    /// Entity id of the player in the fake world
    player_id: i32,
    movement: movement::MovementState,
    interaction: interaction::InteractionState,
    vehicle: vehicle::VehicleState,
    captcha: Option<CaptchaState>,
    captcha_required: bool,
    force_captcha: bool,
    actions: Vec<Action>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("addr", &self.addr)
            .field("version", &self.version)
            .field("username", &self.username)
            .field("stage", &self.stage)
            .field("packets", &self.packets)
            .finish()
    }
}

impl Session {
    pub fn new(
        params: SessionParams,
        config: Arc<VerifierConfig>,
        patterns: CompiledPatterns,
        now: Instant,
    ) -> Self {
        let fingerprint = fingerprint(&params.username, params.addr);
        let captcha = params
            .challenge
            .map(|challenge| CaptchaState::new(challenge, config.captcha.max_tries));
        let movement = movement::MovementState::new(&config.verification.movement, params.version);
        let player_id = rand::rng().random_range(1..i32::MAX);
        Self {
            addr: params.addr,
            version: params.version,
            uuid: params.uuid.unwrap_or_else(Uuid::new_v4),
            username: params.username,
            fingerprint,
            stage: Stage::LoginAcknowledge,
            login_started: now,
            stage_started: now,
            packets: 0,
            pending_keep_alive: None,
            received_client_info: false,
            received_brand: false,
            player_id,
            movement,
            interaction: interaction::InteractionState::default(),
            vehicle: vehicle::VehicleState::new(player_id),
            captcha,
            captcha_required: params.captcha_required,
            force_captcha: false,
            actions: Vec::new(),
            config,
            patterns,
        }
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_passed(&self) -> bool {
        self.stage == Stage::Passed
    }

    /// Take the queued actions.
    pub fn drain_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    /// Answer the accepted login and begin the first stage.
    pub fn start(&mut self, now: Instant) -> Result<()> {
        self.send(Clientbound::LoginSuccess(LoginSuccess {
            uuid: self.uuid,
            username: self.username.clone(),
        }));

        if self.version.has_configuration_phase() {
            self.enter(Stage::LoginAcknowledge, now);
            return Ok(());
        }

        self.actions.push(Action::SwitchState(ConnectionState::Game));
        if self.version < ProtocolVersion::V1_8 {
            // 1.7 has no keep alive during login; join right away
            return self.join(now);
        }
        self.send_keep_alive();
        self.enter(Stage::KeepAlive, now);
        Ok(())
    }

    /// When the current stage fails unless the client makes progress.
    pub fn deadline(&self) -> Instant {
        match self.stage {
            Stage::Captcha => self.login_started + self.config.captcha.max_duration,
            _ => self.stage_started + self.config.verification.stage_timeout,
        }
    }

    pub fn check_deadline(&self, now: Instant) -> Result<()> {
        if self.stage == Stage::Passed || now < self.deadline() {
            return Ok(());
        }
        match self.stage {
            Stage::Captcha => Err(ProtocolError::ChallengeFailed(constants::ERR_CHALLENGE_EXPIRED)),
            stage => Err(ProtocolError::StageTimeout(stage.as_str())),
        }
    }

    /// Feed one decoded packet.
    pub fn handle(&mut self, packet: Serverbound, now: Instant) -> Result<()> {
        self.count_packet()?;
        self.check_deadline(now)?;
        trace!(peer = %self.addr, stage = %self.stage, packet = packet.name(), "Verification packet");

        match (self.stage, packet) {
            (Stage::Passed, _) => Ok(()),
            (Stage::LoginAcknowledge, Serverbound::LoginAcknowledged) => {
                self.on_login_acknowledged(now);
                Ok(())
            }
            (Stage::LoginAcknowledge, other) => Err(self.unexpected(&other)),

            (_, Serverbound::ClientInformation(info)) => self.on_client_information(&info, now),
            (_, Serverbound::PluginMessage(message)) => self.on_plugin_message(&message, now),
            (_, Serverbound::ClientTickEnd) => {
                self.on_client_tick();
                Ok(())
            }
            (Stage::Interaction, Serverbound::Transaction(transaction)) => self.on_transaction(&transaction),
            (_, Serverbound::Transaction(_)) => Ok(()),

            (Stage::ConfigKeepAlive, Serverbound::KeepAlive(keep_alive)) => {
                self.expect_keep_alive(keep_alive.id)?;
                self.on_config_keep_alive(now);
                Ok(())
            }
            (Stage::ConfigFinish, Serverbound::FinishConfiguration) => self.on_finish_configuration(now),
            (Stage::KeepAlive, Serverbound::KeepAlive(keep_alive)) => {
                self.expect_keep_alive(keep_alive.id)?;
                self.join(now)
            }
            (Stage::Vehicle, Serverbound::KeepAlive(keep_alive)) => self.on_vehicle_keep_alive(keep_alive.id),
            (_, Serverbound::KeepAlive(keep_alive)) if self.stage >= Stage::Teleport => {
                self.expect_keep_alive(keep_alive.id)
            }

            (Stage::Teleport, Serverbound::ConfirmTeleport(confirm)) => self.on_confirm_teleport(confirm.teleport_id, now),
            (Stage::Teleport, Serverbound::Movement(movement)) => {
                self.on_teleport_movement(&movement);
                Ok(())
            }
            (Stage::Position, Serverbound::Movement(movement)) => self.on_position(&movement, now),
            (Stage::Falling, Serverbound::Movement(movement)) => self.on_fall(&movement, now),
            (Stage::ClientData | Stage::Interaction, Serverbound::Movement(_)) => Ok(()),

            (Stage::Interaction, Serverbound::SetCarriedItem(item)) => self.on_carried_item(item.slot),
            (Stage::Interaction, Serverbound::ArmSwing(swing)) => self.on_arm_swing(&swing, now),

            (Stage::Vehicle, Serverbound::Movement(movement)) => self.on_vehicle_movement(&movement, now),
            (Stage::Vehicle, Serverbound::PlayerInput(input)) => self.on_player_input(&input),
            (Stage::Vehicle, Serverbound::VehicleMove(vehicle_move)) => self.on_vehicle_move(&vehicle_move),
            (Stage::Vehicle, Serverbound::PaddleBoat(_)) => self.on_paddle(),

            (Stage::Captcha, Serverbound::Movement(movement)) => {
                self.on_captcha_movement(&movement);
                Ok(())
            }
            (Stage::Captcha, Serverbound::SetCarriedItem(_) | Serverbound::ArmSwing(_)) => Ok(()),
            (Stage::Captcha, Serverbound::Chat(chat)) => self.on_captcha_answer(&chat.message, now),

            (_, other) => Err(self.unexpected(&other)),
        }
    }

    /// Count an inbound packet the registry does not know.
    pub fn handle_unregistered(&mut self, id: i32) -> Result<()> {
        trace!(peer = %self.addr, stage = %self.stage, id, "Ignoring unregistered packet");
        self.count_packet()
    }

    fn count_packet(&mut self) -> Result<()> {
        self.packets = self.packets.saturating_add(1);
        if self.packets > self.config.verification.max_login_packets {
            return Err(ProtocolError::Malformed(constants::ERR_TOO_MANY_PACKETS));
        }
        Ok(())
    }

    fn unexpected(&self, packet: &Serverbound) -> ProtocolError {
        ProtocolError::OrderViolation(format!("{} during {}", packet.name(), self.stage))
    }

    fn send(&mut self, packet: Clientbound) {
        self.actions.push(Action::Send(packet));
    }

    fn enter(&mut self, stage: Stage, now: Instant) {
        trace!(peer = %self.addr, from = %self.stage, to = %stage, "Stage change");
        self.stage = stage;
        self.stage_started = now;
    }

    /// Run the stages that follow the movement check.
    fn advance_after_movement(&mut self, now: Instant) -> Result<()> {
        if !self.client_data_complete() {
            self.enter(Stage::ClientData, now);
            return Ok(());
        }
        self.advance_after_client_data(now)
    }

    fn advance_after_client_data(&mut self, now: Instant) -> Result<()> {
        if self.config.verification.interaction.enabled {
            self.begin_interaction(now);
            return Ok(());
        }
        self.advance_after_interaction(now)
    }

    fn advance_after_interaction(&mut self, now: Instant) -> Result<()> {
        if self.config.verification.vehicle.enabled {
            self.begin_vehicle(now);
            return Ok(());
        }
        self.advance_after_vehicle(now)
    }

    fn advance_after_vehicle(&mut self, now: Instant) -> Result<()> {
        if (self.captcha_required || self.force_captcha) && self.captcha.is_some() {
            self.begin_captcha(now);
            return Ok(());
        }
        self.pass(now)
    }

    fn pass(&mut self, now: Instant) -> Result<()> {
        self.enter(Stage::Passed, now);
        let transfer = self
            .config
            .server
            .transfer
            .as_ref()
            .filter(|_| self.version >= ProtocolVersion::V1_20_5);
        match transfer {
            Some(target) => self.send(Clientbound::Transfer(crate::protocol::packets::Transfer {
                host: target.host.clone(),
                port: target.port,
            })),
            None => self.send(Clientbound::Disconnect(crate::protocol::packets::Disconnect {
                reason: TextComponent::text("Verification successful. Please reconnect to play.")
                    .color("green"),
            })),
        }
        Ok(())
    }
}
