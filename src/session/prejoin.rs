//! Login, configuration and client data checks that run before the join.

use super::{Session, Stage};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::dimension;
use crate::protocol::packets::{
    ChunkData, ClientInformation, Clientbound, GameEvent, JoinGame, KeepAlive, PlayerAbilities,
    PlayerPosition, PluginMessage, SetDefaultSpawnPosition, UpdateTime,
};
use crate::protocol::packets::play::GAME_EVENT_START_WAITING_CHUNKS;
use crate::protocol::{ConnectionState, ProtocolVersion};
use crate::session::Action;
use rand::Rng;
use std::time::Instant;
use tracing::debug;

/// Smallest view distance a real client reports.
const MIN_VIEW_DISTANCE: i8 = 2;

impl Session {
    pub(super) fn send_keep_alive(&mut self) {
        // Keep alive ids are varints on 1.8 through 1.12.1, stay inside i32
        let mut rng = rand::rng();
        let id = loop {
            let id = rng.random::<i32>();
            if id != 0 {
                break i64::from(id);
            }
        };
        self.pending_keep_alive = Some(id);
        self.send(Clientbound::KeepAlive(KeepAlive { id }));
    }

    /// Match a keep alive reply against the outstanding id.
    pub(super) fn expect_keep_alive(&mut self, id: i64) -> Result<()> {
        match self.pending_keep_alive.take() {
            Some(expected) if expected == id => Ok(()),
            Some(expected) => Err(ProtocolError::InvalidField(format!(
                "Keep alive id {id} does not match {expected}"
            ))),
            None => Err(ProtocolError::OrderViolation(format!(
                "Unsolicited keep alive during {}",
                self.stage
            ))),
        }
    }

    pub(super) fn on_login_acknowledged(&mut self, now: Instant) {
        self.actions.push(Action::SwitchState(ConnectionState::Configuration));
        self.send_keep_alive();
        self.enter(Stage::ConfigKeepAlive, now);
    }

    pub(super) fn on_config_keep_alive(&mut self, now: Instant) {
        for registry in dimension::registry_packets(self.version) {
            self.send(Clientbound::RegistryData(registry));
        }
        self.send(Clientbound::FinishConfiguration);
        self.enter(Stage::ConfigFinish, now);
    }

    pub(super) fn on_finish_configuration(&mut self, now: Instant) -> Result<()> {
        // Configuration-phase clients always send both before finishing
        if !self.received_client_info {
            return Err(ProtocolError::OrderViolation(
                "Configuration finished without client information".to_string(),
            ));
        }
        if self.config.verification.brand.enabled && !self.received_brand {
            return Err(ProtocolError::OrderViolation(
                "Configuration finished without a client brand".to_string(),
            ));
        }
        self.actions.push(Action::SwitchState(ConnectionState::Game));
        self.join(now)
    }

    pub(super) fn on_client_information(&mut self, info: &ClientInformation, now: Instant) -> Result<()> {
        if self.received_client_info {
            return Err(ProtocolError::Malformed(constants::ERR_DUPLICATE_CLIENT_INFO));
        }
        self.received_client_info = true;

        if info.view_distance < MIN_VIEW_DISTANCE {
            return Err(ProtocolError::InvalidField(format!(
                "View distance {} is below {MIN_VIEW_DISTANCE}",
                info.view_distance
            )));
        }
        if !self.patterns.valid_locale.is_match(&info.locale) {
            return Err(ProtocolError::InvalidField(format!("Invalid locale '{}'", info.locale)));
        }
        self.after_client_data(now)
    }

    pub(super) fn on_plugin_message(&mut self, message: &PluginMessage, now: Instant) -> Result<()> {
        if !message.is_brand() || !self.config.verification.brand.enabled {
            return Ok(());
        }
        if self.received_brand {
            return Err(ProtocolError::Malformed(constants::ERR_DUPLICATE_BRAND));
        }
        self.received_brand = true;
        self.validate_brand(&message.data)?;
        self.after_client_data(now)
    }

    fn validate_brand(&self, data: &[u8]) -> Result<()> {
        let max_length = self.config.verification.brand.max_length;
        if data.len() <= 1 || data.len() > max_length {
            return Err(ProtocolError::InvalidField(format!(
                "Brand length {} outside 2..={max_length}",
                data.len()
            )));
        }
        let brand = String::from_utf8_lossy(data);
        // From 1.8 the payload is a string; drop its length prefix
        let brand = if self.version >= ProtocolVersion::V1_8 {
            brand.chars().skip(1).collect::<String>()
        } else {
            brand.into_owned()
        };
        if !self.patterns.valid_brand.is_match(&brand) {
            return Err(ProtocolError::InvalidField(format!("Invalid brand '{brand}'")));
        }
        Ok(())
    }

    /// Whether the client data needed to pass has arrived.
    pub(super) fn client_data_complete(&self) -> bool {
        self.received_client_info && (self.received_brand || !self.config.verification.brand.enabled)
    }

    /// Advance out of the client data stage once everything arrived.
    fn after_client_data(&mut self, now: Instant) -> Result<()> {
        if self.stage == Stage::ClientData && self.client_data_complete() {
            return self.advance_after_client_data(now);
        }
        Ok(())
    }

    /// Send the join sequence and start the movement check.
    pub(super) fn join(&mut self, now: Instant) -> Result<()> {
        let verification = &self.config.verification;
        let (x, y, z) = self.movement.spawn();
        let (chunk_x, chunk_z) = self.movement.chunk();
        let teleport_id = self.movement.teleport_id();
        debug!(peer = %self.addr, version = %self.version, "Sending join sequence");

        let mut packets = vec![
            Clientbound::JoinGame(JoinGame {
                entity_id: self.player_id,
                gamemode: verification.gamemode,
                ..JoinGame::default()
            }),
            Clientbound::PlayerAbilities(PlayerAbilities::grounded()),
        ];
        if self.version >= ProtocolVersion::V1_19_3 {
            packets.push(Clientbound::SetDefaultSpawnPosition(SetDefaultSpawnPosition {
                x: x.floor() as i32,
                y: y.floor() as i32,
                z: z.floor() as i32,
            }));
        }
        // Gravity only applies once the column under the player is loaded
        for x in chunk_x - 1..=chunk_x + 1 {
            for z in chunk_z - 1..=chunk_z + 1 {
                packets.push(Clientbound::ChunkData(ChunkData { x, z }));
            }
        }
        if verification.movement.enabled && verification.movement.collisions {
            packets.push(Clientbound::UpdateSectionBlocks(self.movement.platform()));
        }
        packets.push(Clientbound::PlayerPosition(PlayerPosition {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
            teleport_id,
        }));
        packets.push(Clientbound::UpdateTime(UpdateTime {
            world_age: 0,
            time_of_day: verification.time_of_day,
        }));
        if self.version >= ProtocolVersion::V1_20_3 {
            packets.push(Clientbound::GameEvent(GameEvent {
                event: GAME_EVENT_START_WAITING_CHUNKS,
                value: 0.0,
            }));
        }
        for packet in packets {
            self.send(packet);
        }

        if !self.config.verification.movement.enabled {
            return self.advance_after_movement(now);
        }
        if self.movement.needs_confirmation(self.version) {
            self.enter(Stage::Teleport, now);
        } else {
            self.enter(Stage::Position, now);
        }
        Ok(())
    }
}
