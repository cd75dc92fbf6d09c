//! Teleport confirmation, position echo, gravity and platform collision.
//!
//! The player is dropped above an invisible platform inside a random chunk.
//! After echoing the teleport the client has to fall with vanilla gravity
//! and land exactly on top of the platform block.

use super::{Session, Stage};
use crate::config::MovementCheck;
use crate::error::{ProtocolError, Result};
use crate::protocol::packets::{BlockType, BlockUpdate, Movement, UpdateSectionBlocks};
use crate::protocol::ProtocolVersion;
use rand::Rng;
use std::time::Instant;
use tracing::debug;

/// Largest X/Z drift accepted in the echoed position.
const POSITION_TOLERANCE: f64 = 1e-6;

/// Spawn chunks are drawn from this range so replayed positions do not match.
const SPAWN_CHUNK_RANGE: i32 = 625;

/// Vertical acceleration per tick.
const GRAVITY: f64 = 0.08;

/// Vertical drag, applied in single precision by the client.
const DRAG: f64 = 0.98f32 as f64;

const MAX_GRAVITY_ERROR: f64 = 1e-7;

/// The platform spans these local block coordinates on both axes.
const PLATFORM_START: u8 = 4;
const PLATFORM_END: u8 = 12;

#[derive(Debug, Clone)]
pub(super) struct MovementState {
    chunk: (i32, i32),
    spawn: (f64, f64, f64),
    platform_y: i32,
    block: BlockType,
    teleport_id: i32,
    /// 1.21.2+ echo the position before confirming the teleport
    pending_echo: Option<Movement>,
    y: f64,
    delta_y: f64,
    ticks: u32,
    client_ticks: u32,
    can_fall: bool,
}

/// Upper bound of the distance fallen in `ticks`, so the client cannot land
/// before the checked ticks have passed.
fn fall_allowance(ticks: u32) -> f64 {
    let mut motion = 0.0f64;
    let mut distance = 0.0;
    for _ in 0..ticks {
        motion = (motion - 0.1) * DRAG;
        distance += motion.abs();
    }
    distance
}

impl MovementState {
    pub(super) fn new(check: &MovementCheck, version: ProtocolVersion) -> Self {
        let mut rng = rand::rng();
        let chunk = (
            rng.random_range(-SPAWN_CHUNK_RANGE..SPAWN_CHUNK_RANGE),
            rng.random_range(-SPAWN_CHUNK_RANGE..SPAWN_CHUNK_RANGE),
        );
        let block = BlockType::ALL[rng.random_range(0..BlockType::ALL.len())];
        let platform_y = rng.random_range(1..256);
        let spawn_y =
            f64::from(platform_y) + block.height(version) + fall_allowance(check.max_movement_ticks).ceil();
        // Block center in the middle of the chunk, above the platform
        let spawn = (
            f64::from(chunk.0 * 16) + 8.5,
            spawn_y,
            f64::from(chunk.1 * 16) + 8.5,
        );
        Self {
            chunk,
            spawn,
            platform_y,
            block,
            teleport_id: rng.random_range(1..i32::MAX),
            pending_echo: None,
            y: spawn_y,
            delta_y: 0.0,
            ticks: 0,
            client_ticks: 0,
            can_fall: false,
        }
    }

    pub(super) fn spawn(&self) -> (f64, f64, f64) {
        self.spawn
    }

    pub(super) fn chunk(&self) -> (i32, i32) {
        self.chunk
    }

    pub(super) fn teleport_id(&self) -> i32 {
        self.teleport_id
    }

    /// Clients before 1.9 have no teleport confirmation.
    pub(super) fn needs_confirmation(&self, version: ProtocolVersion) -> bool {
        version >= ProtocolVersion::V1_9
    }

    /// The 8x8 collision platform under the spawn.
    pub(super) fn platform(&self) -> UpdateSectionBlocks {
        let (platform_y, block) = (self.platform_y, self.block);
        let blocks = (PLATFORM_START..PLATFORM_END)
            .flat_map(|x| {
                (PLATFORM_START..PLATFORM_END).map(move |z| BlockUpdate {
                    x,
                    y: platform_y,
                    z,
                    block,
                })
            })
            .collect();
        UpdateSectionBlocks {
            chunk_x: self.chunk.0,
            chunk_z: self.chunk.1,
            blocks,
        }
    }

    /// Y the client stands at after landing.
    fn landing_y(&self, version: ProtocolVersion) -> f64 {
        f64::from(self.platform_y) + self.block.height(version)
    }

    fn matches(&self, x: f64, z: f64) -> bool {
        (x - self.spawn.0).abs() <= POSITION_TOLERANCE && (z - self.spawn.2).abs() <= POSITION_TOLERANCE
    }

    fn inside_spawn_chunk(&self, x: f64, z: f64) -> bool {
        (x / 16.0).floor() as i32 == self.chunk.0 && (z / 16.0).floor() as i32 == self.chunk.1
    }
}

impl Session {
    fn movement_check(&self) -> &MovementCheck {
        &self.config.verification.movement
    }

    pub(super) fn on_client_tick(&mut self) {
        if matches!(self.stage, Stage::Teleport | Stage::Position | Stage::Falling) {
            self.movement.client_ticks = self.movement.client_ticks.saturating_add(1);
        }
    }

    /// Movement before the teleport is confirmed. Only 1.21.2+ echo here.
    pub(super) fn on_teleport_movement(&mut self, movement: &Movement) {
        if self.version >= ProtocolVersion::V1_21_2 && movement.position.is_some() && movement.rotation.is_some() {
            self.movement.pending_echo = Some(*movement);
        }
    }

    pub(super) fn on_confirm_teleport(&mut self, teleport_id: i32, now: Instant) -> Result<()> {
        let expected = self.movement.teleport_id();
        if teleport_id != expected {
            return Err(ProtocolError::InvalidField(format!(
                "Teleport id {teleport_id} does not match {expected}"
            )));
        }
        self.enter(Stage::Position, now);
        if self.version < ProtocolVersion::V1_21_2 {
            return Ok(());
        }
        let Some(echo) = self.movement.pending_echo.take() else {
            return Err(ProtocolError::OrderViolation(
                "Teleport confirmed before the position echo".to_string(),
            ));
        };
        self.on_position(&echo, now)
    }

    /// The echo of the teleport. Rotation-only and ground-only packets carry
    /// nothing to check.
    pub(super) fn on_position(&mut self, movement: &Movement, now: Instant) -> Result<()> {
        let Some((x, y, z)) = movement.position else {
            return Ok(());
        };
        if !self.movement.matches(x, z) {
            let (spawn_x, _, spawn_z) = self.movement.spawn();
            return Err(ProtocolError::InvalidField(format!(
                "Position {x:.3}/{z:.3} does not match spawn {spawn_x:.3}/{spawn_z:.3}"
            )));
        }
        let check = self.movement_check();
        if !check.gravity && !check.collisions {
            return self.advance_after_movement(now);
        }
        if movement.rotation.is_none() {
            return Err(ProtocolError::OrderViolation("Teleport echo without rotation".to_string()));
        }
        if movement.on_ground {
            return Err(ProtocolError::InvalidField("On ground right after the teleport".to_string()));
        }

        // Falling is measured from the echoed height
        self.movement.y = y;
        self.movement.delta_y = 0.0;
        self.enter(Stage::Falling, now);
        Ok(())
    }

    pub(super) fn on_fall(&mut self, movement: &Movement, now: Instant) -> Result<()> {
        let Some((x, y, z)) = movement.position else {
            return Ok(());
        };
        let version = self.version;
        let (gravity, collisions, max_ticks) = {
            let check = self.movement_check();
            (check.gravity, check.collisions, check.max_movement_ticks)
        };

        let state = &mut self.movement;
        let last_delta = state.delta_y;
        state.delta_y = y - state.y;
        state.y = y;
        let delta_y = state.delta_y;

        if y < f64::from(state.platform_y) {
            return self.fail_fall(format!("Fell through the platform at y {y:.3}"), now);
        }
        if !state.inside_spawn_chunk(x, z) {
            return Err(ProtocolError::InvalidField(format!("Left the spawn chunk at {x:.3}/{z:.3}")));
        }
        if version >= ProtocolVersion::V1_21_2 && state.client_ticks < state.ticks {
            return Err(ProtocolError::InvalidField(format!(
                "{} movement ticks in {} client ticks",
                state.ticks, state.client_ticks
            )));
        }

        if !movement.on_ground {
            if delta_y == 0.0 {
                // The first packet after the echo does not move yet
                if movement.rotation.is_none() || state.ticks != 0 {
                    return Err(ProtocolError::OrderViolation(format!(
                        "Standing still after {} ticks of falling",
                        state.ticks
                    )));
                }
                if version < ProtocolVersion::V1_8 {
                    // 1.7 starts falling in the same tick
                    state.ticks += 1;
                }
                state.can_fall = true;
                return Ok(());
            }
            if !state.can_fall {
                return Err(ProtocolError::OrderViolation(format!("Unexpected y motion {delta_y:.5}")));
            }
            state.ticks += 1;
            if gravity {
                let predicted = (last_delta - GRAVITY) * DRAG;
                if (delta_y - predicted).abs() > MAX_GRAVITY_ERROR {
                    return self.fail_fall(format!("Motion {delta_y:.7} does not follow gravity ({predicted:.7})"), now);
                }
                if !collisions && state.ticks == max_ticks {
                    return self.advance_after_movement(now);
                }
            }
            return Ok(());
        }

        if !collisions {
            return Ok(());
        }
        state.ticks += 1;
        if gravity && state.ticks < max_ticks {
            let ticks = state.ticks;
            return self.fail_fall(format!("Landed after {ticks} ticks"), now);
        }
        let offset = state.landing_y(version) - y;
        if offset != 0.0 {
            return self.fail_fall(format!("Landed {offset:.5} off the platform"), now);
        }
        self.advance_after_movement(now)
    }

    /// Fail the check, or move on with the captcha forced when configured.
    fn fail_fall(&mut self, reason: String, now: Instant) -> Result<()> {
        if self.movement_check().captcha_on_fail && self.captcha.is_some() {
            debug!(peer = %self.addr, reason = %reason, "Movement check failed, forcing captcha");
            self.force_captcha = true;
            return self.advance_after_movement(now);
        }
        Err(ProtocolError::InvalidField(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> MovementState {
        MovementState::new(&MovementCheck::default(), ProtocolVersion::LATEST)
    }

    #[test]
    fn test_spawn_above_platform_center() {
        let state = state();
        let (x, y, z) = state.spawn();
        assert_eq!(x.fract().abs(), 0.5);
        assert_eq!(z.fract().abs(), 0.5);
        assert!(state.inside_spawn_chunk(x, z));
        assert!(y >= state.landing_y(ProtocolVersion::LATEST) + 1.0);
        assert!(state.teleport_id() > 0);
    }

    #[test]
    fn test_fall_allowance_outlasts_gravity() {
        let mut motion = 0.0;
        let mut fallen = 0.0;
        for _ in 0..8 {
            motion = (motion - GRAVITY) * DRAG;
            fallen += motion.abs();
        }
        assert!(fall_allowance(8) > fallen);
        assert_eq!(fall_allowance(0), 0.0);
    }

    #[test]
    fn test_platform_covers_spawn() {
        let state = state();
        let platform = state.platform();
        assert_eq!(platform.blocks.len(), 64);
        assert_eq!((platform.chunk_x, platform.chunk_z), state.chunk());
        assert!(platform
            .blocks
            .iter()
            .any(|block| block.x == 8 && block.z == 8 && block.y == state.platform_y));
    }

    #[test]
    fn test_position_tolerance() {
        let state = state();
        let (x, _, z) = state.spawn();
        assert!(state.matches(x, z));
        assert!(state.matches(x + 1e-9, z - 1e-9));
        assert!(!state.matches(x + 0.01, z));
        assert!(!state.matches(x, z + 1.0));
        assert!(!state.inside_spawn_chunk(x + 16.0, z));
    }

    #[test]
    fn test_confirmation_gate() {
        let state = state();
        assert!(!state.needs_confirmation(ProtocolVersion::V1_8));
        assert!(state.needs_confirmation(ProtocolVersion::V1_9));
        assert!(state.needs_confirmation(ProtocolVersion::LATEST));
    }
}
