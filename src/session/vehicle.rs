//! Boat and minecart riding.
//!
//! The player is seated in a boat high above the world, steers it for a few
//! ticks, falls out, then does the same with a minecart. Every vehicle and
//! every dismount is acknowledged through a keep alive before packets count.

use super::{Session, Stage};
use crate::error::{ProtocolError, Result};
use crate::protocol::packets::{
    Clientbound, EntityType, Movement, PlayerInput, RemoveEntities, SetPassengers, SpawnEntity, VehicleMove,
};
use crate::protocol::ProtocolVersion;
use rand::Rng;
use std::time::Instant;
use tracing::trace;
use uuid::Uuid;

/// Boats lose this much vertical motion per tick in the air.
const BOAT_GRAVITY: f64 = 0.03999999910593033;

const MAX_GRAVITY_ERROR: f64 = 1e-7;

/// Steering input never exceeds this on either axis.
const MAX_INPUT: f32 = 0.98;

/// The minecart spawns this far below the boat.
const MINECART_DROP: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum VehiclePhase {
    Boat,
    AirAfterBoat,
    Minecart,
    AirAfterMinecart,
}

impl VehiclePhase {
    fn riding(self) -> bool {
        matches!(self, VehiclePhase::Boat | VehiclePhase::Minecart)
    }
}

#[derive(Debug, Clone)]
pub(super) struct VehicleState {
    entity_id: i32,
    in_air_y: f64,
    phase: VehiclePhase,
    /// Phase entered once the keep alive comes back
    next: Option<VehiclePhase>,
    rotations: u32,
    inputs: u32,
    paddles: u32,
    moves: u32,
    vehicle_y: f64,
    vehicle_motion: f64,
}

impl VehicleState {
    pub(super) fn new(player_id: i32) -> Self {
        let mut rng = rand::rng();
        let entity_id = loop {
            let id = rng.random_range(1..i32::MAX);
            if id != player_id {
                break id;
            }
        };
        Self {
            entity_id,
            in_air_y: 3000.0 + f64::from(rng.random_range(0..500)),
            phase: VehiclePhase::Boat,
            next: None,
            rotations: 0,
            inputs: 0,
            paddles: 0,
            moves: 0,
            vehicle_y: 0.0,
            vehicle_motion: 0.0,
        }
    }

    fn reset_counts(&mut self) {
        self.rotations = 0;
        self.inputs = 0;
        self.paddles = 0;
        self.moves = 0;
    }
}

impl Session {
    pub(super) fn begin_vehicle(&mut self, now: Instant) {
        self.enter(Stage::Vehicle, now);
        self.spawn_vehicle(VehiclePhase::Boat);
    }

    fn spawn_vehicle(&mut self, phase: VehiclePhase) {
        let (entity_type, y) = match phase {
            VehiclePhase::Boat => (EntityType::Boat, self.vehicle.in_air_y),
            _ => (EntityType::Minecart, self.vehicle.in_air_y - MINECART_DROP),
        };
        let (x, _, z) = self.movement.spawn();
        let vehicle_id = self.vehicle.entity_id;
        trace!(peer = %self.addr, ?entity_type, y, "Spawning vehicle");

        self.vehicle.vehicle_y = y;
        self.vehicle.vehicle_motion = 0.0;
        self.send(Clientbound::SpawnEntity(SpawnEntity {
            entity_id: vehicle_id,
            uuid: Uuid::new_v4(),
            entity_type,
            x,
            y,
            z,
        }));
        self.send(Clientbound::SetPassengers(SetPassengers {
            vehicle_id,
            passenger_id: self.player_id,
        }));
        self.await_phase(phase);
    }

    fn await_phase(&mut self, phase: VehiclePhase) {
        self.vehicle.next = Some(phase);
        self.vehicle.reset_counts();
        self.send_keep_alive();
    }

    fn waiting_for_vehicle(&self) -> bool {
        self.vehicle.next.is_some()
    }

    pub(super) fn on_vehicle_keep_alive(&mut self, id: i64) -> Result<()> {
        self.expect_keep_alive(id)?;
        if let Some(phase) = self.vehicle.next.take() {
            self.vehicle.phase = phase;
        }
        Ok(())
    }

    fn require_riding(&self, what: &str) -> Result<()> {
        if self.vehicle.phase.riding() {
            return Ok(());
        }
        Err(ProtocolError::OrderViolation(format!("{what} without a vehicle")))
    }

    pub(super) fn on_paddle(&mut self) -> Result<()> {
        if self.waiting_for_vehicle() {
            return Ok(());
        }
        if self.vehicle.phase != VehiclePhase::Boat {
            return Err(ProtocolError::OrderViolation("Paddling outside a boat".to_string()));
        }
        self.vehicle.paddles += 1;
        Ok(())
    }

    pub(super) fn on_vehicle_move(&mut self, vehicle_move: &VehicleMove) -> Result<()> {
        if self.waiting_for_vehicle() {
            return Ok(());
        }
        self.require_riding("Vehicle move")?;
        let state = &mut self.vehicle;
        if vehicle_move.y > state.in_air_y {
            return Err(ProtocolError::InvalidField(format!(
                "Vehicle rose to y {:.3}",
                vehicle_move.y
            )));
        }
        let last_motion = state.vehicle_motion;
        state.vehicle_motion = vehicle_move.y - state.vehicle_y;
        state.vehicle_y = vehicle_move.y;
        let predicted = last_motion - BOAT_GRAVITY;
        if (state.vehicle_motion - predicted).abs() >= MAX_GRAVITY_ERROR {
            return Err(ProtocolError::InvalidField(format!(
                "Vehicle motion {:.7} does not follow gravity ({predicted:.7})",
                state.vehicle_motion
            )));
        }
        if self.version >= ProtocolVersion::V1_21_2 {
            self.input_tick()?;
        }
        self.vehicle.moves += 1;
        Ok(())
    }

    pub(super) fn on_player_input(&mut self, input: &PlayerInput) -> Result<()> {
        if self.waiting_for_vehicle() {
            return Ok(());
        }
        self.require_riding("Steering")?;
        if input.forward.abs() > MAX_INPUT || input.sideways.abs() > MAX_INPUT {
            return Err(ProtocolError::InvalidField(format!(
                "Steering input {:.3}/{:.3}",
                input.sideways, input.forward
            )));
        }
        if self.version < ProtocolVersion::V1_21_2 {
            self.input_tick()?;
        }
        Ok(())
    }

    pub(super) fn on_vehicle_movement(&mut self, movement: &Movement, now: Instant) -> Result<()> {
        if self.waiting_for_vehicle() {
            return Ok(());
        }
        let phase = self.vehicle.phase;
        if phase.riding() {
            return match (movement.position, movement.rotation) {
                (Some(_), _) => Err(ProtocolError::OrderViolation("Position update while riding".to_string())),
                (None, Some(_)) => {
                    self.vehicle.rotations += 1;
                    if phase == VehiclePhase::Minecart && self.version >= ProtocolVersion::V1_21_2 {
                        self.input_tick()?;
                    }
                    Ok(())
                }
                (None, None) => Ok(()),
            };
        }

        let Some((_, y, _)) = movement.position else {
            return Ok(());
        };
        if movement.on_ground {
            return Err(ProtocolError::InvalidField("On ground after leaving the vehicle".to_string()));
        }
        if y > self.vehicle.in_air_y {
            return Err(ProtocolError::InvalidField(format!("Rose to y {y:.3} after leaving the vehicle")));
        }
        match phase {
            VehiclePhase::AirAfterBoat => {
                self.spawn_vehicle(VehiclePhase::Minecart);
                Ok(())
            }
            _ => self.advance_after_vehicle(now),
        }
    }

    /// One client tick of steering. Every input must be backed by a rotation
    /// and, in a boat on 1.9+, by a paddle state and a vehicle move.
    fn input_tick(&mut self) -> Result<()> {
        let version = self.version;
        let minimum = self.config.verification.vehicle.minimum_packets;
        let state = &mut self.vehicle;
        if state.rotations < state.inputs {
            return Err(ProtocolError::OrderViolation(format!(
                "{} inputs with {} rotations",
                state.inputs, state.rotations
            )));
        }
        if version < ProtocolVersion::V1_9 || state.phase == VehiclePhase::Minecart {
            state.paddles += 1;
            state.moves += 1;
        } else if state.paddles < state.inputs || state.moves < state.inputs {
            return Err(ProtocolError::OrderViolation(format!(
                "{} inputs with {} paddles and {} moves",
                state.inputs, state.paddles, state.moves
            )));
        }
        state.inputs += 1;

        let done = [state.rotations, state.inputs, state.paddles, state.moves]
            .iter()
            .all(|&count| count > minimum);
        if !done {
            return Ok(());
        }
        let next = match state.phase {
            VehiclePhase::Boat => VehiclePhase::AirAfterBoat,
            _ => VehiclePhase::AirAfterMinecart,
        };
        let vehicle_id = state.entity_id;
        self.send(Clientbound::RemoveEntities(RemoveEntities { ids: vec![vehicle_id] }));
        self.await_phase(next);
        Ok(())
    }
}
