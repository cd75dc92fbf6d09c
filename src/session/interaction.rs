//! Transaction, hotbar and arm swing round trips.
//!
//! ```text
//! transaction -> held item -1, slot, slot -> carried item -> transaction
//!             -> arm animation -> arm swing
//! ```

use super::{Session, Stage};
use crate::error::{ProtocolError, Result};
use crate::protocol::packets::{
    ArmSwing, Clientbound, EntityAnimation, SetHeldItem, Transaction, LEGACY_SWING, SWING_MAIN_ARM,
};
use crate::protocol::ProtocolVersion;
use rand::Rng;
use std::time::Instant;
use tracing::trace;

/// Clients move their selection by this many slots, wrapping at the cycle.
const SLOT_SHIFT: i16 = 4;
const SLOT_CYCLE: i16 = 8;

const HOTBAR_SLOTS: i16 = 9;

#[derive(Debug, Clone, Default)]
pub(super) struct InteractionState {
    expected_transaction: Option<i32>,
    current_slot: i16,
    expected_slot: Option<i16>,
    waiting_slot_confirm: bool,
    waiting_swing: bool,
}

impl Session {
    pub(super) fn begin_interaction(&mut self, now: Instant) {
        self.enter(Stage::Interaction, now);
        self.send_transaction();
    }

    fn send_transaction(&mut self) {
        // Negative ids never collide with real inventory actions
        let id = -rand::rng().random_range(1..i32::from(i16::MAX));
        self.interaction.expected_transaction = Some(id);
        self.send(Clientbound::Transaction(Transaction {
            window_id: 0,
            id,
            accepted: false,
        }));
    }

    pub(super) fn on_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        let Some(expected) = self.interaction.expected_transaction.take() else {
            return Err(ProtocolError::OrderViolation("Unsolicited transaction".to_string()));
        };
        if transaction.window_id != 0 || !transaction.accepted {
            return Err(ProtocolError::InvalidField(format!(
                "Transaction for window {} (accepted {})",
                transaction.window_id, transaction.accepted
            )));
        }
        if transaction.id != expected {
            return Err(ProtocolError::InvalidField(format!(
                "Transaction id {} does not match {expected}",
                transaction.id
            )));
        }

        let state = &mut self.interaction;
        if state.waiting_slot_confirm {
            state.waiting_slot_confirm = false;
            state.expected_slot = None;
            state.waiting_swing = true;
            let entity_id = self.player_id;
            self.send(Clientbound::EntityAnimation(EntityAnimation {
                entity_id,
                animation: SWING_MAIN_ARM,
            }));
            return Ok(());
        }

        let slot = (state.current_slot + SLOT_SHIFT) % SLOT_CYCLE;
        state.expected_slot = Some(slot);
        trace!(peer = %self.addr, slot, "Moving hotbar selection");
        // The invalid slot has to be ignored by the client
        self.send(Clientbound::SetHeldItem(SetHeldItem { slot: -1 }));
        for _ in 0..2 {
            self.send(Clientbound::SetHeldItem(SetHeldItem { slot: slot as i8 }));
        }
        Ok(())
    }

    pub(super) fn on_carried_item(&mut self, slot: i16) -> Result<()> {
        let state = &mut self.interaction;
        if !(0..HOTBAR_SLOTS).contains(&slot) {
            return Err(ProtocolError::InvalidField(format!("Hotbar slot {slot} out of range")));
        }
        if slot == state.current_slot {
            return Err(ProtocolError::InvalidField(format!("Hotbar slot {slot} selected twice")));
        }
        let confirm = state.expected_slot == Some(slot) && !state.waiting_slot_confirm;
        state.current_slot = slot;
        if confirm {
            state.waiting_slot_confirm = true;
            self.send_transaction();
        }
        Ok(())
    }

    pub(super) fn on_arm_swing(&mut self, swing: &ArmSwing, now: Instant) -> Result<()> {
        if !self.interaction.waiting_swing {
            return Ok(());
        }
        if swing.hand != 0 {
            return Err(ProtocolError::InvalidField(format!("Swing with hand {}", swing.hand)));
        }
        if self.version < ProtocolVersion::V1_8
            && (swing.entity_id != Some(self.player_id) || swing.animation != LEGACY_SWING)
        {
            return Ok(());
        }
        self.interaction.waiting_swing = false;
        self.advance_after_interaction(now)
    }
}
