//! Map captcha stage.

use super::{Session, Stage};
use crate::captcha::Challenge;
use crate::core::component::TextComponent;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::packets::{
    Clientbound, Movement, PlayerAbilities, SetContainerSlot, SetHeldItem, SystemChat,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// First hotbar slot of the player inventory window.
const HOTBAR_START: i16 = 36;

const HOTBAR_SLOTS: i8 = 9;

/// A keep alive goes out every this many movement packets while solving.
const KEEP_ALIVE_EVERY: u32 = 20;

/// Challenge plus the answers left.
#[derive(Debug, Clone)]
pub struct CaptchaState {
    challenge: Arc<Challenge>,
    tries_left: u32,
    movements: u32,
}

impl CaptchaState {
    pub fn new(challenge: Arc<Challenge>, max_tries: u32) -> Self {
        Self {
            challenge,
            tries_left: max_tries.max(1),
            movements: 0,
        }
    }

    pub fn tries_left(&self) -> u32 {
        self.tries_left
    }
}

impl Session {
    pub(super) fn begin_captcha(&mut self, now: Instant) {
        let Some(captcha) = self.captcha.as_ref() else {
            return;
        };
        let challenge = Arc::clone(&captcha.challenge);
        let slot = rand::rng().random_range(0..HOTBAR_SLOTS);
        debug!(peer = %self.addr, slot, "Sending captcha");

        // The map goes to a random slot, which is then selected
        self.send(Clientbound::SetContainerSlot(SetContainerSlot {
            window_id: 0,
            slot: HOTBAR_START + i16::from(slot),
            count: 1,
        }));
        self.send(Clientbound::SetHeldItem(SetHeldItem { slot }));
        for map in challenge.map_packets(self.version) {
            self.send(Clientbound::MapData(map.clone()));
        }
        self.send(Clientbound::PlayerAbilities(PlayerAbilities::frozen()));
        self.send(Clientbound::SystemChat(SystemChat {
            message: TextComponent::text("Please enter the code shown on the map in chat.")
                .color("yellow"),
        }));
        self.enter(Stage::Captcha, now);
    }

    pub(super) fn on_captcha_movement(&mut self, _movement: &Movement) {
        let due = match self.captcha.as_mut() {
            Some(captcha) => {
                captcha.movements = captcha.movements.wrapping_add(1);
                captcha.movements % KEEP_ALIVE_EVERY == 0
            }
            None => false,
        };
        if due && self.pending_keep_alive.is_none() {
            self.send_keep_alive();
        }
    }

    pub(super) fn on_captcha_answer(&mut self, answer: &str, now: Instant) -> Result<()> {
        let case_sensitive = self.config.captcha.case_sensitive;
        let Some(captcha) = self.captcha.as_mut() else {
            return Err(ProtocolError::OrderViolation("Chat without a captcha".to_string()));
        };
        if captcha.challenge.is_correct(answer, case_sensitive) {
            return self.pass(now);
        }

        captcha.tries_left = captcha.tries_left.saturating_sub(1);
        if captcha.tries_left == 0 {
            return Err(ProtocolError::ChallengeFailed(constants::ERR_WRONG_ANSWER));
        }
        let tries_left = captcha.tries_left;
        self.send(Clientbound::SystemChat(SystemChat {
            message: TextComponent::text(format!("Wrong answer, {tries_left} tries left.")).color("red"),
        }));
        Ok(())
    }
}
