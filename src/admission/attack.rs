//! Under-attack detection with hysteresis.

use crate::config::AttackConfig;
use crate::error::{constants, ProtocolError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Load observed on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSample {
    pub logins_per_second: u64,
    pub verifying: u64,
    pub queued: u64,
}

impl LoadSample {
    fn exceeds(&self, threshold: u64) -> bool {
        self.logins_per_second > threshold || self.verifying > threshold || self.queued > threshold
    }
}

/// Peaks of a finished attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttackSummary {
    pub duration: Duration,
    pub peak_logins_per_second: u64,
    pub peak_verifying: u64,
    pub peak_queued: u64,
}

/// Emitted by [`AttackTracker::sample_at`] when the mode flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackTransition {
    Detected,
    Mitigated(AttackSummary),
}

#[derive(Debug)]
struct CurrentAttack {
    started: Instant,
    last_over: Instant,
    peak: LoadSample,
}

#[derive(Debug, Default)]
struct TrackerState {
    current: Option<CurrentAttack>,
    last_attack: Option<AttackSummary>,
}

/// NORMAL / UNDER_ATTACK switch fed by a fixed tick.
///
/// The flag is an atomic so the login path reads it without touching the
/// mutex; only the sampling tick locks.
#[derive(Debug)]
pub struct AttackTracker {
    threshold: u64,
    min_duration: Duration,
    cooldown: Duration,
    under_attack: AtomicBool,
    state: Mutex<TrackerState>,
}

impl AttackTracker {
    pub fn new(config: &AttackConfig) -> Self {
        Self {
            threshold: config.min_players_for_attack,
            min_duration: config.min_attack_duration,
            cooldown: config.attack_cooldown_delay,
            under_attack: AtomicBool::new(false),
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn is_under_attack(&self) -> bool {
        self.under_attack.load(Ordering::Acquire)
    }

    pub fn sample(&self, load: LoadSample) -> Result<Option<AttackTransition>> {
        self.sample_at(load, Instant::now())
    }

    pub fn sample_at(&self, load: LoadSample, now: Instant) -> Result<Option<AttackTransition>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_LOCK_POISONED.to_string()))?;

        if load.exceeds(self.threshold) {
            let transition = match state.current.as_mut() {
                Some(current) => {
                    current.last_over = now;
                    current.peak.logins_per_second =
                        current.peak.logins_per_second.max(load.logins_per_second);
                    current.peak.verifying = current.peak.verifying.max(load.verifying);
                    current.peak.queued = current.peak.queued.max(load.queued);
                    None
                }
                None => {
                    state.current = Some(CurrentAttack {
                        started: now,
                        last_over: now,
                        peak: load,
                    });
                    self.under_attack.store(true, Ordering::Release);
                    Some(AttackTransition::Detected)
                }
            };
            return Ok(transition);
        }

        let ended = state.current.as_ref().is_some_and(|current| {
            now.duration_since(current.started) > self.min_duration
                && now.duration_since(current.last_over) > self.cooldown
        });
        if !ended {
            return Ok(None);
        }

        let Some(current) = state.current.take() else {
            return Ok(None);
        };
        let summary = AttackSummary {
            duration: now.duration_since(current.started),
            peak_logins_per_second: current.peak.logins_per_second,
            peak_verifying: current.peak.verifying,
            peak_queued: current.peak.queued,
        };
        state.last_attack = Some(summary);
        self.under_attack.store(false, Ordering::Release);
        Ok(Some(AttackTransition::Mitigated(summary)))
    }

    /// Summary of the most recent finished attack.
    pub fn last_attack(&self) -> Option<AttackSummary> {
        self.state.lock().ok().and_then(|state| state.last_attack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> AttackTracker {
        AttackTracker::new(&AttackConfig {
            min_players_for_attack: 8,
            min_attack_duration: Duration::from_secs(30),
            attack_cooldown_delay: Duration::from_secs(3),
            sample_interval: Duration::from_millis(250),
        })
    }

    fn load(verifying: u64) -> LoadSample {
        LoadSample {
            verifying,
            ..LoadSample::default()
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let tracker = tracker();
        let now = Instant::now();
        assert_eq!(tracker.sample_at(load(8), now).unwrap(), None);
        assert!(!tracker.is_under_attack());
        assert_eq!(
            tracker.sample_at(load(9), now).unwrap(),
            Some(AttackTransition::Detected)
        );
        assert!(tracker.is_under_attack());
    }

    #[test]
    fn test_any_signal_triggers() {
        let tracker = tracker();
        let sample = LoadSample {
            logins_per_second: 0,
            verifying: 0,
            queued: 50,
        };
        tracker.sample_at(sample, Instant::now()).unwrap();
        assert!(tracker.is_under_attack());
    }

    #[test]
    fn test_single_quiet_tick_does_not_end_attack() {
        let tracker = tracker();
        let start = Instant::now();
        tracker.sample_at(load(100), start).unwrap();
        let later = start + Duration::from_secs(40);
        tracker.sample_at(load(100), later).unwrap();
        // Quiet, but the cooldown since the last busy tick has not passed
        assert_eq!(
            tracker.sample_at(load(0), later + Duration::from_millis(250)).unwrap(),
            None
        );
        assert!(tracker.is_under_attack());
    }

    #[test]
    fn test_min_duration_holds_attack() {
        let tracker = tracker();
        let start = Instant::now();
        tracker.sample_at(load(100), start).unwrap();
        assert_eq!(
            tracker.sample_at(load(0), start + Duration::from_secs(10)).unwrap(),
            None
        );
        assert!(tracker.is_under_attack());
    }

    #[test]
    fn test_mitigation_records_peaks() {
        let tracker = tracker();
        let start = Instant::now();
        tracker.sample_at(load(20), start).unwrap();
        tracker
            .sample_at(
                LoadSample {
                    logins_per_second: 70,
                    verifying: 12,
                    queued: 3,
                },
                start + Duration::from_secs(1),
            )
            .unwrap();
        let end = start + Duration::from_secs(35);
        let transition = tracker.sample_at(load(0), end).unwrap();
        let Some(AttackTransition::Mitigated(summary)) = transition else {
            panic!("expected mitigation, got {transition:?}");
        };
        assert_eq!(summary.peak_logins_per_second, 70);
        assert_eq!(summary.peak_verifying, 20);
        assert_eq!(summary.duration, Duration::from_secs(35));
        assert!(!tracker.is_under_attack());
        assert_eq!(tracker.last_attack(), Some(summary));
    }
}
