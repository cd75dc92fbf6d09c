//! # Engine
//!
//! Owns every piece of shared state and the periodic ticks that maintain it.
//! One engine serves all connections; nothing lives in a global.
//!
//! ## Ticks
//! - queue poll every `queue.poll_interval`
//! - attack sampling every `attack.sample_interval`
//! - per-second counters and cache sweep every second
//! - statistics log every `logging.metrics_interval`
//!
//! All ticks stop when the shutdown signal flips to `true`.

use crate::admission::{AdmissionController, AttackTransition, LoadSample, MemoryVerifiedStore, VerifiedStore};
use crate::captcha::{CaptchaPool, Challenge};
use crate::config::VerifierConfig;
use crate::error::{Rejection, Result};
use crate::utils::Statistics;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tracing::{error, info, warn};

const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(1);

/// Captcha handed to a new session.
#[derive(Debug, Clone, Default)]
pub struct CaptchaAssignment {
    pub challenge: Option<Arc<Challenge>>,
    /// Solve it even after every other check passed
    pub required: bool,
}

/// Shared verification state.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<VerifierConfig>,
    controller: Arc<AdmissionController>,
    captchas: Arc<CaptchaPool>,
    stats: Arc<Statistics>,
}

impl Engine {
    /// Engine with an in-memory verified store.
    pub fn new(config: VerifierConfig) -> Result<Self> {
        Self::with_store(config, Arc::new(MemoryVerifiedStore::new()))
    }

    /// Engine backed by an external verified store.
    pub fn with_store(config: VerifierConfig, store: Arc<dyn VerifiedStore>) -> Result<Self> {
        config.validate_strict()?;
        let config = Arc::new(config);
        let stats = Arc::new(Statistics::new());
        let controller = Arc::new(AdmissionController::new(config.clone(), store, stats.clone())?);
        Ok(Self {
            config,
            controller,
            captchas: Arc::new(CaptchaPool::new()),
            stats,
        })
    }

    pub fn config(&self) -> &Arc<VerifierConfig> {
        &self.config
    }

    pub fn controller(&self) -> &Arc<AdmissionController> {
        &self.controller
    }

    pub fn captchas(&self) -> &Arc<CaptchaPool> {
        &self.captchas
    }

    pub fn stats(&self) -> &Arc<Statistics> {
        &self.stats
    }

    pub fn is_under_attack(&self) -> bool {
        self.controller.attack.is_under_attack()
    }

    /// Start rendering captchas in the background when they are enabled.
    pub fn prepare_captchas(&self) -> Option<JoinHandle<Result<usize>>> {
        if !self.config.captcha.enabled {
            return None;
        }
        self.captchas.spawn_prepare(self.config.captcha.clone())
    }

    /// Captcha for a new session. A required captcha needs a prepared
    /// challenge; otherwise one is kept on standby for failed movement checks.
    pub(crate) fn challenge_for(&self, under_attack: bool) -> std::result::Result<CaptchaAssignment, Rejection> {
        if self.controller.captcha_required(under_attack) {
            return match self.captchas.random() {
                Ok(Some(challenge)) => Ok(CaptchaAssignment {
                    challenge: Some(challenge),
                    required: true,
                }),
                Ok(None) | Err(_) => Err(Rejection::CaptchaPreparing),
            };
        }
        if !self.config.captcha.enabled || !self.config.verification.movement.captcha_on_fail {
            return Ok(CaptchaAssignment::default());
        }
        Ok(CaptchaAssignment {
            challenge: self.captchas.random().ok().flatten(),
            required: false,
        })
    }

    /// Current load as seen by the attack tracker.
    pub fn load(&self) -> LoadSample {
        LoadSample {
            logins_per_second: self.stats.logins_per_second(),
            verifying: self.controller.verifying_count() as u64,
            queued: self.controller.queue.len() as u64,
        }
    }

    /// Spawn the periodic ticks. They end when `shutdown` turns `true`.
    pub fn spawn_ticks(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(4);

        let engine = self.clone();
        handles.push(spawn_tick("queue", self.config.queue.poll_interval, shutdown.clone(), move || {
            if let Err(e) = engine.controller.poll_queue() {
                error!(error = %e, "Queue poll failed");
            }
        }));

        let engine = self.clone();
        handles.push(spawn_tick("attack", self.config.attack.sample_interval, shutdown.clone(), move || {
            engine.sample_attack();
        }));

        let engine = self.clone();
        handles.push(spawn_tick("housekeeping", HOUSEKEEPING_INTERVAL, shutdown.clone(), move || {
            engine.stats.roll_second();
            engine.controller.sweep();
        }));

        // A zero interval turns the statistics log off
        if !self.config.logging.metrics_interval.is_zero() {
            let engine = self.clone();
            handles.push(spawn_tick("metrics", self.config.logging.metrics_interval, shutdown, move || {
                engine.stats.log_metrics();
            }));
        }

        handles
    }

    /// Feed one load sample into the attack tracker and log transitions.
    pub fn sample_attack(&self) {
        let load = self.load();
        match self.controller.attack.sample(load) {
            Ok(Some(AttackTransition::Detected)) => {
                warn!(
                    logins_per_second = load.logins_per_second,
                    verifying = load.verifying,
                    queued = load.queued,
                    "Attack detected"
                );
            }
            Ok(Some(AttackTransition::Mitigated(summary))) => {
                info!(
                    duration_secs = summary.duration.as_secs(),
                    peak_logins_per_second = summary.peak_logins_per_second,
                    peak_verifying = summary.peak_verifying,
                    peak_queued = summary.peak_queued,
                    "Attack mitigated"
                );
            }
            Ok(None) => {}
            Err(e) => error!(error = %e, "Attack sampling failed"),
        }
    }
}

fn spawn_tick<F>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                next = ticks.next() => {
                    if next.is_none() {
                        break;
                    }
                    tick();
                }
            }
        }
        tracing::debug!(tick = name, "Tick stopped");
    })
}

/// Resolves once `shutdown` turns `true` or its sender is dropped.
pub async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Flip `shutdown` on CTRL+C.
pub async fn shutdown_on_ctrl_c(shutdown: watch::Sender<bool>) {
    if let Ok(()) = tokio::signal::ctrl_c().await {
        info!("Received CTRL+C signal, shutting down");
        let _ = shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::LoginAttempt;
    use crate::protocol::ProtocolVersion;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_invalid_config_refused() {
        let config = VerifierConfig::default_with_overrides(|c| c.verification.gamemode = 9);
        assert!(Engine::new(config).is_err());
    }

    #[test]
    fn test_challenge_requires_pool() {
        let engine = Engine::new(VerifierConfig::default_with_overrides(|c| {
            c.captcha.enabled = true;
            c.captcha.during_attack_only = false;
        }))
        .unwrap();
        assert_eq!(engine.challenge_for(false).unwrap_err(), Rejection::CaptchaPreparing);

        let disabled = Engine::new(VerifierConfig::default_with_overrides(|c| c.captcha.enabled = false)).unwrap();
        let assignment = disabled.challenge_for(true).unwrap();
        assert!(assignment.challenge.is_none());
        assert!(!assignment.required);
    }

    #[test]
    fn test_standby_challenge_is_optional() {
        let engine = Engine::new(VerifierConfig::default_with_overrides(|c| {
            c.captcha.enabled = true;
            c.captcha.during_attack_only = true;
            c.verification.movement.captcha_on_fail = true;
        }))
        .unwrap();
        // Nothing prepared yet, the session still starts without a fallback
        let assignment = engine.challenge_for(false).unwrap();
        assert!(assignment.challenge.is_none());
        assert!(!assignment.required);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_drain_queue_and_stop() {
        let engine = Engine::new(VerifierConfig::default()).unwrap();
        let attempt = LoginAttempt {
            addr: IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)),
            version: ProtocolVersion::V1_21,
            username: "Steve",
            fingerprint: "fp",
        };
        let decision = engine.controller().check_login(&attempt).unwrap();
        let crate::admission::LoginDecision::Queued(ticket) = decision else {
            panic!("expected a queued login");
        };

        let (tx, rx) = watch::channel(false);
        let handles = engine.spawn_ticks(rx);
        tokio::time::timeout(Duration::from_secs(5), ticket.admitted)
            .await
            .unwrap()
            .unwrap();

        tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
