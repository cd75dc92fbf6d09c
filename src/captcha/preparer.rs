//! Challenge pool filled ahead of time.

use super::generator::CaptchaGenerator;
use super::map::Challenge;
use super::palette::MapPalette;
use crate::config::CaptchaConfig;
use crate::error::{constants, ProtocolError, Result};
use crate::utils::metrics::Timer;
use rand::seq::IndexedRandom;
use rand::RngCore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Rendered challenges shared by all sessions.
///
/// Rendering runs on a blocking worker; sessions can draw from the pool as
/// soon as the first challenge exists.
#[derive(Debug, Default)]
pub struct CaptchaPool {
    challenges: RwLock<Vec<Arc<Challenge>>>,
    preparing: AtomicBool,
}

impl CaptchaPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.challenges.read().map(|pool| !pool.is_empty()).unwrap_or(false)
    }

    pub fn is_preparing(&self) -> bool {
        self.preparing.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.challenges.read().map(|pool| pool.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A random prepared challenge, `None` while the pool is empty.
    pub fn random(&self) -> Result<Option<Arc<Challenge>>> {
        let pool = self
            .challenges
            .read()
            .map_err(|_| ProtocolError::Custom(constants::ERR_LOCK_POISONED.to_string()))?;
        Ok(pool.choose(&mut rand::rng()).cloned())
    }

    /// Render `amount` challenges on the calling thread, replacing the pool.
    pub fn fill(&self, config: &CaptchaConfig, amount: usize, rng: &mut dyn RngCore) -> Result<usize> {
        let _timer = Timer::start("captcha_prepare");
        let generator = CaptchaGenerator::new(config);
        let palette = MapPalette::new();

        // The previous batch keeps serving until the first new challenge lands
        let mut fresh = true;
        for rendered in 0..amount {
            let (answer, raster) = generator.generate(rng);
            let challenge = Arc::new(Challenge::new(answer, &raster, &palette)?);
            let mut pool = self
                .challenges
                .write()
                .map_err(|_| ProtocolError::Custom(constants::ERR_LOCK_POISONED.to_string()))?;
            if fresh {
                pool.clear();
                fresh = false;
            }
            pool.push(challenge);
            if rendered == 0 || (rendered + 1) % 100 == 0 {
                debug!(rendered = rendered + 1, amount, "Captcha pool progress");
            }
        }
        Ok(amount)
    }

    /// Fill the pool on tokio's blocking pool. Returns `None` when a fill is
    /// already running.
    pub fn spawn_prepare(self: &Arc<Self>, config: CaptchaConfig) -> Option<JoinHandle<Result<usize>>> {
        if self.preparing.swap(true, Ordering::AcqRel) {
            return None;
        }
        let pool = Arc::clone(self);
        Some(tokio::task::spawn_blocking(move || {
            let amount = config.precompute_amount;
            info!(amount, "Preparing captcha challenges");
            let result = pool.fill(&config, amount, &mut rand::rng());
            pool.preparing.store(false, Ordering::Release);
            if let Ok(prepared) = &result {
                info!(prepared, "Captcha challenges ready");
            }
            result
        }))
    }
}
