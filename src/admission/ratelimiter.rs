//! Per-address reconnect cooldown.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::debug;

/// Allows one attempt per address per cooldown window.
///
/// Each record holds the instant the address becomes eligible again. Expired
/// records are overwritten on the next attempt and dropped by [`sweep`](Self::sweep).
#[derive(Debug)]
pub struct Ratelimiter {
    cooldown: Duration,
    next_allowed: DashMap<IpAddr, Instant>,
}

impl Ratelimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            next_allowed: DashMap::new(),
        }
    }

    /// Record an attempt from `addr`; false while its cooldown is running.
    pub fn attempt(&self, addr: IpAddr) -> bool {
        self.attempt_at(addr, Instant::now())
    }

    pub fn attempt_at(&self, addr: IpAddr, now: Instant) -> bool {
        // The entry lock makes check-and-set atomic per address
        match self.next_allowed.entry(addr) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    return false;
                }
                entry.insert(now + self.cooldown);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now + self.cooldown);
                true
            }
        }
    }

    /// Drop records whose cooldown is over. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.next_allowed.len();
        self.next_allowed.retain(|_, next| *next > now);
        let removed = before.saturating_sub(self.next_allowed.len());
        if removed > 0 {
            debug!(removed, "Swept expired ratelimiter records");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.next_allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_allowed.is_empty()
    }
}
