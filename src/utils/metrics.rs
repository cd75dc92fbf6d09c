//! Verification statistics
//!
//! Counters the engine owns and the attack tracker reads. Every counter is a
//! relaxed atomic; a [`StatisticsSnapshot`] is a point-in-time copy for
//! logging.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Engine-wide counters
#[derive(Debug)]
pub struct Statistics {
    /// Accepted TCP connections
    pub connections_total: AtomicU64,
    /// Currently open connections
    pub connections_active: AtomicU64,
    /// LOGIN_START packets seen
    pub logins_total: AtomicU64,
    /// Verifications that entered the state machine
    pub verifications_started: AtomicU64,
    pub verifications_passed: AtomicU64,
    pub verifications_failed: AtomicU64,
    /// Connections refused by the login policy
    pub policy_rejections: AtomicU64,
    /// Blacklist strikes handed out
    pub blacklist_strikes: AtomicU64,
    /// Sessions released by the admission queue
    pub queue_admissions: AtomicU64,
    /// Connections handed straight to the host
    pub pass_throughs: AtomicU64,
    logins_this_second: AtomicU64,
    logins_last_second: AtomicU64,
    start_time: Instant,
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            logins_total: AtomicU64::new(0),
            verifications_started: AtomicU64::new(0),
            verifications_passed: AtomicU64::new(0),
            verifications_failed: AtomicU64::new(0),
            policy_rejections: AtomicU64::new(0),
            blacklist_strikes: AtomicU64::new(0),
            queue_admissions: AtomicU64::new(0),
            pass_throughs: AtomicU64::new(0),
            logins_this_second: AtomicU64::new(0),
            logins_last_second: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn login(&self) {
        self.logins_total.fetch_add(1, Ordering::Relaxed);
        self.logins_this_second.fetch_add(1, Ordering::Relaxed);
    }

    pub fn verification_started(&self) {
        self.verifications_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn verification_passed(&self) {
        self.verifications_passed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn verification_failed(&self) {
        self.verifications_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn policy_rejection(&self) {
        self.policy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn blacklist_strike(&self) {
        self.blacklist_strikes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queue_admitted(&self, count: u64) {
        self.queue_admissions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn pass_through(&self) {
        self.pass_throughs.fetch_add(1, Ordering::Relaxed);
    }

    /// Close the current one-second window. Called once per second.
    pub fn roll_second(&self) {
        let logins = self.logins_this_second.swap(0, Ordering::Relaxed);
        self.logins_last_second.store(logins, Ordering::Relaxed);
    }

    /// Logins counted in the last closed one-second window
    pub fn logins_per_second(&self) -> u64 {
        self.logins_last_second.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            logins_total: self.logins_total.load(Ordering::Relaxed),
            logins_per_second: self.logins_per_second(),
            verifications_started: self.verifications_started.load(Ordering::Relaxed),
            verifications_passed: self.verifications_passed.load(Ordering::Relaxed),
            verifications_failed: self.verifications_failed.load(Ordering::Relaxed),
            policy_rejections: self.policy_rejections.load(Ordering::Relaxed),
            blacklist_strikes: self.blacklist_strikes.load(Ordering::Relaxed),
            queue_admissions: self.queue_admissions.load(Ordering::Relaxed),
            pass_throughs: self.pass_throughs.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_total = snapshot.connections_total,
            connections_active = snapshot.connections_active,
            logins_total = snapshot.logins_total,
            logins_per_second = snapshot.logins_per_second,
            verifications_started = snapshot.verifications_started,
            verifications_passed = snapshot.verifications_passed,
            verifications_failed = snapshot.verifications_failed,
            policy_rejections = snapshot.policy_rejections,
            blacklist_strikes = snapshot.blacklist_strikes,
            queue_admissions = snapshot.queue_admissions,
            pass_throughs = snapshot.pass_throughs,
            uptime_seconds = snapshot.uptime_seconds,
            "Verification statistics snapshot"
        );
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub logins_total: u64,
    pub logins_per_second: u64,
    pub verifications_started: u64,
    pub verifications_passed: u64,
    pub verifications_failed: u64,
    pub policy_rejections: u64,
    pub blacklist_strikes: u64,
    pub queue_admissions: u64,
    pub pass_throughs: u64,
    pub uptime_seconds: u64,
}

/// Logs how long an operation took when dropped
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!(
            operation = self.operation,
            duration_ms = self.start.elapsed().as_millis() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logins_per_second_window() {
        let stats = Statistics::new();
        stats.login();
        stats.login();
        assert_eq!(stats.logins_per_second(), 0);
        stats.roll_second();
        assert_eq!(stats.logins_per_second(), 2);
        stats.roll_second();
        assert_eq!(stats.logins_per_second(), 0);
        assert_eq!(stats.snapshot().logins_total, 2);
    }

    #[test]
    fn test_active_connections() {
        let stats = Statistics::new();
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.connections_total, 2);
        assert_eq!(snapshot.connections_active, 1);
    }
}
