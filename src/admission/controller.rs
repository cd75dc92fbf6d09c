//! Login policy.
//!
//! [`AdmissionController::check_login`] runs the checks a LOGIN_START goes
//! through before any verification packet is written: version gates, username
//! shape, one session per address, blacklist, the verified bypass, the
//! reconnect cooldown and finally the admission queue.

use super::attack::AttackTracker;
use super::blacklist::Blacklist;
use super::queue::AdmissionQueue;
use super::ratelimiter::Ratelimiter;
use super::verified::{VerifiedCache, VerifiedStore};
use crate::config::{CompiledPatterns, VerifierConfig};
use crate::error::{constants, ProtocolError, Rejection, Result};
use crate::protocol::packets::login::MAX_USERNAME_LEN;
use crate::protocol::ProtocolVersion;
use crate::utils::Statistics;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// What the controller knows about a login attempt.
#[derive(Debug, Clone)]
pub struct LoginAttempt<'a> {
    pub addr: IpAddr,
    pub version: ProtocolVersion,
    pub username: &'a str,
    pub fingerprint: &'a str,
}

/// Outcome of the login policy.
#[derive(Debug)]
pub enum LoginDecision {
    /// Refuse before verification starts
    Reject(Rejection),
    /// Hand the connection to the host untouched
    PassThrough,
    /// Wait for the queue, then verify
    Queued(QueueTicket),
}

/// Marks an address as verifying until dropped.
#[derive(Debug)]
pub struct VerifyingGuard {
    addr: IpAddr,
    verifying: Arc<DashMap<IpAddr, ()>>,
}

impl VerifyingGuard {
    pub fn addr(&self) -> IpAddr {
        self.addr
    }
}

impl Drop for VerifyingGuard {
    fn drop(&mut self) {
        self.verifying.remove(&self.addr);
    }
}

/// A queued verification.
#[derive(Debug)]
pub struct QueueTicket {
    /// Resolves when the queue admits the session
    pub admitted: oneshot::Receiver<()>,
    /// Attack flag as read at LOGIN_START; the session keeps this value
    pub under_attack: bool,
    pub guard: VerifyingGuard,
}

/// Shared admission state, one per engine.
pub struct AdmissionController {
    config: Arc<VerifierConfig>,
    patterns: CompiledPatterns,
    pub ratelimiter: Ratelimiter,
    pub blacklist: Blacklist,
    pub verified: VerifiedCache,
    pub queue: AdmissionQueue,
    pub attack: AttackTracker,
    verifying: Arc<DashMap<IpAddr, ()>>,
    stats: Arc<Statistics>,
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("verifying", &self.verifying.len())
            .field("queued", &self.queue.len())
            .field("blacklisted", &self.blacklist.len())
            .field("under_attack", &self.attack.is_under_attack())
            .finish()
    }
}

impl AdmissionController {
    pub fn new(
        config: Arc<VerifierConfig>,
        store: Arc<dyn VerifiedStore>,
        stats: Arc<Statistics>,
    ) -> Result<Self> {
        let verification = &config.verification;
        Ok(Self {
            patterns: verification.compile_patterns()?,
            ratelimiter: Ratelimiter::new(verification.reconnect_delay),
            blacklist: Blacklist::new(verification.blacklist_time),
            verified: VerifiedCache::new(verification.remember_time, store),
            queue: AdmissionQueue::new(),
            attack: AttackTracker::new(&config.attack),
            verifying: Arc::new(DashMap::new()),
            stats,
            config,
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn patterns(&self) -> &CompiledPatterns {
        &self.patterns
    }

    pub fn stats(&self) -> &Arc<Statistics> {
        &self.stats
    }

    /// Addresses holding a verifying slot, queued ones included.
    pub fn verifying_count(&self) -> usize {
        self.verifying.len()
    }

    /// Whether connection lines should be logged right now.
    pub fn should_log(&self) -> bool {
        let verification = &self.config.verification;
        verification.log_connections
            && (verification.log_during_attack || !self.attack.is_under_attack())
    }

    /// Whether a session started with this attack flag must solve a captcha.
    pub fn captcha_required(&self, under_attack: bool) -> bool {
        let captcha = &self.config.captcha;
        captcha.enabled && (!captcha.during_attack_only || under_attack)
    }

    /// Run the login policy. `Err` means the username broke the protocol.
    pub fn check_login(&self, attempt: &LoginAttempt<'_>) -> Result<LoginDecision> {
        let verification = &self.config.verification;
        self.stats.login();

        if attempt.version.is_unknown() {
            return Ok(self.reject(attempt, Rejection::UnsupportedVersion));
        }

        let protocol = attempt.version.id();
        if verification.blacklisted_protocols.contains(&protocol) {
            return Ok(self.reject(attempt, Rejection::ProtocolBlacklisted));
        }

        let name_len = attempt.username.chars().count();
        if name_len == 0
            || name_len > MAX_USERNAME_LEN
            || !self.patterns.valid_name.is_match(attempt.username)
        {
            return Err(ProtocolError::InvalidField(format!(
                "{}: {:?}",
                constants::ERR_INVALID_USERNAME,
                attempt.username
            )));
        }

        let guard = match self.verifying.entry(attempt.addr) {
            Entry::Occupied(_) => return Ok(self.reject(attempt, Rejection::AlreadyVerifying)),
            Entry::Vacant(slot) => {
                slot.insert(());
                VerifyingGuard {
                    addr: attempt.addr,
                    verifying: self.verifying.clone(),
                }
            }
        };

        // Ahead of the verified bypass: a remembered name must not shield an address that keeps failing
        if self
            .blacklist
            .is_blacklisted(attempt.addr, verification.blacklist_threshold)
        {
            return Ok(self.reject(attempt, Rejection::Blacklisted));
        }

        // The attack flag is read once here and travels with the session
        let under_attack = self.attack.is_under_attack();
        if !verification.enabled
            || verification.whitelisted_protocols.contains(&protocol)
            || (!under_attack && self.verified.contains(attempt.fingerprint))
        {
            debug!(peer = %attempt.addr, user = attempt.username, "Bypassing verification");
            self.stats.pass_through();
            return Ok(LoginDecision::PassThrough);
        }

        if !self.ratelimiter.attempt(attempt.addr) {
            return Ok(self.reject(attempt, Rejection::Ratelimited));
        }

        let (admit, admitted) = oneshot::channel();
        let queued = self.queue.enqueue(
            attempt.addr,
            attempt.fingerprint,
            Box::new(move || {
                // The receiver is gone when the client left while queued
                let _ = admit.send(());
            }),
        )?;
        if !queued {
            return Ok(self.reject(attempt, Rejection::AlreadyQueued));
        }

        if self.should_log() {
            info!(
                peer = %attempt.addr,
                user = attempt.username,
                version = %attempt.version,
                "Queued for verification"
            );
        }
        Ok(LoginDecision::Queued(QueueTicket {
            admitted,
            under_attack,
            guard,
        }))
    }

    fn reject(&self, attempt: &LoginAttempt<'_>, rejection: Rejection) -> LoginDecision {
        self.stats.policy_rejection();
        debug!(peer = %attempt.addr, user = attempt.username, reason = %rejection, "Login refused");
        LoginDecision::Reject(rejection)
    }

    /// Release up to `max_polls` queued sessions.
    pub fn poll_queue(&self) -> Result<usize> {
        let admitted = self.queue.poll(self.config.queue.max_polls)?;
        if admitted > 0 {
            self.stats.queue_admitted(admitted as u64);
        }
        Ok(admitted)
    }

    /// Record a verification that reached the end of the state machine.
    pub fn record_success(&self, fingerprint: &str) {
        self.stats.verification_passed();
        self.verified.insert(fingerprint);
    }

    /// Record a failed verification; returns the new blacklist score when penalized.
    pub fn record_failure(&self, addr: IpAddr, error: &ProtocolError) -> Option<u32> {
        self.stats.verification_failed();
        if !error.class().penalizes() {
            return None;
        }
        self.stats.blacklist_strike();
        Some(self.blacklist.increment(addr))
    }

    /// Drop expired cache records.
    pub fn sweep(&self) {
        self.ratelimiter.sweep();
        self.blacklist.sweep();
        self.verified.sweep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::attack::LoadSample;
    use crate::admission::verified::MemoryVerifiedStore;
    use std::net::Ipv4Addr;

    const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 4));

    fn controller_with(mutator: impl FnOnce(&mut VerifierConfig)) -> AdmissionController {
        let config = VerifierConfig::default_with_overrides(mutator);
        AdmissionController::new(
            Arc::new(config),
            Arc::new(MemoryVerifiedStore::new()),
            Arc::new(Statistics::new()),
        )
        .unwrap()
    }

    fn attempt(username: &str) -> LoginAttempt<'_> {
        LoginAttempt {
            addr: ADDR,
            version: ProtocolVersion::V1_20_5,
            username,
            fingerprint: "fp",
        }
    }

    #[test]
    fn test_first_login_is_queued() {
        let controller = controller_with(|_| {});
        let decision = controller.check_login(&attempt("Steve")).unwrap();
        assert!(matches!(decision, LoginDecision::Queued(_)));
        assert_eq!(controller.queue.len(), 1);
        assert_eq!(controller.verifying_count(), 1);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let controller = controller_with(|_| {});
        let mut login = attempt("Steve");
        login.version = ProtocolVersion::Unknown;
        let decision = controller.check_login(&login).unwrap();
        assert!(matches!(decision, LoginDecision::Reject(Rejection::UnsupportedVersion)));
    }

    #[test]
    fn test_invalid_username_is_a_violation() {
        let controller = controller_with(|_| {});
        assert!(controller.check_login(&attempt("way_too_long_username")).is_err());
        assert!(controller.check_login(&attempt("bad name")).is_err());
        assert!(controller.check_login(&attempt("")).is_err());
    }

    #[test]
    fn test_one_session_per_address() {
        let controller = controller_with(|_| {});
        let first = controller.check_login(&attempt("Steve")).unwrap();
        let second = controller.check_login(&attempt("Alex")).unwrap();
        assert!(matches!(second, LoginDecision::Reject(Rejection::AlreadyVerifying)));
        drop(first);
        assert_eq!(controller.verifying_count(), 0);
    }

    #[test]
    fn test_blacklisted_address_rejected() {
        let controller = controller_with(|config| config.verification.blacklist_threshold = 1);
        controller.record_failure(ADDR, &ProtocolError::IdleTimeout);
        let decision = controller.check_login(&attempt("Steve")).unwrap();
        assert!(matches!(decision, LoginDecision::Reject(Rejection::Blacklisted)));
    }

    #[test]
    fn test_transport_failure_not_penalized() {
        let controller = controller_with(|_| {});
        assert_eq!(controller.record_failure(ADDR, &ProtocolError::ConnectionClosed), None);
        assert_eq!(controller.blacklist.score(ADDR), 0);
    }

    #[test]
    fn test_verified_fingerprint_bypasses() {
        let controller = controller_with(|_| {});
        controller.record_success("fp");
        let decision = controller.check_login(&attempt("Steve")).unwrap();
        assert!(matches!(decision, LoginDecision::PassThrough));
        assert!(controller.queue.is_empty());
    }

    #[test]
    fn test_verified_fingerprint_reverified_during_attack() {
        let controller = controller_with(|_| {});
        let busy = LoadSample {
            logins_per_second: controller.config().attack.min_players_for_attack + 1,
            verifying: 0,
            queued: 0,
        };
        controller.attack.sample_at(busy, std::time::Instant::now()).unwrap();
        assert!(controller.attack.is_under_attack());
        controller.record_success("fp");

        let LoginDecision::Queued(ticket) = controller.check_login(&attempt("Steve")).unwrap() else {
            panic!("a remembered player must verify again during an attack");
        };
        assert!(ticket.under_attack);
        assert!(controller.captcha_required(ticket.under_attack));
        assert_eq!(controller.queue.len(), 1);
    }

    #[test]
    fn test_whitelisted_protocol_bypasses() {
        let controller = controller_with(|config| {
            config.verification.whitelisted_protocols = vec![ProtocolVersion::V1_20_5.id()];
        });
        let decision = controller.check_login(&attempt("Steve")).unwrap();
        assert!(matches!(decision, LoginDecision::PassThrough));
    }

    #[test]
    fn test_reconnect_too_fast() {
        let controller = controller_with(|_| {});
        let first = controller.check_login(&attempt("Steve")).unwrap();
        drop(first);
        controller.queue.cancel(ADDR);
        let second = controller.check_login(&attempt("Steve")).unwrap();
        assert!(matches!(second, LoginDecision::Reject(Rejection::Ratelimited)));
    }

    #[tokio::test]
    async fn test_poll_releases_ticket() {
        let controller = controller_with(|_| {});
        let LoginDecision::Queued(ticket) = controller.check_login(&attempt("Steve")).unwrap() else {
            panic!("expected a queue ticket");
        };
        assert_eq!(controller.poll_queue().unwrap(), 1);
        ticket.admitted.await.unwrap();
        assert!(!ticket.under_attack);
    }
}
