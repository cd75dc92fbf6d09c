//! # Admission
//!
//! Shared, thread-safe state consulted before and after a verification.
//!
//! - [`ratelimiter`]: reconnect cooldown per address
//! - [`blacklist`]: failure scores per address
//! - [`verified`]: remembered fingerprints and the durable store boundary
//! - [`queue`]: FIFO admission drained on a tick
//! - [`attack`]: under-attack detection
//! - [`controller`]: the login policy over all of the above
//!
//! Expired records are dropped lazily on read and reclaimed by a sweep tick.

pub mod attack;
pub mod blacklist;
pub mod controller;
pub mod queue;
pub mod ratelimiter;
pub mod verified;

pub use attack::{AttackSummary, AttackTracker, AttackTransition, LoadSample};
pub use blacklist::Blacklist;
pub use controller::{AdmissionController, LoginAttempt, LoginDecision, QueueTicket, VerifyingGuard};
pub use queue::AdmissionQueue;
pub use ratelimiter::Ratelimiter;
pub use verified::{MemoryVerifiedStore, VerifiedCache, VerifiedStore};
