//! # Error Types
//!
//! Error handling for the verification engine.
//!
//! Every failure a session can run into is a [`ProtocolError`]. Errors never
//! escape a connection: the driver turns them into a per-connection outcome and
//! decides from the error's [`FailureClass`] whether the remote address is
//! penalized.
//!
//! ## Failure Classes
//! - **Protocol violations**: unexpected packet id, malformed or oversized field, bad varint
//! - **Timeouts**: stage deadline or idle timeout exceeded
//! - **Policy rejections**: blacklisted, ratelimited, queued twice, unsupported version
//! - **Challenge failures**: wrong captcha answer, challenge expired
//! - **Transport**: peer went away mid-session (benign, never penalized)
//!
//! ## Example Usage
//! ```rust
//! use fallback_verifier::error::{FailureClass, ProtocolError, Result};
//!
//! fn check_length(len: i32, cap: usize) -> Result<usize> {
//!     if len < 0 || len as usize > cap {
//!         return Err(ProtocolError::InvalidLength(len as i64));
//!     }
//!     Ok(len as usize)
//! }
//!
//! let err = check_length(-1, 16).unwrap_err();
//! assert_eq!(err.class(), FailureClass::ProtocolViolation);
//! assert!(err.class().penalizes());
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Framing errors
    pub const ERR_VARINT_TOO_BIG: &str = "VarInt exceeds maximum length";
    pub const ERR_VARINT_INCOMPLETE: &str = "VarInt is incomplete";
    pub const ERR_FRAME_TOO_BIG: &str = "Frame length exceeds 21 bits";

    /// Decode errors
    pub const ERR_UNEXPECTED_EOF: &str = "Packet ended before all required fields were read";
    pub const ERR_STRING_TOO_LONG: &str = "String exceeds its length cap";
    pub const ERR_INVALID_UTF8: &str = "String is not valid UTF-8";

    /// Session errors
    pub const ERR_DUPLICATE_CLIENT_INFO: &str = "Duplicate client information";
    pub const ERR_DUPLICATE_BRAND: &str = "Duplicate client brand";
    pub const ERR_CLIENT_INFO_TOO_BIG: &str = "Client information exceeds 256 bytes";
    pub const ERR_TOO_MANY_PACKETS: &str = "Too many packets during verification";
    pub const ERR_INVALID_USERNAME: &str = "Invalid username";
    pub const ERR_EMPTY_HOSTNAME: &str = "Hostname is empty";

    /// Policy rejections
    pub const ERR_BLACKLISTED: &str = "Address is blacklisted";
    pub const ERR_RATELIMITED: &str = "Reconnected too fast";
    pub const ERR_ALREADY_QUEUED: &str = "Address is already queued";
    pub const ERR_ALREADY_VERIFYING: &str = "Address is already verifying";
    pub const ERR_PROTOCOL_BLACKLISTED: &str = "Protocol version is blacklisted";
    pub const ERR_CAPTCHA_PREPARING: &str = "Captcha pool is still being prepared";

    /// Challenge errors
    pub const ERR_WRONG_ANSWER: &str = "Captcha answer was wrong too many times";
    pub const ERR_CHALLENGE_EXPIRED: &str = "Captcha was not solved in time";

    /// Synchronization
    pub const ERR_LOCK_POISONED: &str = "Synchronization primitive poisoned";
}

/// How a failure is treated by the admission layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureClass {
    ProtocolViolation,
    Timeout,
    PolicyRejection,
    ChallengeFailure,
    Transport,
}

impl FailureClass {
    /// Whether the remote address earns a blacklist strike for this failure.
    pub fn penalizes(self) -> bool {
        matches!(
            self,
            FailureClass::ProtocolViolation | FailureClass::Timeout | FailureClass::ChallengeFailure
        )
    }
}

/// Reasons an address is refused before the state machine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    UnsupportedVersion,
    ProtocolBlacklisted,
    AlreadyVerifying,
    Blacklisted,
    Ratelimited,
    AlreadyQueued,
    CaptchaPreparing,
    QueueTimeout,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::UnsupportedVersion => "unsupported protocol version",
            Rejection::ProtocolBlacklisted => constants::ERR_PROTOCOL_BLACKLISTED,
            Rejection::AlreadyVerifying => constants::ERR_ALREADY_VERIFYING,
            Rejection::Blacklisted => constants::ERR_BLACKLISTED,
            Rejection::Ratelimited => constants::ERR_RATELIMITED,
            Rejection::AlreadyQueued => constants::ERR_ALREADY_QUEUED,
            Rejection::CaptchaPreparing => constants::ERR_CAPTCHA_PREPARING,
            Rejection::QueueTimeout => "timed out while queued",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ProtocolError is the primary error type for all engine operations.
// Only Serialize is derived: several variants carry borrowed static messages.
#[derive(Error, Debug, Serialize)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing)]
    Io(#[from] io::Error),

    #[error("Corrupt frame: {0}")]
    CorruptFrame(&'static str),

    #[error("Frame too large: {0} bytes")]
    OversizedFrame(usize),

    #[error("Malformed packet: {0}")]
    Malformed(&'static str),

    #[error("Invalid length: {0}")]
    InvalidLength(i64),

    #[error("Field out of range: {0}")]
    InvalidField(String),

    #[error("Unexpected packet 0x{id:02X} in {state}")]
    UnexpectedPacket { id: i32, state: &'static str },

    #[error("Protocol order violation: {0}")]
    OrderViolation(String),

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(i32),

    #[error("Stage timed out: {0}")]
    StageTimeout(&'static str),

    #[error("Connection timed out (no activity)")]
    IdleTimeout,

    #[error("Rejected: {0}")]
    Rejected(Rejection),

    #[error("Challenge failed: {0}")]
    ChallengeFailed(&'static str),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// Classify this error for the admission layer.
    pub fn class(&self) -> FailureClass {
        match self {
            ProtocolError::Io(_) | ProtocolError::ConnectionClosed => FailureClass::Transport,
            ProtocolError::StageTimeout(_) | ProtocolError::IdleTimeout => FailureClass::Timeout,
            ProtocolError::Rejected(_) => FailureClass::PolicyRejection,
            ProtocolError::ChallengeFailed(_) => FailureClass::ChallengeFailure,
            // Configuration and encoding problems are ours, not the peer's
            ProtocolError::ConfigError(_)
            | ProtocolError::EncodeError(_)
            | ProtocolError::Custom(_) => FailureClass::Transport,
            _ => FailureClass::ProtocolViolation,
        }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            ProtocolError::CorruptFrame(constants::ERR_VARINT_TOO_BIG).class(),
            FailureClass::ProtocolViolation
        );
        assert_eq!(ProtocolError::IdleTimeout.class(), FailureClass::Timeout);
        assert_eq!(
            ProtocolError::Rejected(Rejection::Blacklisted).class(),
            FailureClass::PolicyRejection
        );
        assert_eq!(
            ProtocolError::ChallengeFailed(constants::ERR_WRONG_ANSWER).class(),
            FailureClass::ChallengeFailure
        );
        assert_eq!(ProtocolError::ConnectionClosed.class(), FailureClass::Transport);
    }

    #[test]
    fn test_transport_and_policy_are_not_penalized() {
        assert!(!FailureClass::Transport.penalizes());
        assert!(!FailureClass::PolicyRejection.penalizes());
        assert!(FailureClass::Timeout.penalizes());
        assert!(FailureClass::ChallengeFailure.penalizes());
    }
}
