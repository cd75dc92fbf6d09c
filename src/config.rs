//! # Configuration Management
//!
//! Centralized configuration for the verification engine.
//!
//! Every section derives serde and carries a `Default` tuned for a public
//! server plus a `validate()` returning human-readable problems.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides (`FALLBACK_VERIFIER_*`) via `from_env()`
//!
//! ## Sections
//! - `server`: listen address, connection cap, optional transfer target
//! - `verification`: timeouts, penalties, client sanity checks
//! - `queue`: admission batch size and tick
//! - `attack`: thresholds for under-attack mode
//! - `captcha`: map captcha generation and answering
//! - `logging`: subscriber setup

use crate::error::{ProtocolError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default answer alphabet. Glyphs that are easy to confuse are left out.
pub const DEFAULT_ALPHABET: &str = "abcdefhjkmnoprstuxyz";

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct VerifierConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub verification: VerificationConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub attack: AttackConfig,

    #[serde(default)]
    pub captcha: CaptchaConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VerifierConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("FALLBACK_VERIFIER_SERVER_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(max) = std::env::var("FALLBACK_VERIFIER_MAX_CONNECTIONS") {
            if let Ok(val) = max.parse::<usize>() {
                config.server.max_connections = val;
            }
        }

        if let Ok(timeout) = std::env::var("FALLBACK_VERIFIER_READ_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.verification.read_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(enabled) = std::env::var("FALLBACK_VERIFIER_CAPTCHA_ENABLED") {
            if let Ok(val) = enabled.parse::<bool>() {
                config.captcha.enabled = val;
            }
        }

        if let Ok(level) = std::env::var("FALLBACK_VERIFIER_LOG_LEVEL") {
            config.logging.log_level = level
                .parse::<Level>()
                .map_err(|_| ProtocolError::ConfigError(format!("Invalid log level: {level}")))?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.verification.validate());
        errors.extend(self.queue.validate());
        errors.extend(self.attack.validate());
        errors.extend(self.captcha.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Where verified 1.20.5+ clients are sent instead of being disconnected
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TransferTarget {
    pub host: String,
    pub port: u16,
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:25565")
    pub address: String,

    /// Maximum number of concurrent connections
    pub max_connections: usize,

    /// Timeout for graceful server shutdown
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,

    #[serde(default)]
    pub transfer: Option<TransferTarget>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("0.0.0.0:25565"),
            max_connections: 10_000,
            shutdown_timeout: Duration::from_secs(10),
            transfer: None,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:25565')",
                self.address
            ));
        }

        if self.max_connections == 0 {
            errors.push("Max connections must be greater than 0".to_string());
        }

        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        if let Some(transfer) = &self.transfer {
            if transfer.host.is_empty() {
                errors.push("Transfer host cannot be empty".to_string());
            }
            if transfer.port == 0 {
                errors.push("Transfer port must be greater than 0".to_string());
            }
        }

        errors
    }
}

/// Client brand check
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrandCheck {
    pub enabled: bool,
    pub valid_regex: String,
    pub max_length: usize,
}

impl Default for BrandCheck {
    fn default() -> Self {
        Self {
            enabled: true,
            valid_regex: String::from(r"^[!-~ ]+$"),
            max_length: 64,
        }
    }
}

/// Teleport echo, gravity and platform collision checks
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MovementCheck {
    /// Teleport confirmation and position echo
    pub enabled: bool,
    /// Falling must follow vanilla gravity
    pub gravity: bool,
    /// The client must land on the platform block
    pub collisions: bool,
    /// Ticks of falling checked before the landing
    pub max_movement_ticks: u32,
    /// A failed fall is answered with a captcha instead of a kick
    pub captcha_on_fail: bool,
}

impl Default for MovementCheck {
    fn default() -> Self {
        Self {
            enabled: true,
            gravity: true,
            collisions: true,
            max_movement_ticks: 8,
            captcha_on_fail: false,
        }
    }
}

/// Transaction, held item and arm swing round trips
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InteractionCheck {
    pub enabled: bool,
}

impl Default for InteractionCheck {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Boat and minecart riding check
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VehicleCheck {
    pub enabled: bool,
    /// Inputs, rotations, paddles and vehicle moves needed per vehicle
    pub minimum_packets: u32,
}

impl Default for VehicleCheck {
    fn default() -> Self {
        Self {
            enabled: true,
            minimum_packets: 5,
        }
    }
}

/// Verification policy and session limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationConfig {
    /// When false every login is passed through untouched
    pub enabled: bool,

    /// Longest silence tolerated between two packets
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,

    /// Longest time a single write may take
    #[serde(with = "duration_serde")]
    pub write_timeout: Duration,

    /// Deadline for each stage, measured from stage entry
    #[serde(with = "duration_serde")]
    pub stage_timeout: Duration,

    /// Cooldown between two verification attempts from one address
    #[serde(with = "duration_serde")]
    pub reconnect_delay: Duration,

    /// How long a verified fingerprint skips verification
    #[serde(with = "duration_serde")]
    pub remember_time: Duration,

    /// How long a blacklist score is kept
    #[serde(with = "duration_serde")]
    pub blacklist_time: Duration,

    /// Failures before an address is refused outright
    pub blacklist_threshold: u32,

    /// Packets a session may send before it is considered a flood
    pub max_login_packets: u32,

    pub valid_name_regex: String,
    pub valid_locale_regex: String,

    /// Protocol ids that always bypass verification
    #[serde(default)]
    pub whitelisted_protocols: Vec<i32>,

    /// Protocol ids that are always refused
    #[serde(default)]
    pub blacklisted_protocols: Vec<i32>,

    /// Gamemode shown while verifying (0 survival .. 3 spectator)
    pub gamemode: u8,

    /// Fixed time of day in ticks
    pub time_of_day: i64,

    pub log_connections: bool,
    pub log_during_attack: bool,

    #[serde(default)]
    pub brand: BrandCheck,

    #[serde(default)]
    pub movement: MovementCheck,

    #[serde(default)]
    pub interaction: InteractionCheck,

    #[serde(default)]
    pub vehicle: VehicleCheck,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            read_timeout: Duration::from_secs(8),
            write_timeout: Duration::from_secs(10),
            stage_timeout: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(8),
            remember_time: Duration::from_secs(120),
            blacklist_time: Duration::from_secs(600),
            blacklist_threshold: 2,
            max_login_packets: 256,
            valid_name_regex: String::from(r"^[a-zA-Z0-9_]+$"),
            valid_locale_regex: String::from(r"^[a-zA-Z_]+$"),
            whitelisted_protocols: Vec::new(),
            blacklisted_protocols: Vec::new(),
            gamemode: 2,
            time_of_day: 1000,
            log_connections: true,
            log_during_attack: false,
            brand: BrandCheck::default(),
            movement: MovementCheck::default(),
            interaction: InteractionCheck::default(),
            vehicle: VehicleCheck::default(),
        }
    }
}

/// Regex settings compiled once at engine start
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    pub valid_name: Regex,
    pub valid_locale: Regex,
    pub valid_brand: Regex,
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ProtocolError::ConfigError(format!("Invalid {name} '{pattern}': {e}")))
}

impl VerificationConfig {
    pub fn compile_patterns(&self) -> Result<CompiledPatterns> {
        Ok(CompiledPatterns {
            valid_name: compile("valid_name_regex", &self.valid_name_regex)?,
            valid_locale: compile("valid_locale_regex", &self.valid_locale_regex)?,
            valid_brand: compile("brand.valid_regex", &self.brand.valid_regex)?,
        })
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, timeout) in [
            ("Read timeout", self.read_timeout),
            ("Write timeout", self.write_timeout),
        ] {
            if timeout.as_millis() < 1000 {
                errors.push(format!("{name} too short (minimum: 1s)"));
            } else if timeout.as_secs() > 30 {
                errors.push(format!("{name} too long (maximum: 30s)"));
            }
        }

        if self.stage_timeout < self.read_timeout {
            errors.push("Stage timeout cannot be shorter than the read timeout".to_string());
        }

        if self.reconnect_delay.as_secs() > 100 {
            errors.push("Reconnect delay too long (maximum: 100s)".to_string());
        }

        if self.remember_time.as_secs() > 86_400 {
            errors.push("Remember time too long (maximum: 24h)".to_string());
        }

        if self.blacklist_time.as_secs() > 86_400 {
            errors.push("Blacklist time too long (maximum: 24h)".to_string());
        }

        if self.blacklist_threshold > 100 {
            errors.push(format!(
                "Blacklist threshold too large: {} (maximum: 100)",
                self.blacklist_threshold
            ));
        }

        if self.max_login_packets < 32 {
            errors.push("Max login packets too small (minimum: 32)".to_string());
        }

        if self.brand.max_length < 2 {
            errors.push("Brand max length must allow at least 2 bytes".to_string());
        }

        if !(2..=100).contains(&self.movement.max_movement_ticks) {
            errors.push(format!(
                "Max movement ticks out of range: {} (valid range: 2-100)",
                self.movement.max_movement_ticks
            ));
        }

        if self.vehicle.minimum_packets > 20 {
            errors.push(format!(
                "Vehicle minimum packets too large: {} (maximum: 20)",
                self.vehicle.minimum_packets
            ));
        }

        if self.gamemode > 3 {
            errors.push(format!("Invalid gamemode: {} (valid range: 0-3)", self.gamemode));
        }

        if !(0..=24_000).contains(&self.time_of_day) {
            errors.push(format!("Invalid time of day: {} (valid range: 0-24000)", self.time_of_day));
        }

        if let Err(e) = self.compile_patterns() {
            errors.push(e.to_string());
        }

        errors
    }
}

/// Admission queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Sessions admitted per tick
    pub max_polls: usize,

    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_polls: 30,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_polls == 0 {
            errors.push("Queue max polls must be greater than 0".to_string());
        } else if self.max_polls > 1000 {
            errors.push(format!("Queue max polls too large: {} (maximum: 1000)", self.max_polls));
        }

        if self.poll_interval.as_millis() < 50 {
            errors.push("Queue poll interval too short (minimum: 50ms)".to_string());
        }

        errors
    }
}

/// Attack tracker thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttackConfig {
    /// Load above which the engine considers itself under attack
    pub min_players_for_attack: u64,

    /// An attack lasts at least this long once detected
    #[serde(with = "duration_serde")]
    pub min_attack_duration: Duration,

    /// Load must stay under the threshold this long before the attack ends
    #[serde(with = "duration_serde")]
    pub attack_cooldown_delay: Duration,

    #[serde(with = "duration_serde")]
    pub sample_interval: Duration,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            min_players_for_attack: 8,
            min_attack_duration: Duration::from_secs(30),
            attack_cooldown_delay: Duration::from_secs(3),
            sample_interval: Duration::from_millis(250),
        }
    }
}

impl AttackConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(2..=1024).contains(&self.min_players_for_attack) {
            errors.push(format!(
                "Min players for attack out of range: {} (valid range: 2-1024)",
                self.min_players_for_attack
            ));
        }

        if self.min_attack_duration.as_millis() < 1000 {
            errors.push("Min attack duration too short (minimum: 1s)".to_string());
        } else if self.min_attack_duration.as_secs() > 900 {
            errors.push("Min attack duration too long (maximum: 15m)".to_string());
        }

        if self.attack_cooldown_delay.as_millis() < 100 {
            errors.push("Attack cooldown delay too short (minimum: 100ms)".to_string());
        } else if self.attack_cooldown_delay.as_secs() > 30 {
            errors.push("Attack cooldown delay too long (maximum: 30s)".to_string());
        }

        if self.sample_interval.as_millis() < 10 {
            errors.push("Attack sample interval too short (minimum: 10ms)".to_string());
        }

        errors
    }
}

/// Map captcha configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptchaConfig {
    pub enabled: bool,

    /// Only show the captcha while under attack
    pub during_attack_only: bool,

    /// Challenges rendered ahead of time
    pub precompute_amount: usize,

    #[serde(with = "duration_serde")]
    pub max_duration: Duration,

    pub max_tries: u32,
    pub alphabet: String,
    pub answer_length: usize,
    pub case_sensitive: bool,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            during_attack_only: true,
            precompute_amount: 500,
            max_duration: Duration::from_secs(45),
            max_tries: 3,
            alphabet: String::from(DEFAULT_ALPHABET),
            answer_length: 5,
            case_sensitive: false,
        }
    }
}

impl CaptchaConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(10..=5000).contains(&self.precompute_amount) {
            errors.push(format!(
                "Captcha precompute amount out of range: {} (valid range: 10-5000)",
                self.precompute_amount
            ));
        }

        if self.max_duration.as_millis() < 5000 {
            errors.push("Captcha max duration too short (minimum: 5s)".to_string());
        } else if self.max_duration.as_secs() > 360 {
            errors.push("Captcha max duration too long (maximum: 6m)".to_string());
        }

        if !(1..=100).contains(&self.max_tries) {
            errors.push(format!("Captcha max tries out of range: {} (valid range: 1-100)", self.max_tries));
        }

        if self.alphabet.chars().count() < 2 {
            errors.push("Captcha alphabet needs at least 2 characters".to_string());
        } else if !self.alphabet.chars().all(|c| crate::captcha::font::glyph(c).is_some()) {
            errors.push("Captcha alphabet may only contain lowercase ASCII letters and digits".to_string());
        }

        if !(1..=8).contains(&self.answer_length) {
            errors.push(format!(
                "Captcha answer length out of range: {} (valid range: 1-8)",
                self.answer_length
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,

    /// Log a statistics snapshot at this interval (0 disables)
    #[serde(with = "duration_serde")]
    pub metrics_interval: Duration,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("fallback-verifier"),
            log_level: Level::INFO,
            json_format: false,
            metrics_interval: Duration::from_secs(60),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if !self.metrics_interval.is_zero() && self.metrics_interval.as_secs() < 1 {
            errors.push("Metrics interval too short (minimum: 1s)".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(VerifierConfig::default().validate().is_empty());
    }

    #[test]
    fn test_toml_roundtrip() {
        let text = VerifierConfig::example_config();
        let parsed = VerifierConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.verification.read_timeout, Duration::from_secs(8));
        assert_eq!(parsed.logging.log_level, Level::INFO);
    }

    #[test]
    fn test_bad_regex_is_reported() {
        let config = VerifierConfig::default_with_overrides(|c| {
            c.verification.valid_name_regex = "([".into();
        });
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("valid_name_regex"));
        assert!(config.validate_strict().is_err());
    }
}
