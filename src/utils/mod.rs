//! # Utility Modules
//!
//! - **Logging**: subscriber installation from [`LoggingConfig`](crate::config::LoggingConfig)
//! - **Metrics**: atomic verification counters and the per-second login window

pub mod logging;
pub mod metrics;

pub use metrics::{Statistics, StatisticsSnapshot};
