//! Thresholds for the lifecycle engine

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Usability below this percentage raises a critical alert.
pub const DEFAULT_LOW_USABILITY_THRESHOLD: f64 = 80.0;

/// Tools expiring within this many days are flagged as expiring soon.
pub const DEFAULT_EXPIRING_WINDOW_DAYS: i64 = 30;

/// Largest warning window accepted, roughly a century.
pub const MAX_EXPIRING_WINDOW_DAYS: i64 = 36_500;

/// Validity assumed by backfill tooling for legacy records.
pub const DEFAULT_BACKFILL_VALIDITY_YEARS: u32 = 3;

/// Configuration for the lifecycle engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    pub low_usability_threshold: f64,
    pub expiring_window_days: i64,
}

impl LifecycleConfig {
    /// The warning window, clamped to `0..=MAX_EXPIRING_WINDOW_DAYS`.
    pub fn expiring_window(&self) -> Duration {
        Duration::days(self.expiring_window_days.clamp(0, MAX_EXPIRING_WINDOW_DAYS))
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            low_usability_threshold: DEFAULT_LOW_USABILITY_THRESHOLD,
            expiring_window_days: DEFAULT_EXPIRING_WINDOW_DAYS,
        }
    }
}
