use std::env;
use std::str::FromStr;

use crate::cli::Cli;
use crate::lifecycle::config::{
    DEFAULT_EXPIRING_WINDOW_DAYS, DEFAULT_LOW_USABILITY_THRESHOLD, MAX_EXPIRING_WINDOW_DAYS,
};
use crate::lifecycle::LifecycleConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_AUDIT_INTERVAL_SECONDS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub low_usability_threshold: f64,
    pub expiring_window_days: i64,
    pub audit_interval_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Environment first, then any flags given on the command line.
    pub fn load(cli: &Cli) -> Result<Self, String> {
        let mut config = Self::from_lookup(|key| match key {
            "DATABASE_URL" => cli.database_url.clone().or_else(|| env::var(key).ok()),
            _ => env::var(key).ok(),
        })?;

        if let Some(bind_addr) = &cli.bind_addr {
            config.bind_addr = bind_addr.clone();
        }
        if let Some(threshold) = cli.low_usability_threshold {
            config.low_usability_threshold = threshold;
        }
        if let Some(days) = cli.expiring_window_days {
            config.expiring_window_days = days;
        }
        if let Some(seconds) = cli.audit_interval {
            config.audit_interval_seconds = seconds;
        }

        config.validate()?;
        Ok(config)
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or("DATABASE_URL is required")?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let low_usability_threshold = parse_or(
            &lookup,
            "LOW_USABILITY_THRESHOLD",
            DEFAULT_LOW_USABILITY_THRESHOLD,
        )?;
        let expiring_window_days =
            parse_or(&lookup, "EXPIRING_WINDOW_DAYS", DEFAULT_EXPIRING_WINDOW_DAYS)?;
        let audit_interval_seconds = parse_or(
            &lookup,
            "AUDIT_INTERVAL_SECONDS",
            DEFAULT_AUDIT_INTERVAL_SECONDS,
        )?;

        let config = Self {
            database_url,
            bind_addr,
            low_usability_threshold,
            expiring_window_days,
            audit_interval_seconds,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.low_usability_threshold) {
            return Err(format!(
                "LOW_USABILITY_THRESHOLD must be between 0 and 100, got {}",
                self.low_usability_threshold
            ));
        }
        if self.expiring_window_days < 0 {
            return Err("EXPIRING_WINDOW_DAYS must not be negative".to_string());
        }
        if self.expiring_window_days > MAX_EXPIRING_WINDOW_DAYS {
            return Err(format!(
                "EXPIRING_WINDOW_DAYS must be at most {}, got {}",
                MAX_EXPIRING_WINDOW_DAYS, self.expiring_window_days
            ));
        }
        if self.audit_interval_seconds == 0 {
            return Err("AUDIT_INTERVAL_SECONDS must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            low_usability_threshold: self.low_usability_threshold,
            expiring_window_days: self.expiring_window_days,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn database_url_is_required() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, "DATABASE_URL is required");
    }

    #[test]
    fn optional_settings_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "sqlite::memory:")])).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.low_usability_threshold, 80.0);
        assert_eq!(config.expiring_window_days, 30);
        assert_eq!(config.audit_interval_seconds, 300);
    }

    #[test]
    fn settings_are_parsed_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite://tools.db"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("LOW_USABILITY_THRESHOLD", "75.5"),
            ("EXPIRING_WINDOW_DAYS", "14"),
            ("AUDIT_INTERVAL_SECONDS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.low_usability_threshold, 75.5);
        assert_eq!(config.expiring_window_days, 14);
        assert_eq!(config.audit_interval_seconds, 60);
    }

    #[test]
    fn malformed_number_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("EXPIRING_WINDOW_DAYS", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(err, "EXPIRING_WINDOW_DAYS must be a valid number");
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("LOW_USABILITY_THRESHOLD", "120"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn oversized_expiring_window_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("EXPIRING_WINDOW_DAYS", "9223372036854775807"),
        ]))
        .unwrap_err();
        assert!(err.starts_with("EXPIRING_WINDOW_DAYS must be at most 36500"));

        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("EXPIRING_WINDOW_DAYS", "36500"),
        ]))
        .unwrap();
        assert_eq!(config.expiring_window_days, 36_500);
    }

    #[test]
    fn zero_audit_interval_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("AUDIT_INTERVAL_SECONDS", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn lifecycle_config_carries_thresholds() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("LOW_USABILITY_THRESHOLD", "70"),
            ("EXPIRING_WINDOW_DAYS", "14"),
        ]))
        .unwrap();
        let lifecycle = config.lifecycle();
        assert_eq!(lifecycle.low_usability_threshold, 70.0);
        assert_eq!(lifecycle.expiring_window_days, 14);
    }
}
