use std::str::FromStr;

use chrono::FixedOffset;
use serde::Deserialize;

/// Reference timezone offset for the scheduler. America/Sao_Paulo has not
/// observed DST since 2019, so a fixed UTC-03:00 offset is exact.
const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Local hour (0-23) at which the daily recurring-transaction run fires
    pub scheduler_hour: u32,
    /// Local minute (0-59) of the daily run
    pub scheduler_minute: u32,
    pub utc_offset_hours: i32,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/finance".to_string()),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            scheduler_hour: env_or("SCHEDULER_HOUR", 2)?,
            scheduler_minute: env_or("SCHEDULER_MINUTE", 5)?,
            utc_offset_hours: env_or("UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?,
        };

        if config.scheduler_hour > 23 {
            return Err(config::ConfigError::Message(format!(
                "SCHEDULER_HOUR must be 0-23, got {}",
                config.scheduler_hour
            )));
        }
        if config.scheduler_minute > 59 {
            return Err(config::ConfigError::Message(format!(
                "SCHEDULER_MINUTE must be 0-59, got {}",
                config.scheduler_minute
            )));
        }
        if !(-12..=14).contains(&config.utc_offset_hours) {
            return Err(config::ConfigError::Message(format!(
                "UTC_OFFSET_HOURS must be -12..14, got {}",
                config.utc_offset_hours
            )));
        }

        Ok(config)
    }

    /// Fixed offset of the reference timezone. Range-checked in `from_env`.
    pub fn reference_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap()
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, config::ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| {
            config::ConfigError::Message(format!("invalid value for {}: {}", name, raw))
        }),
        Err(_) => Ok(default),
    }
}
