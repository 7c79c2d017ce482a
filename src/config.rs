use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::application::scheduler::DEFAULT_LEASE_SECS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub lease_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", "port number", 8080u16)?;
        let enabled = parse_or(&lookup, "SCHEDULER_ENABLED", "boolean", true)?;
        let interval_secs = parse_or(&lookup, "SCHEDULER_INTERVAL_SECS", "number of seconds", 300u64)?;
        let lease_secs = parse_or(
            &lookup,
            "SCHEDULER_LEASE_SECS",
            "number of seconds",
            DEFAULT_LEASE_SECS,
        )?;

        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "SCHEDULER_INTERVAL_SECS",
                expected: "positive number of seconds",
                value: interval_secs.to_string(),
            });
        }

        Ok(Self {
            database_url,
            host,
            port,
            scheduler: SchedulerConfig {
                enabled,
                interval: Duration::from_secs(interval_secs),
                lease_secs,
            },
        })
    }
}

fn parse_or<F, T>(
    lookup: &F,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
    }
}
