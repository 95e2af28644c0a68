//! Environment-driven configuration, read once at start-up.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use partforge_observability::LogFormat;

use crate::store::DEFAULT_MAX_TRANSACTION_ITEMS;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_ALERTS_CHANNEL: &str = "low-stock-alerts";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres URL; in-memory stores are used when absent.
    pub database_url: Option<String>,
    pub max_transaction_items: usize,
    /// `None` disables the periodic scan runner.
    pub scan_interval: Option<Duration>,
    /// Redis URL for alert delivery; alerts are logged when absent.
    pub redis_url: Option<String>,
    pub alerts_channel: String,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            max_transaction_items: DEFAULT_MAX_TRANSACTION_ITEMS,
            scan_interval: Some(Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS)),
            redis_url: None,
            alerts_channel: DEFAULT_ALERTS_CHANNEL.to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = parse_or("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR)?;

        let max_transaction_items: usize = parse_or(
            "MAX_TRANSACTION_ITEMS",
            get("MAX_TRANSACTION_ITEMS"),
            &DEFAULT_MAX_TRANSACTION_ITEMS.to_string(),
        )?;
        if max_transaction_items < 2 {
            return Err(ConfigError::Invalid {
                var: "MAX_TRANSACTION_ITEMS",
                reason: "must be at least 2 (parent plus one component)".to_string(),
            });
        }

        let scan_secs: u64 = parse_or(
            "LOW_STOCK_SCAN_INTERVAL_SECS",
            get("LOW_STOCK_SCAN_INTERVAL_SECS"),
            &DEFAULT_SCAN_INTERVAL_SECS.to_string(),
        )?;

        let log_format: LogFormat = parse_or("LOG_FORMAT", get("LOG_FORMAT"), "json")?;

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            max_transaction_items,
            scan_interval: (scan_secs > 0).then(|| Duration::from_secs(scan_secs)),
            redis_url: get("REDIS_URL"),
            alerts_channel: get("ALERTS_CHANNEL").unwrap_or_else(|| DEFAULT_ALERTS_CHANNEL.to_string()),
            log_format,
        })
    }
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = value.as_deref().unwrap_or(default);
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: format!("`{raw}`: {e}"),
    })
}
