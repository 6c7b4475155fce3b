//! Configuration for the server binary, loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `PLANTS_HOST`: Host to bind to (default: 0.0.0.0)
//! - `PLANTS_PORT`: Port to bind to (default: 3000)
//! - `PLANTS_DATA_DIR`: Directory holding `users.json` and `plants.json` (default: .)
//! - `SCAN_INTERVAL_SECS`: Seconds between overdue scans (default: 86400)
//! - `NOTIFY_TIMEOUT_SECS`: Per-message notification timeout (default: 10)
//! - `SMTP_HOST`, `SMTP_PORT` (default 587), `SMTP_USERNAME`, `SMTP_PASSWORD`,
//!   `SMTP_FROM`: outgoing mail. Email is only sent when all of host,
//!   username, password and from are set.
//! - `RUST_LOG`: Log filter (default: plant_tracker=debug,tower_http=debug)

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub scan_interval: Duration,
    pub notify_timeout: Duration,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let scan_secs: u64 = parse_or(&lookup, "SCAN_INTERVAL_SECS", 86_400)?;
        if scan_secs == 0 {
            bail!("SCAN_INTERVAL_SECS must be greater than zero");
        }
        let notify_secs: u64 = parse_or(&lookup, "NOTIFY_TIMEOUT_SECS", 10)?;

        let smtp = match (
            lookup("SMTP_HOST"),
            lookup("SMTP_USERNAME"),
            lookup("SMTP_PASSWORD"),
            lookup("SMTP_FROM"),
        ) {
            (Some(host), Some(username), Some(password), Some(from)) => Some(SmtpConfig {
                host,
                port: parse_or(&lookup, "SMTP_PORT", 587)?,
                username,
                password,
                from,
            }),
            _ => None,
        };

        Ok(Self {
            host: lookup("PLANTS_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PLANTS_PORT", 3000)?,
            data_dir: lookup("PLANTS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            scan_interval: Duration::from_secs(scan_secs),
            notify_timeout: Duration::from_secs(notify_secs),
            smtp,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
