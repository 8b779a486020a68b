// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "cbr-rates-sync.toml";

pub const CBR_DAILY_URL: &str = "http://www.cbr.ru/scripts/XML_daily.asp";
// The upstream rejects the default reqwest agent.
pub const CBR_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub store: StoreConfig,
    pub poller: PollerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: CBR_DAILY_URL.to_string(),
            user_agent: CBR_USER_AGENT.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// The base currency every feed rate is quoted against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeCurrency {
    pub id: String,
    pub name: String,
    pub char_code: String,
}

impl Default for HomeCurrency {
    fn default() -> Self {
        Self {
            id: "rub".to_string(),
            name: "Российский рубль".to_string(),
            char_code: "RUB".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub max_connections: u32,
    pub query_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub home_currency: HomeCurrency,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://currency.db".to_string(),
            max_connections: 1,
            query_timeout_secs: 10,
            acquire_timeout_secs: 10,
            home_currency: HomeCurrency::default(),
        }
    }
}

impl StoreConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// In-memory store for tests.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }
}

/// What a successful cycle does to the failure count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Failures accumulate for the whole process lifetime.
    #[default]
    Lifetime,
    /// A successful cycle clears the count.
    Consecutive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_secs: u64,
    pub max_failures: u32,
    pub failure_policy: FailurePolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 24 * 60 * 60,
            max_failures: 10,
            failure_policy: FailurePolicy::Lifetime,
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Loads an explicit file, or the default file if present, or the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => load_config(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    load_config(&default_path)?
                } else {
                    tracing::debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feed.url.trim().is_empty() {
            anyhow::bail!("feed.url must not be empty");
        }
        if self.feed.timeout_secs == 0 || self.feed.connect_timeout_secs == 0 {
            anyhow::bail!("feed timeouts must be greater than zero");
        }
        if self.store.url.trim().is_empty() {
            anyhow::bail!("store.url must not be empty");
        }
        if self.store.query_timeout_secs == 0 || self.store.acquire_timeout_secs == 0 {
            anyhow::bail!("store timeouts must be greater than zero");
        }
        if self.store.max_connections == 0 {
            anyhow::bail!("store.max_connections must be greater than zero");
        }
        if self.poller.max_failures == 0 {
            anyhow::bail!("poller.max_failures must be greater than zero");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}
