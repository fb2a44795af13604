//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has defaults, so a missing section falls back to the reference
//! deployment (port 8083, one seeded account, 10-second sweep).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub account: AccountConfig,
    pub sources: SourcesConfig,
    pub sweeper: SweeperConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8083,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// Name of an env var that, when set, overrides `url`.
    pub url_env: Option<String>,
    pub max_connections: u32,
    /// How long a transaction waits for the account lock before failing.
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://bets.db".into(),
            url_env: Some("DATABASE_URL".into()),
            max_connections: 8,
            busy_timeout_secs: 30,
        }
    }
}

/// The single account every bet settles against.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AccountConfig {
    pub identity: String,
    /// Balance the account is created with, in minor units.
    pub initial_balance: i64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            identity: "betplacer@gmail.com".into(),
            initial_balance: 0,
        }
    }
}

/// Labels seeded into the source registry.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    pub labels: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            labels: vec!["game".into(), "server".into(), "payment".into()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SweeperConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub batch_size: u32,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            batch_size: 10,
        }
    }
}

impl SweeperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.account.identity.trim().is_empty() {
            bail!("account.identity must not be empty");
        }
        if self.account.initial_balance < 0 {
            bail!("account.initial_balance must not be negative");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }
        if self.sweeper.interval_secs == 0 {
            bail!("sweeper.interval_secs must be at least 1");
        }
        if self.sweeper.batch_size == 0 {
            bail!("sweeper.batch_size must be at least 1");
        }
        Ok(())
    }

    /// The database URL, preferring the override env var when it is set.
    pub fn database_url(&self) -> String {
        self.database
            .url_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .unwrap_or_else(|| self.database.url.clone())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
