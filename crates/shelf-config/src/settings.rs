//! Typed view over the merged configuration.
//!
//! Every section is optional; a daemon started without any config file runs
//! on the defaults below. Unknown keys are rejected so a typo in a YAML file
//! fails loudly instead of being silently ignored.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::LoadedConfig;

pub const DEFAULT_DATABASE_URL_ENV: &str = "SHELF_DATABASE_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShelfSettings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub orders: OrderSettings,
}

impl ShelfSettings {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let settings: Self = serde_json::from_value(loaded.config_json.clone())
            .context("config does not match the expected settings shape")?;
        // Postgres treats a zero statement_timeout as "no limit".
        if settings.database.statement_timeout_ms == 0 {
            bail!("database.statement_timeout_ms must be greater than zero");
        }
        Ok(settings)
    }

    /// Load and merge `paths`, then parse the result. An empty `paths` yields
    /// the defaults.
    pub fn load(paths: &[&str]) -> Result<(Self, LoadedConfig)> {
        let loaded = crate::load_layered_yaml(paths)?;
        let settings = Self::from_loaded(&loaded)?;
        Ok((settings, loaded))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub addr: String,
    pub request_timeout_ms: u64,
    /// Browser origins allowed by CORS.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            request_timeout_ms: 15_000,
            cors_origins: [
                "http://localhost:3000",
                "http://127.0.0.1:3000",
                "http://localhost:5173",
                "http://127.0.0.1:5173",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSettings {
    /// NAME of the env var holding the connection URL.
    pub url_env: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
    /// Applied transaction-locally to every order transaction.
    pub statement_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url_env: DEFAULT_DATABASE_URL_ENV.to_string(),
            max_connections: 10,
            acquire_timeout_ms: 3_000,
            statement_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderSettings {
    pub total_policy: TotalPolicy,
}

/// How the order manager treats the caller-supplied `total_amount`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalPolicy {
    /// Store the total exactly as submitted.
    #[default]
    Trust,
    /// Reject a total smaller than the sum of `quantity * price` over the
    /// items. Larger totals pass (shipping is added client-side).
    CoverItems,
}
