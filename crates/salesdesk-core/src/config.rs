//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API base URL, the persisted-store backend, the refresh mode and the
//! last used username.
//!
//! Configuration is stored at `~/.config/salesdesk/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::StoreKind;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "salesdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Used when neither config nor environment names a base URL
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Environment override for the API base URL
pub const API_BASE_URL_ENV: &str = "SALESDESK_API_BASE_URL";

/// HTTP request timeout in seconds.
/// 30s allows for slow report generation while failing fast enough for good UX.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// How concurrent requests that all hit an expired credential refresh it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Every denied request runs its own refresh; the last write wins.
    #[default]
    Independent,
    /// Concurrent denied requests await one shared refresh call.
    SingleFlight,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub last_username: Option<String>,
    pub store: StoreKind,
    pub refresh_mode: RefreshMode,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            last_username: None,
            store: StoreKind::default(),
            refresh_mode: RefreshMode::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Directory holding the config and the session file
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Base URL with the environment override applied, normalized.
    pub fn base_url(&self) -> String {
        let raw = std::env::var(API_BASE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        normalize_base_url(&raw)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Trim trailing slashes and append exactly one.
pub fn normalize_base_url(raw: &str) -> String {
    format!("{}/", raw.trim().trim_end_matches('/'))
}

/// Resolve an endpoint path against a normalized base URL.
/// Leading slashes on `path` are ignored, so `/reportes/` stays under the base.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", normalize_base_url(base), path.trim_start_matches('/'))
}
