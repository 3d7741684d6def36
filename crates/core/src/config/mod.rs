//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFGRID_*)
//! 2. TOML config file (if OFFGRID_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::CacheNames;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFGRID_*)
/// 2. TOML config file (if OFFGRID_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version tag baked into both generation names.
    ///
    /// Set via OFFGRID_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Absolute URL of the page served when navigation fails offline.
    ///
    /// Set via OFFGRID_OFFLINE_URL environment variable.
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// Extra assets fetched into the static generation at install.
    ///
    /// Set via OFFGRID_PRECACHE_URLS environment variable (`[a, b]` syntax).
    #[serde(default)]
    pub precache_urls: Vec<String>,

    /// Path to SQLite cache database.
    ///
    /// Set via OFFGRID_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via OFFGRID_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via OFFGRID_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via OFFGRID_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_version() -> String {
    "v3".into()
}

fn default_offline_url() -> String {
    "http://127.0.0.1:8080/offline.html".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offgrid-cache.sqlite")
}

fn default_user_agent() -> String {
    "offgrid/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            offline_url: default_offline_url(),
            precache_urls: Vec::new(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Generation names for the configured version.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::for_version(&self.version)
    }

    /// The offline fallback URL, parsed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the value is not an absolute http(s) URL.
    pub fn offline_url(&self) -> Result<Url, ConfigError> {
        validation::absolute_url("offline_url", &self.offline_url)
    }

    /// Everything install must fetch: the offline page first, then the
    /// configured assets in order, without duplicates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for the first entry that is not an
    /// absolute http(s) URL.
    pub fn precache_list(&self) -> Result<Vec<Url>, ConfigError> {
        let mut list = vec![self.offline_url()?];
        for raw in &self.precache_urls {
            let url = validation::absolute_url("precache_urls", raw)?;
            if !list.contains(&url) {
                list.push(url);
            }
        }
        Ok(list)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFGRID_`
    /// 2. TOML file from `OFFGRID_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFGRID_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFGRID_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version, "v3");
        assert_eq!(config.offline_url, "http://127.0.0.1:8080/offline.html");
        assert!(config.precache_urls.is_empty());
        assert_eq!(config.db_path, PathBuf::from("./offgrid-cache.sqlite"));
        assert_eq!(config.user_agent, "offgrid/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_cache_names_follow_version() {
        let config = AppConfig { version: "v7".into(), ..Default::default() };
        let names = config.cache_names();
        assert_eq!(names.static_name(), "static-v7");
        assert_eq!(names.dynamic_name(), "dynamic-v7");
    }

    #[test]
    fn test_precache_list_starts_with_offline_url() {
        let config = AppConfig {
            offline_url: "https://example.com/offline.html".into(),
            precache_urls: vec![
                "https://example.com/app.css".into(),
                "https://example.com/offline.html".into(),
                "https://example.com/app.css".into(),
            ],
            ..Default::default()
        };
        let list = config.precache_list().unwrap();
        let list: Vec<&str> = list.iter().map(Url::as_str).collect();
        assert_eq!(list, vec!["https://example.com/offline.html", "https://example.com/app.css"]);
    }

    #[test]
    fn test_precache_list_rejects_relative_entry() {
        let config = AppConfig { precache_urls: vec!["/app.js".into()], ..Default::default() };
        assert!(matches!(config.precache_list(), Err(ConfigError::Invalid { field, .. }) if field == "precache_urls"));
    }
}
