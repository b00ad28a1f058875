//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (EGGCACHE_*)
//! 2. TOML config file (if EGGCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// How the fetch interceptor treats navigation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationPolicy {
    /// Navigations always go to the network and are never cached.
    #[default]
    NetworkOnly,
    /// Navigations are resolved cache-first like any other GET.
    CacheFirst,
}

/// What a cache miss resolves to when the network is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineMissPolicy {
    /// Resolve to no response at all.
    #[default]
    Empty,
    /// Resolve to a synthesized `503 Service Unavailable`.
    Unavailable,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (EGGCACHE_*)
/// 2. TOML config file (if EGGCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the current cache generation. Changing it is how a new
    /// version is rolled out.
    ///
    /// Set via EGGCACHE_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Paths stored in the generation during install.
    ///
    /// Set via EGGCACHE_CORE_ASSETS environment variable
    /// (e.g. `["/static/manifest.json", "/static/main_icon.webp"]`).
    #[serde(default = "default_core_assets")]
    pub core_assets: Vec<String>,

    /// Origin of the web application; relative paths resolve against it.
    ///
    /// Set via EGGCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Script URL the agent is registered under.
    ///
    /// Set via EGGCACHE_SCRIPT_URL environment variable.
    #[serde(default = "default_script_url")]
    pub script_url: String,

    /// Navigation request handling.
    ///
    /// Set via EGGCACHE_NAVIGATION environment variable
    /// (`network_only` or `cache_first`).
    #[serde(default)]
    pub navigation: NavigationPolicy,

    /// Result of a cache miss while offline.
    ///
    /// Set via EGGCACHE_OFFLINE_MISS environment variable
    /// (`empty` or `unavailable`).
    #[serde(default)]
    pub offline_miss: OfflineMissPolicy,

    /// Path to the SQLite cache database.
    ///
    /// Set via EGGCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    ///
    /// Set via EGGCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    ///
    /// Set via EGGCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    ///
    /// Set via EGGCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_cache_name() -> String {
    "alien-egg-cache-v2".into()
}

fn default_core_assets() -> Vec<String> {
    vec!["/static/manifest.json".into(), "/static/main_icon.webp".into()]
}

fn default_origin() -> String {
    "http://127.0.0.1:5000".into()
}

fn default_script_url() -> String {
    "/static/js/service-worker.js".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./eggcache.sqlite")
}

fn default_user_agent() -> String {
    "eggcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            core_assets: default_core_assets(),
            origin: default_origin(),
            script_url: default_script_url(),
            navigation: NavigationPolicy::default(),
            offline_miss: OfflineMissPolicy::default(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `EGGCACHE_`
    /// 2. TOML file from `EGGCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("EGGCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("EGGCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The application origin as a URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {scheme}") }),
        }
    }

    /// Core asset paths resolved against the origin, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin or any asset path is invalid.
    pub fn core_asset_urls(&self) -> Result<Vec<Url>, ConfigError> {
        let origin = self.origin_url()?;
        self.core_assets
            .iter()
            .map(|path| {
                origin.join(path).map_err(|e| ConfigError::Invalid {
                    field: "core_assets".into(),
                    reason: format!("{path}: {e}"),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_name, "alien-egg-cache-v2");
        assert_eq!(config.core_assets, vec!["/static/manifest.json", "/static/main_icon.webp"]);
        assert_eq!(config.origin, "http://127.0.0.1:5000");
        assert_eq!(config.script_url, "/static/js/service-worker.js");
        assert_eq!(config.navigation, NavigationPolicy::NetworkOnly);
        assert_eq!(config.offline_miss, OfflineMissPolicy::Empty);
        assert_eq!(config.db_path, PathBuf::from("./eggcache.sqlite"));
        assert_eq!(config.user_agent, "eggcache/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_bytes, 5_242_880);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_core_asset_urls() {
        let config = AppConfig::default();
        let urls = config.core_asset_urls().unwrap();
        assert_eq!(urls[0].as_str(), "http://127.0.0.1:5000/static/manifest.json");
        assert_eq!(urls[1].as_str(), "http://127.0.0.1:5000/static/main_icon.webp");
    }

    #[test]
    fn test_absolute_core_asset_kept() {
        let config = AppConfig { core_assets: vec!["https://cdn.example.com/egg.css".into()], ..Default::default() };
        let urls = config.core_asset_urls().unwrap();
        assert_eq!(urls[0].as_str(), "https://cdn.example.com/egg.css");
    }

    #[test]
    fn test_origin_rejects_other_schemes() {
        let config = AppConfig { origin: "file:///srv/app".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_load_layers() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "eggcache.toml",
                r#"
                cache_name = "alien-egg-cache-v3"
                navigation = "cache_first"
                core_assets = ["/", "/static/manifest.json"]
                "#,
            )?;
            jail.set_env("EGGCACHE_CONFIG_FILE", "eggcache.toml");
            jail.set_env("EGGCACHE_OFFLINE_MISS", "unavailable");
            jail.set_env("EGGCACHE_CACHE_NAME", "alien-egg-cache-v4");

            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.cache_name, "alien-egg-cache-v4");
            assert_eq!(config.navigation, NavigationPolicy::CacheFirst);
            assert_eq!(config.offline_miss, OfflineMissPolicy::Unavailable);
            assert_eq!(config.core_assets, vec!["/", "/static/manifest.json"]);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("EGGCACHE_TIMEOUT_MS", "10");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
            Ok(())
        });
    }
}
