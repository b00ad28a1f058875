//! One version of the offline-caching agent.

use std::fmt;
use std::sync::Arc;

use eggcache_client::Network;
use eggcache_core::{AppConfig, CacheStorage, ConfigError, NavigationPolicy, OfflineMissPolicy};
use url::Url;

/// Deploy-time settings of a worker version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Name of the cache generation this version owns.
    pub cache_name: String,
    /// Absolute URLs stored during install, in order.
    pub core_assets: Vec<Url>,
    pub navigation: NavigationPolicy,
    pub offline_miss: OfflineMissPolicy,
}

impl WorkerOptions {
    pub fn new(cache_name: impl Into<String>, core_assets: Vec<Url>) -> Self {
        Self {
            cache_name: cache_name.into(),
            core_assets,
            navigation: NavigationPolicy::default(),
            offline_miss: OfflineMissPolicy::default(),
        }
    }

    /// Build options from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin or a core asset path is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            cache_name: config.cache_name.clone(),
            core_assets: config.core_asset_urls()?,
            navigation: config.navigation,
            offline_miss: config.offline_miss,
        })
    }

    pub fn with_navigation(mut self, navigation: NavigationPolicy) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn with_offline_miss(mut self, offline_miss: OfflineMissPolicy) -> Self {
        self.offline_miss = offline_miss;
        self
    }
}

/// A worker version: its options plus the cache store and network it uses.
///
/// The lifecycle handlers live in [`crate::handlers`].
pub struct OfflineWorker {
    pub(crate) options: WorkerOptions,
    pub(crate) storage: Arc<dyn CacheStorage>,
    pub(crate) network: Arc<dyn Network>,
}

impl OfflineWorker {
    pub fn new(options: WorkerOptions, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self { options, storage, network }
    }

    pub fn cache_name(&self) -> &str {
        &self.options.cache_name
    }

    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }
}

impl fmt::Debug for OfflineWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineWorker").field("options", &self.options).finish_non_exhaustive()
    }
}
