//! Install: populate the version's cache generation with the core assets.

use eggcache_core::{Error, Request, Response};
use futures_util::future::try_join_all;
use url::Url;

use crate::OfflineWorker;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub cache_name: String,
    /// Number of core assets written to the generation.
    pub stored: usize,
    /// Whether the version asked to be activated without waiting for pages
    /// controlled by the previous version to close.
    pub skip_waiting: bool,
}

impl OfflineWorker {
    /// Open the cache generation and store every core asset in it.
    ///
    /// All assets are fetched concurrently. A network error or non-2xx status
    /// on any of them fails the install and nothing is stored. If this call
    /// created the generation, it is removed again on failure.
    pub async fn install(&self) -> Result<InstallOutcome, Error> {
        let name = &self.options.cache_name;
        let created = self.storage.open(name).await?;

        match self.populate().await {
            Ok(stored) => {
                tracing::info!(cache_name = %name, stored, "installed core assets");
                Ok(InstallOutcome { cache_name: name.clone(), stored, skip_waiting: true })
            }
            Err(e) => {
                if created && let Err(cleanup) = self.storage.delete(name).await {
                    tracing::warn!(cache_name = %name, error = %cleanup, "failed to remove partial generation");
                }
                tracing::warn!(cache_name = %name, error = %e, "install failed");
                Err(e)
            }
        }
    }

    async fn populate(&self) -> Result<usize, Error> {
        let fetches = self.options.core_assets.iter().map(|url| self.fetch_core_asset(url));
        let entries = try_join_all(fetches).await?;
        self.storage.put_all(&self.options.cache_name, &entries).await?;
        Ok(entries.len())
    }

    async fn fetch_core_asset(&self, url: &Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url.clone());
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed { url: url.to_string(), reason: e.to_string() })?;

        if !response.ok() {
            return Err(Error::InstallFailed { url: url.to_string(), reason: format!("status {}", response.status) });
        }

        Ok((request, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkerOptions;
    use crate::testing::{FakeNetwork, ProbeStorage, V2, core_assets, url, worker};
    use eggcache_core::CacheStorage;

    #[tokio::test]
    async fn test_install_stores_core_assets() {
        let storage = ProbeStorage::new().await;
        let network = FakeNetwork::new();
        let sw = worker(WorkerOptions::new(V2, core_assets()), &storage, &network);

        let outcome = sw.install().await.unwrap();
        assert_eq!(outcome, InstallOutcome { cache_name: V2.into(), stored: 2, skip_waiting: true });

        let entries = storage.entries(V2).await.unwrap();
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["http://127.0.0.1:5000/static/manifest.json", "http://127.0.0.1:5000/static/main_icon.webp"]
        );
    }

    #[tokio::test]
    async fn test_core_assets_retrievable_without_network() {
        let storage = ProbeStorage::new().await;
        let network = FakeNetwork::new();
        let sw = worker(WorkerOptions::new(V2, core_assets()), &storage, &network);
        sw.install().await.unwrap();

        network.set_offline(true);
        for asset in core_assets() {
            let cached = storage.match_request(V2, &Request::get(asset.clone())).await.unwrap();
            assert_eq!(cached.unwrap().url, asset);
        }
    }

    #[tokio::test]
    async fn test_install_fails_on_unreachable_asset() {
        let storage = ProbeStorage::new().await;
        let network = FakeNetwork::new();
        network.fail("/static/main_icon.webp");
        let sw = worker(WorkerOptions::new(V2, core_assets()), &storage, &network);

        let result = sw.install().await;
        assert!(matches!(result, Err(Error::InstallFailed { url, .. }) if url.ends_with("/static/main_icon.webp")));
        assert!(!storage.has(V2).await.unwrap());
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let storage = ProbeStorage::new().await;
        let network = FakeNetwork::new();
        let mut assets = core_assets();
        assets.push(url("/static/missing.css"));
        let sw = worker(WorkerOptions::new(V2, assets), &storage, &network);

        let result = sw.install().await;
        assert!(matches!(result, Err(Error::InstallFailed { reason, .. }) if reason == "status 404"));
        assert!(!storage.has(V2).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_reinstall_keeps_existing_generation() {
        let storage = ProbeStorage::new().await;
        let network = FakeNetwork::new();
        let sw = worker(WorkerOptions::new(V2, core_assets()), &storage, &network);
        sw.install().await.unwrap();

        network.set_offline(true);
        assert!(sw.install().await.is_err());
        assert!(storage.has(V2).await.unwrap());
        assert_eq!(storage.entries(V2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_install_keeps_generation_opened_elsewhere() {
        let storage = ProbeStorage::new().await;
        assert!(storage.open(V2).await.unwrap());
        let network = FakeNetwork::new();
        network.fail("/static/manifest.json");
        let sw = worker(WorkerOptions::new(V2, core_assets()), &storage, &network);

        assert!(sw.install().await.is_err());
        assert!(storage.has(V2).await.unwrap());
        assert!(storage.entries(V2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_write_failure_fails_install() {
        let storage = ProbeStorage::new().await;
        storage.fail_puts(true);
        let network = FakeNetwork::new();
        let sw = worker(WorkerOptions::new(V2, core_assets()), &storage, &network);

        assert!(sw.install().await.is_err());
        assert!(!storage.has(V2).await.unwrap());
    }

    #[tokio::test]
    async fn test_install_with_root_document() {
        let storage = ProbeStorage::new().await;
        let network = FakeNetwork::new();
        let mut assets = vec![url("/")];
        assets.extend(core_assets());
        let sw = worker(WorkerOptions::new(V2, assets), &storage, &network);

        assert_eq!(sw.install().await.unwrap().stored, 3);
        assert!(storage.match_request(V2, &Request::navigate(url("/"))).await.unwrap().is_some());
    }
}
