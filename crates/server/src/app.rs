//! Server state: the worker host plus the single page it serves.

use std::sync::Arc;

use eggcache_client::Network;
use eggcache_core::{CacheDb, Error};
use eggcache_worker::{OfflineWorker, WorkerHost, WorkerOptions};
use url::Url;

pub struct App {
    pub host: WorkerHost,
    pub db: Arc<CacheDb>,
    pub origin: Url,
    /// Page on whose behalf tool fetches are issued.
    pub client_id: String,
}

impl App {
    /// Bring up the worker for `script_url`.
    ///
    /// If the store records this cache generation as already activated, the
    /// version is resumed without lifecycle events. Otherwise it is installed
    /// and activated, and the activation is recorded. A failed install is
    /// logged and leaves the page uncontrolled, so fetches go to the network.
    pub async fn start(
        options: WorkerOptions, script_url: &str, origin: Url, db: Arc<CacheDb>, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let host = WorkerHost::new(script_url, network.clone());
        let worker = Arc::new(OfflineWorker::new(options, db.clone(), network));
        let cache_name = worker.cache_name().to_string();

        let recorded = db.active_version(script_url).await?;
        if recorded.as_deref() == Some(cache_name.as_str()) && db.has_generation(&cache_name).await? {
            host.resume(worker).await;
        } else {
            match host.register(worker).await {
                Ok(outcome) if outcome.activation.is_some() => {
                    db.record_activation(script_url, &cache_name).await?;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(cache_name = %cache_name, error = %e, "starting without a controlling worker"),
            }
        }

        let client_id = host.open_client(&origin).await;
        Ok(Self { host, db, origin, client_id })
    }
}
