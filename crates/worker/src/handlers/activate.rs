//! Activate: garbage-collect every cache generation but the current one.

use futures_util::future::join_all;

use crate::OfflineWorker;

/// What the activation sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
    /// The generation that was kept.
    pub kept: String,
    /// Generations removed by this sweep.
    pub deleted: Vec<String>,
    /// Generations that could not be removed, with the reason.
    pub failed: Vec<(String, String)>,
    /// Whether open pages should be claimed once the sweep has settled.
    pub claim_clients: bool,
}

impl OfflineWorker {
    /// Delete every cache generation whose name differs from this version's.
    ///
    /// Deletions run concurrently and independently; one failing does not stop
    /// the others. The report asks the host to claim clients afterwards.
    pub async fn activate(&self) -> ActivateReport {
        let current = &self.options.cache_name;
        let mut report = ActivateReport { kept: current.clone(), claim_clients: true, ..Default::default() };

        let names = match self.storage.keys().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(cache_name = %current, error = %e, "could not list cache generations");
                return report;
            }
        };

        let deletions = names.into_iter().filter(|name| name != current).map(|name| async move {
            let result = self.storage.delete(&name).await;
            (name, result)
        });

        for (name, result) in join_all(deletions).await {
            match result {
                Ok(true) => {
                    tracing::info!(cache_name = %name, "deleted stale cache generation");
                    report.deleted.push(name);
                }
                Ok(false) => tracing::debug!(cache_name = %name, "stale generation already gone"),
                Err(e) => {
                    tracing::warn!(cache_name = %name, error = %e, "failed to delete stale cache generation");
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        report
    }
}
