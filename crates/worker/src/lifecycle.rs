//! Version lifecycle within a registration.
//!
//! ```text
//! Parsed → Installing → Installed (waiting) → Activating → Activated
//!              │                                              │
//!              └──────────────→ Redundant ←───────────────────┘
//! ```
//!
//! A registration holds at most one version in each of the installing,
//! waiting and active slots.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::OfflineWorker;

/// Lifecycle state of a worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Parsed,
    Installing,
    /// Installed and waiting to be activated.
    Installed,
    Activating,
    Activated,
    /// Replaced, or failed to install.
    Redundant,
}

impl WorkerState {
    /// Whether a version in this state receives fetch events.
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activating | WorkerState::Activated)
    }
}

fn next_version_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A worker version as tracked by the registration.
#[derive(Debug, Clone)]
pub struct WorkerVersion {
    pub id: u64,
    pub state: WorkerState,
    pub worker: Arc<OfflineWorker>,
    pub state_changed_at: Instant,
}

impl WorkerVersion {
    pub fn new(worker: Arc<OfflineWorker>) -> Self {
        Self { id: next_version_id(), state: WorkerState::Parsed, worker, state_changed_at: Instant::now() }
    }

    pub fn set_state(&mut self, state: WorkerState) {
        tracing::debug!(version = self.id, cache_name = %self.worker.cache_name(), from = ?self.state, to = ?state, "state change");
        self.state = state;
        self.state_changed_at = Instant::now();
    }

    pub fn cache_name(&self) -> &str {
        self.worker.cache_name()
    }
}

/// The versions registered for one script URL.
#[derive(Debug)]
pub struct Registration {
    pub script_url: String,
    pub installing: Option<WorkerVersion>,
    pub waiting: Option<WorkerVersion>,
    pub active: Option<WorkerVersion>,
}

impl Registration {
    pub fn new(script_url: impl Into<String>) -> Self {
        Self { script_url: script_url.into(), installing: None, waiting: None, active: None }
    }

    /// Start installing a new version. Any version still installing is made redundant.
    pub fn begin_install(&mut self, worker: Arc<OfflineWorker>) -> u64 {
        if let Some(mut previous) = self.installing.take() {
            previous.set_state(WorkerState::Redundant);
        }
        let mut version = WorkerVersion::new(worker);
        version.set_state(WorkerState::Installing);
        let id = version.id;
        self.installing = Some(version);
        id
    }

    /// Mark the installing version `id` redundant. The active version is untouched.
    pub fn install_failed(&mut self, id: u64) -> bool {
        match self.installing.take_if(|v| v.id == id) {
            Some(mut version) => {
                version.set_state(WorkerState::Redundant);
                true
            }
            None => false,
        }
    }

    /// Move the installing version `id` to waiting, replacing any older waiting version.
    pub fn install_complete(&mut self, id: u64) -> bool {
        let Some(mut version) = self.installing.take_if(|v| v.id == id) else {
            return false;
        };
        if let Some(mut previous) = self.waiting.take() {
            previous.set_state(WorkerState::Redundant);
        }
        version.set_state(WorkerState::Installed);
        self.waiting = Some(version);
        true
    }

    /// Promote the waiting version to active in the `Activating` state.
    ///
    /// The previously active version becomes redundant. Returns the promoted
    /// version's id and worker.
    pub fn promote_waiting(&mut self) -> Option<(u64, Arc<OfflineWorker>)> {
        let mut version = self.waiting.take()?;
        if let Some(mut old) = self.active.take() {
            old.set_state(WorkerState::Redundant);
        }
        version.set_state(WorkerState::Activating);
        let promoted = (version.id, version.worker.clone());
        self.active = Some(version);
        Some(promoted)
    }

    /// Finish activation of the active version `id`.
    pub fn activation_complete(&mut self, id: u64) -> bool {
        match self.active.as_mut() {
            Some(version) if version.id == id => {
                version.set_state(WorkerState::Activated);
                true
            }
            _ => false,
        }
    }

    /// Install `worker` directly as the activated version, without lifecycle events.
    pub fn restore_active(&mut self, worker: Arc<OfflineWorker>) -> u64 {
        if let Some(mut old) = self.active.take() {
            old.set_state(WorkerState::Redundant);
        }
        let mut version = WorkerVersion::new(worker);
        version.set_state(WorkerState::Activated);
        let id = version.id;
        self.active = Some(version);
        id
    }

    /// The active version, if it can currently receive fetch events.
    pub fn controller(&self) -> Option<&WorkerVersion> {
        self.active.as_ref().filter(|v| v.state.can_intercept_fetch())
    }

    /// The worker of the active version `id`.
    pub fn worker_for(&self, id: u64) -> Option<Arc<OfflineWorker>> {
        self.controller().filter(|v| v.id == id).map(|v| v.worker.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkerOptions;
    use crate::testing::{FakeNetwork, ProbeStorage, V1, V2, core_assets, worker};

    async fn workers() -> (Arc<OfflineWorker>, Arc<OfflineWorker>) {
        let storage = ProbeStorage::new().await;
        let network = FakeNetwork::new();
        (
            worker(WorkerOptions::new(V1, core_assets()), &storage, &network),
            worker(WorkerOptions::new(V2, core_assets()), &storage, &network),
        )
    }

    #[test]
    fn test_worker_state_intercepts() {
        assert!(!WorkerState::Parsed.can_intercept_fetch());
        assert!(!WorkerState::Installed.can_intercept_fetch());
        assert!(WorkerState::Activating.can_intercept_fetch());
        assert!(WorkerState::Activated.can_intercept_fetch());
        assert!(!WorkerState::Redundant.can_intercept_fetch());
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (v1, _) = workers().await;
        let mut reg = Registration::new("/static/js/service-worker.js");

        let id = reg.begin_install(v1);
        assert_eq!(reg.installing.as_ref().unwrap().state, WorkerState::Installing);

        assert!(reg.install_complete(id));
        assert!(reg.installing.is_none());
        assert_eq!(reg.waiting.as_ref().unwrap().state, WorkerState::Installed);

        let (promoted, worker) = reg.promote_waiting().unwrap();
        assert_eq!(promoted, id);
        assert_eq!(worker.cache_name(), V1);
        assert_eq!(reg.active.as_ref().unwrap().state, WorkerState::Activating);
        assert!(reg.controller().is_some());

        assert!(reg.activation_complete(id));
        assert_eq!(reg.active.as_ref().unwrap().state, WorkerState::Activated);
        assert!(reg.worker_for(id).is_some());
    }

    #[tokio::test]
    async fn test_failed_install_keeps_active() {
        let (v1, v2) = workers().await;
        let mut reg = Registration::new("/sw.js");
        let active = reg.restore_active(v1);

        let id = reg.begin_install(v2);
        assert!(reg.install_failed(id));
        assert!(reg.installing.is_none());
        assert!(reg.waiting.is_none());
        assert_eq!(reg.controller().unwrap().id, active);
        assert_eq!(reg.controller().unwrap().cache_name(), V1);
    }

    #[tokio::test]
    async fn test_promote_replaces_active() {
        let (v1, v2) = workers().await;
        let mut reg = Registration::new("/sw.js");
        let old = reg.restore_active(v1);

        let id = reg.begin_install(v2);
        reg.install_complete(id);
        reg.promote_waiting();

        assert!(reg.worker_for(old).is_none());
        assert_eq!(reg.controller().unwrap().cache_name(), V2);
    }

    #[tokio::test]
    async fn test_stale_ids_are_ignored() {
        let (v1, v2) = workers().await;
        let mut reg = Registration::new("/sw.js");
        let first = reg.begin_install(v1);
        let second = reg.begin_install(v2);

        assert!(!reg.install_complete(first));
        assert!(!reg.install_failed(first));
        assert!(reg.install_complete(second));
        assert!(reg.promote_waiting().is_some());
        assert!(!reg.activation_complete(first));
    }

    #[test]
    fn test_promote_without_waiting() {
        let mut reg = Registration::new("/sw.js");
        assert!(reg.promote_waiting().is_none());
        assert!(reg.controller().is_none());
    }
}
