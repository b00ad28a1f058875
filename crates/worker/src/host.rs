//! The host runtime: registers versions, dispatches their events and tracks pages.

use std::sync::{Arc, Mutex, PoisonError};

use eggcache_client::Network;
use eggcache_core::{Error, Request, Response};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use url::Url;

use crate::{
    ActivateReport, Clients, ExtendableEvent, InstallOutcome, OfflineWorker, Registration, Resolution, WorkerState,
    WorkerVersion,
};

/// Result of registering a new version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    pub version: u64,
    pub install: InstallOutcome,
    /// `None` when the version is left waiting.
    pub activation: Option<ActivateReport>,
}

/// How a dispatched request was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    /// `None` when no worker controlled the request.
    pub resolution: Option<Resolution>,
    pub response: Option<Response>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionStatus {
    pub id: u64,
    pub cache_name: String,
    pub state: WorkerState,
    /// Milliseconds spent in the current state.
    pub state_age_ms: u64,
}

impl From<&WorkerVersion> for VersionStatus {
    fn from(version: &WorkerVersion) -> Self {
        Self {
            id: version.id,
            cache_name: version.cache_name().to_string(),
            state: version.state,
            state_age_ms: u64::try_from(version.state_changed_at.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostStatus {
    pub script_url: String,
    pub installing: Option<VersionStatus>,
    pub waiting: Option<VersionStatus>,
    pub active: Option<VersionStatus>,
    pub clients: usize,
    pub controlled_clients: usize,
    /// Event lifetimes (cache writes) still running.
    pub pending_lifetimes: usize,
}

/// Runs the versions registered for one script URL.
///
/// Uncontrolled requests, and requests the worker passes through, are sent
/// with the host's own network client.
pub struct WorkerHost {
    registration: RwLock<Registration>,
    clients: RwLock<Clients>,
    network: Arc<dyn Network>,
    lifetimes: Mutex<JoinSet<()>>,
}

impl WorkerHost {
    pub fn new(script_url: impl Into<String>, network: Arc<dyn Network>) -> Self {
        Self {
            registration: RwLock::new(Registration::new(script_url)),
            clients: RwLock::new(Clients::new()),
            network,
            lifetimes: Mutex::new(JoinSet::new()),
        }
    }

    /// Install `worker` as a new version and, if it asks to skip waiting (or
    /// nothing is controlled by the current version), activate it.
    ///
    /// # Errors
    ///
    /// Returns the install error. The new version is then redundant and the
    /// previously active version keeps control.
    pub async fn register(&self, worker: Arc<OfflineWorker>) -> Result<RegisterOutcome, Error> {
        let version = self.registration.write().await.begin_install(worker.clone());
        tracing::info!(version, cache_name = %worker.cache_name(), "installing");

        let install = match worker.install().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.registration.write().await.install_failed(version);
                tracing::warn!(version, cache_name = %worker.cache_name(), error = %e, "version is redundant");
                return Err(e);
            }
        };

        if !self.registration.write().await.install_complete(version) {
            tracing::warn!(version, "superseded while installing");
            return Ok(RegisterOutcome { version, install, activation: None });
        }

        let activation = if install.skip_waiting || self.active_is_unused().await {
            self.activate_waiting().await
        } else {
            tracing::info!(version, "installed, waiting for controlled clients to close");
            None
        };

        Ok(RegisterOutcome { version, install, activation })
    }

    /// Adopt `worker` as the already activated version, without install or
    /// activate events. Used when the store shows it was activated before.
    pub async fn resume(&self, worker: Arc<OfflineWorker>) -> u64 {
        let version = self.registration.write().await.restore_active(worker.clone());
        tracing::info!(version, cache_name = %worker.cache_name(), "resumed active version");
        version
    }

    async fn active_is_unused(&self) -> bool {
        let active = self.registration.read().await.active.as_ref().map(|v| v.id);
        match active {
            Some(id) => self.clients.read().await.controlled_by(id) == 0,
            None => true,
        }
    }

    /// Activate the waiting version, sweep old generations, then claim every open page.
    async fn activate_waiting(&self) -> Option<ActivateReport> {
        let (version, worker) = self.registration.write().await.promote_waiting()?;
        tracing::info!(version, cache_name = %worker.cache_name(), "activating");

        let report = worker.activate().await;
        self.registration.write().await.activation_complete(version);

        if report.claim_clients {
            let claimed = self.clients.write().await.claim(version);
            tracing::info!(version, claimed, "claimed clients");
        }

        Some(report)
    }

    /// Open a page. It is controlled by the active version, if any.
    pub async fn open_client(&self, url: &Url) -> String {
        let controller = self.registration.read().await.controller().map(|v| v.id);
        self.clients.write().await.open(url, controller)
    }

    /// Close a page; a waiting version activates once the old one controls nothing.
    pub async fn close_client(&self, id: &str) -> Option<ActivateReport> {
        self.clients.write().await.close(id)?;
        let has_waiting = self.registration.read().await.waiting.is_some();
        if has_waiting && self.active_is_unused().await {
            return self.activate_waiting().await;
        }
        None
    }

    /// Route a request from `client` to its controlling worker.
    ///
    /// Navigations are always routed to the active version. Requests from
    /// uncontrolled pages, and requests the worker passes through, go straight
    /// to the network.
    ///
    /// # Errors
    ///
    /// Returns a network error when the request was sent without the worker
    /// producing an answer for it.
    pub async fn dispatch_fetch(&self, client: Option<&str>, request: Request) -> Result<Dispatched, Error> {
        let worker = {
            let registration = self.registration.read().await;
            let version = if request.is_navigation() {
                registration.controller().map(|v| v.id)
            } else {
                let clients = self.clients.read().await;
                client.and_then(|id| clients.get(id)).and_then(|c| c.controller)
            };
            version.and_then(|id| registration.worker_for(id))
        };

        let Some(worker) = worker else {
            let response = self.network.fetch(&request).await?;
            return Ok(Dispatched { resolution: None, response: Some(response) });
        };

        let event = ExtendableEvent::new();
        let passthrough = request.clone();
        let result = worker.handle_fetch(request, &event).await;
        self.keep_alive(event);
        let outcome = result?;

        let resolution = outcome.resolution();
        let response = match resolution {
            Resolution::PassThrough => Some(self.network.fetch(&passthrough).await?),
            _ => outcome.into_response(),
        };

        Ok(Dispatched { resolution: Some(resolution), response })
    }

    /// Hold `event` until its extensions settle. Lifetimes that already
    /// settled are reaped first so the set only tracks running work.
    fn keep_alive(&self, event: ExtendableEvent) {
        let mut lifetimes = self.lifetimes.lock().unwrap_or_else(PoisonError::into_inner);
        while lifetimes.try_join_next().is_some() {}
        if event.pending() > 0 {
            lifetimes.spawn(event.settled());
        }
    }

    /// Number of event lifetimes still held, reaping those that settled.
    pub fn pending_lifetimes(&self) -> usize {
        let mut lifetimes = self.lifetimes.lock().unwrap_or_else(PoisonError::into_inner);
        while lifetimes.try_join_next().is_some() {}
        lifetimes.len()
    }

    /// Wait until every extended event lifetime has settled.
    pub async fn idle(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.lifetimes.lock().unwrap_or_else(PoisonError::into_inner));
            if pending.is_empty() {
                return;
            }
            while pending.join_next().await.is_some() {}
        }
    }

    pub async fn status(&self) -> HostStatus {
        let pending_lifetimes = self.pending_lifetimes();
        let registration = self.registration.read().await;
        let clients = self.clients.read().await;
        HostStatus {
            script_url: registration.script_url.clone(),
            installing: registration.installing.as_ref().map(VersionStatus::from),
            waiting: registration.waiting.as_ref().map(VersionStatus::from),
            active: registration.active.as_ref().map(VersionStatus::from),
            clients: clients.len(),
            controlled_clients: clients.controlled(),
            pending_lifetimes,
        }
    }

    /// Cache generation of the version currently serving fetches.
    pub async fn active_cache_name(&self) -> Option<String> {
        self.registration
            .read()
            .await
            .controller()
            .map(|v| v.cache_name().to_string())
    }
}
