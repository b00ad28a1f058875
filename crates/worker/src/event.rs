//! Event lifetimes.
//!
//! A handler may finish its visible work (say, hand back a response) while
//! background work it started is still running. Such work is registered with
//! `wait_until`, and the host keeps the event alive until `settled` returns.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinSet;

/// An event whose lifetime can be extended by background work.
pub struct ExtendableEvent {
    tasks: Mutex<JoinSet<()>>,
}

impl ExtendableEvent {
    pub fn new() -> Self {
        Self { tasks: Mutex::new(JoinSet::new()) }
    }

    /// Extend the event until `work` completes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).spawn(work);
    }

    /// Number of extensions not yet collected by `settled`.
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait for every extension to finish.
    pub async fn settled(self) {
        let mut tasks = self.tasks.into_inner().unwrap_or_else(PoisonError::into_inner);
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "event extension did not complete");
            }
        }
    }
}

impl Default for ExtendableEvent {
    fn default() -> Self {
        Self::new()
    }
}
