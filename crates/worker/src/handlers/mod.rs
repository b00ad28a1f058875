//! Lifecycle handlers of the offline-caching agent.
//!
//! Each handler is an async method on [`OfflineWorker`](crate::OfflineWorker)
//! that the host awaits before moving the version to its next phase.

pub mod activate;
pub mod fetch;
pub mod install;

pub use activate::ActivateReport;
pub use fetch::{FetchOutcome, Resolution};
pub use install::InstallOutcome;
