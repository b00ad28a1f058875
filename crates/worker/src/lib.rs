//! The offline-caching agent and the host that runs it.
//!
//! ```text
//! WorkerHost
//!     ├── Registration (installing / waiting / active versions)
//!     ├── Clients (pages, each optionally controlled by a version)
//!     └── pending event lifetimes
//!
//! OfflineWorker (one per version)
//!     ├── install   → populate the cache generation with the core assets
//!     ├── activate  → delete every other generation, then claim clients
//!     └── fetch     → pass-through | network-only | cache-first
//! ```

pub mod clients;
pub mod event;
pub mod handlers;
pub mod host;
pub mod lifecycle;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use clients::{Client, Clients};
pub use event::ExtendableEvent;
pub use handlers::{ActivateReport, FetchOutcome, InstallOutcome, Resolution};
pub use host::{Dispatched, HostStatus, RegisterOutcome, VersionStatus, WorkerHost};
pub use lifecycle::{Registration, WorkerState, WorkerVersion};
pub use worker::{OfflineWorker, WorkerOptions};
