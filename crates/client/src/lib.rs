//! Network client for eggcache.
//!
//! This crate provides the `Network` seam the worker fetches through, its
//! reqwest implementation, and URL resolution against the application origin.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, resolve};
