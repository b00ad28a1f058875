//! Core types and shared functionality for eggcache.
//!
//! This crate provides:
//! - Request/response model shared by the worker and the network client
//! - Cache generations with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;

pub use cache::{CacheDb, CacheEntry, CacheStorage};
pub use config::{AppConfig, ConfigError, NavigationPolicy, OfflineMissPolicy};
pub use error::Error;
pub use model::{Method, Request, RequestMode, Response};
