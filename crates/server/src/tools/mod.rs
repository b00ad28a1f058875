//! MCP tool implementations.
//!
//! This module contains all tools exposed by the eggcache server.

pub mod fetch;
pub mod status;

pub use fetch::{FetchParams, fetch_impl};
pub use status::status_impl;
