//! SQLite-backed cache generations.
//!
//! A cache generation is a named store mapping a request identity (method + URL)
//! to a response snapshot. This module provides:
//!
//! - The `CacheStorage` trait the worker is written against
//! - `CacheDb`, its SQLite implementation (async access via tokio-rusqlite)
//! - Content-addressed request keys using SHA-256
//! - Automatic schema migrations
//! - The record of which generation is active per registered script

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod registrations;

use async_trait::async_trait;

pub use crate::Error;
use crate::{Request, Response};

pub use connection::CacheDb;
pub use entries::CacheEntry;

/// Storage of named cache generations.
///
/// Every operation addresses a generation by name. Writes to a generation that
/// does not exist fail; writes to an existing key replace it.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the generation if absent. Returns true if this call created it.
    async fn open(&self, name: &str) -> Result<bool, Error>;

    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Generation names in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation and all its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error>;

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Store every pair or none of them.
    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error>;

    async fn entries(&self, name: &str) -> Result<Vec<CacheEntry>, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<bool, Error> {
        self.open_generation(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.has_generation(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.generation_names().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_generation(name).await
    }

    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.get_entry(name, request).await.map(|e| e.map(|e| e.response))
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.upsert_entry(name, request, response).await
    }

    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        self.upsert_entries(name, entries).await
    }

    async fn entries(&self, name: &str) -> Result<Vec<CacheEntry>, Error> {
        self.list_entries(name).await
    }
}
