//! In-process fakes for the network and the cache store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eggcache_client::Network;
use eggcache_core::{CacheDb, CacheEntry, CacheStorage, Error, Request, Response};
use url::Url;

use crate::{OfflineWorker, WorkerOptions};

pub const ORIGIN: &str = "http://127.0.0.1:5000";
pub const V1: &str = "alien-egg-cache-v1";
pub const V2: &str = "alien-egg-cache-v2";

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn core_assets() -> Vec<Url> {
    vec![url("/static/manifest.json"), url("/static/main_icon.webp")]
}

/// Scripted network: known paths answer with their body, unknown paths 404,
/// failing paths and offline mode produce transport errors.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, (u16, &'static str)>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        let net = Self::default();
        net.serve("/", 200, "<html>egg</html>");
        net.serve("/static/manifest.json", 200, r#"{"name":"Alien Egg"}"#);
        net.serve("/static/main_icon.webp", 200, "RIFF-webp-icon");
        net.serve("/api/eggs", 200, r#"[{"id":1}]"#);
        Arc::new(net)
    }

    pub fn serve(&self, path: &str, status: u16, body: &'static str) {
        self.routes.lock().unwrap().insert(path.to_string(), (status, body));
    }

    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| p.as_str() == path).count()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let path = request.url.path().to_string();
        self.calls.lock().unwrap().push(path.clone());

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&path) {
            return Err(Error::Network(format!("connection refused: {}", request.url)));
        }

        let route = self.routes.lock().unwrap().get(&path).copied();
        Ok(match route {
            Some((status, body)) => {
                Response::new(request.url.clone(), status, body).with_header("content-type", "text/plain")
            }
            None => Response::new(request.url.clone(), 404, "not found"),
        })
    }
}

/// CacheDb wrapper that counts accesses and can be told to fail.
pub struct ProbeStorage {
    inner: CacheDb,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_puts: AtomicBool,
    fail_keys: AtomicBool,
    fail_deletes: Mutex<HashSet<String>>,
}

impl ProbeStorage {
    pub async fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: CacheDb::open_in_memory().await.unwrap(),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_puts: AtomicBool::new(false),
            fail_keys: AtomicBool::new(false),
            fail_deletes: Mutex::new(HashSet::new()),
        })
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_keys(&self, fail: bool) {
        self.fail_keys.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, name: &str) {
        self.fail_deletes.lock().unwrap().insert(name.to_string());
    }

    fn write_error(&self) -> Option<Error> {
        self.fail_puts
            .load(Ordering::SeqCst)
            .then(|| Error::MigrationFailed("disk full".into()))
    }
}

#[async_trait]
impl CacheStorage for ProbeStorage {
    async fn open(&self, name: &str) -> Result<bool, Error> {
        self.inner.open(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.inner.has(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        if self.fail_keys.load(Ordering::SeqCst) {
            return Err(Error::CorruptEntry("generation table unreadable".into()));
        }
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        if self.fail_deletes.lock().unwrap().contains(name) {
            return Err(Error::CorruptEntry(format!("cannot delete {name}")));
        }
        self.inner.delete(name).await
    }

    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.match_request(name, request).await
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.write_error() {
            return Err(e);
        }
        self.inner.put(name, request, response).await
    }

    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.write_error() {
            return Err(e);
        }
        self.inner.put_all(name, entries).await
    }

    async fn entries(&self, name: &str) -> Result<Vec<CacheEntry>, Error> {
        self.inner.entries(name).await
    }
}

pub fn worker(options: WorkerOptions, storage: &Arc<ProbeStorage>, network: &Arc<FakeNetwork>) -> Arc<OfflineWorker> {
    Arc::new(OfflineWorker::new(options, storage.clone(), network.clone()))
}
