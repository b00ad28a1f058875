//! Fetch: resolve an intercepted request.
//!
//! Order of checks:
//! 1. non-GET requests pass through untouched
//! 2. navigations go network-only when the navigation policy says so
//! 3. everything else is cache-first, repopulating the cache on a miss

use eggcache_core::{Error, NavigationPolicy, OfflineMissPolicy, Request, Response};
use serde::Serialize;

use crate::{ExtendableEvent, OfflineWorker};

/// Terminal state of one intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    PassThrough,
    NetworkOnly,
    CacheHit,
    CacheMissNetworkOk,
    CacheMissNetworkFail,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::PassThrough => "pass_through",
            Resolution::NetworkOnly => "network_only",
            Resolution::CacheHit => "cache_hit",
            Resolution::CacheMissNetworkOk => "cache_miss_network_ok",
            Resolution::CacheMissNetworkFail => "cache_miss_network_fail",
        }
    }
}

/// How the interceptor answered a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host sends the request itself.
    PassThrough,
    /// Navigation served straight from the network.
    NetworkOnly(Response),
    /// Stored snapshot returned without touching the network.
    CacheHit(Response),
    /// Live network response; a copy is being stored.
    CacheMissNetworkOk(Response),
    /// Miss while the network failed. `None` unless the offline-miss policy
    /// substitutes an unavailable response.
    CacheMissNetworkFail(Option<Response>),
}

impl FetchOutcome {
    pub fn resolution(&self) -> Resolution {
        match self {
            FetchOutcome::PassThrough => Resolution::PassThrough,
            FetchOutcome::NetworkOnly(_) => Resolution::NetworkOnly,
            FetchOutcome::CacheHit(_) => Resolution::CacheHit,
            FetchOutcome::CacheMissNetworkOk(_) => Resolution::CacheMissNetworkOk,
            FetchOutcome::CacheMissNetworkFail(_) => Resolution::CacheMissNetworkFail,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::PassThrough => None,
            FetchOutcome::NetworkOnly(r) | FetchOutcome::CacheHit(r) | FetchOutcome::CacheMissNetworkOk(r) => Some(r),
            FetchOutcome::CacheMissNetworkFail(r) => r.as_ref(),
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchOutcome::PassThrough => None,
            FetchOutcome::NetworkOnly(r) | FetchOutcome::CacheHit(r) | FetchOutcome::CacheMissNetworkOk(r) => Some(r),
            FetchOutcome::CacheMissNetworkFail(r) => r,
        }
    }
}

impl OfflineWorker {
    /// Resolve one request from a controlled page.
    ///
    /// The cache write after a network miss runs as an extension of `event`;
    /// its failure is logged and otherwise ignored. The only error returned is
    /// a network failure on a network-only navigation.
    pub async fn handle_fetch(&self, request: Request, event: &ExtendableEvent) -> Result<FetchOutcome, Error> {
        if !request.method.is_get() {
            tracing::debug!(method = %request.method, url = %request.url, "pass through");
            return Ok(FetchOutcome::PassThrough);
        }

        if request.is_navigation() && self.options.navigation == NavigationPolicy::NetworkOnly {
            let response = self.network.fetch(&request).await?;
            tracing::debug!(url = %request.url, status = response.status, "navigation served from network");
            return Ok(FetchOutcome::NetworkOnly(response));
        }

        let name = &self.options.cache_name;
        let cached = match self.storage.match_request(name, &request).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(cache_name = %name, url = %request.url, error = %e, "cache lookup failed, treating as miss");
                None
            }
        };

        if let Some(response) = cached {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(FetchOutcome::CacheHit(response));
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                tracing::debug!(url = %request.url, status = response.status, "cache miss, stored from network");
                let copy = response.clone();
                let storage = self.storage.clone();
                let name = name.clone();
                event.wait_until(async move {
                    if let Err(e) = storage.put(&name, &request, &copy).await {
                        tracing::debug!(cache_name = %name, url = %request.url, error = %e, "cache write discarded");
                    }
                });
                Ok(FetchOutcome::CacheMissNetworkOk(response))
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "cache miss and network failed");
                // The lookup above produced nothing, so that is all there is to return.
                let fallback = match self.options.offline_miss {
                    OfflineMissPolicy::Empty => None,
                    OfflineMissPolicy::Unavailable => Some(Response::unavailable(request.url.clone())),
                };
                Ok(FetchOutcome::CacheMissNetworkFail(fallback))
            }
        }
    }
}
