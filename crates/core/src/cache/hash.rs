//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};
use url::Url;

/// Compute the cache key for a request identity.
///
/// The fragment never reaches the server, so it is dropped before hashing.
pub fn compute_request_key(method: &str, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url_without_fragment(url).as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical string form of a URL used for keys and stored request URLs.
pub fn url_without_fragment(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}
