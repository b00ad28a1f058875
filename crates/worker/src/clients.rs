//! Client pages known to the host.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use url::Url;

/// A page that issues requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    pub id: String,
    pub url: String,
    /// Version id of the worker controlling this page.
    pub controller: Option<u64>,
}

/// Registry of open client pages.
#[derive(Debug, Default)]
pub struct Clients {
    clients: HashMap<String, Client>,
}

fn next_client_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("client-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open page, optionally already controlled.
    pub fn open(&mut self, url: &Url, controller: Option<u64>) -> String {
        let id = next_client_id();
        self.clients
            .insert(id.clone(), Client { id: id.clone(), url: url.to_string(), controller });
        id
    }

    pub fn close(&mut self, id: &str) -> Option<Client> {
        self.clients.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Make `version` the controller of every open page.
    ///
    /// Returns how many pages changed controller.
    pub fn claim(&mut self, version: u64) -> usize {
        let mut claimed = 0;
        for client in self.clients.values_mut() {
            if client.controller != Some(version) {
                client.controller = Some(version);
                claimed += 1;
            }
        }
        claimed
    }

    pub fn controlled_by(&self, version: u64) -> usize {
        self.clients.values().filter(|c| c.controller == Some(version)).count()
    }

    pub fn controlled(&self) -> usize {
        self.clients.values().filter(|c| c.controller.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("http://127.0.0.1:5000/").unwrap()
    }

    #[test]
    fn test_open_and_close() {
        let mut clients = Clients::new();
        let a = clients.open(&page(), None);
        let b = clients.open(&page(), Some(7));
        assert_ne!(a, b);
        assert_eq!(clients.len(), 2);
        assert_eq!(clients.get(&b).unwrap().controller, Some(7));

        assert!(clients.close(&a).is_some());
        assert!(clients.close(&a).is_none());
        assert_eq!(clients.len(), 1);
    }

    #[test]
    fn test_claim() {
        let mut clients = Clients::new();
        clients.open(&page(), None);
        clients.open(&page(), Some(1));
        clients.open(&page(), Some(2));

        assert_eq!(clients.claim(2), 2);
        assert_eq!(clients.controlled_by(2), 3);
        assert_eq!(clients.controlled_by(1), 0);
        assert_eq!(clients.claim(2), 0);
    }

    #[test]
    fn test_controlled_counts() {
        let mut clients = Clients::new();
        assert!(clients.is_empty());
        clients.open(&page(), None);
        clients.open(&page(), Some(3));
        assert_eq!(clients.controlled(), 1);
    }
}
