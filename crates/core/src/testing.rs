//! Scripted network for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::Error;
use crate::cache::Snapshot;
use crate::network::Network;
use crate::request::{Request, canonicalize};

/// An in-process [`Network`] that answers from a route table.
///
/// Unknown URLs answer 404. While offline every fetch fails with
/// `Error::Network`; URLs marked with [`StubNetwork::time_out`] fail with
/// `Error::FetchTimeout`. Calls are counted whether or not they succeed.
pub struct StubNetwork {
    online: AtomicBool,
    latency: Mutex<Option<Duration>>,
    routes: Mutex<HashMap<String, Snapshot>>,
    timeouts: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl Default for StubNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl StubNetwork {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            latency: Mutex::new(None),
            routes: Mutex::new(HashMap::new()),
            timeouts: Mutex::new(HashSet::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn canonical(url: &str) -> String {
        canonicalize(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
    }

    /// Answer `url` with `status` and `body` from now on.
    pub fn serve(&self, url: &str, status: u16, body: &str) {
        let url = Self::canonical(url);
        let snapshot = Snapshot::new(url.clone(), status, body).with_header("content-type", "text/plain");
        self.routes.lock().unwrap().insert(url, snapshot);
    }

    /// Answer `url` with raw bytes and an explicit content type.
    pub fn serve_bytes(&self, url: &str, status: u16, content_type: &str, body: Vec<u8>) {
        let url = Self::canonical(url);
        let snapshot = Snapshot::new(url.clone(), status, body).with_header("content-type", content_type);
        self.routes.lock().unwrap().insert(url, snapshot);
    }

    /// Make every fetch of `url` time out.
    pub fn time_out(&self, url: &str) {
        self.timeouts.lock().unwrap().insert(Self::canonical(url));
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn calls(&self, url: &str) -> usize {
        let url = Self::canonical(url);
        self.calls.lock().unwrap().get(&url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Snapshot, Error> {
        let url = request.url().to_string();
        *self.calls.lock().unwrap().entry(url.clone()).or_default() += 1;

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {url}")));
        }
        if self.timeouts.lock().unwrap().contains(&url) {
            return Err(Error::FetchTimeout(format!("{url}: timed out")));
        }

        let route = self.routes.lock().unwrap().get(&url).cloned();
        Ok(match route {
            Some(snapshot) => Snapshot { fetched_at: chrono::Utc::now().to_rfc3339(), ..snapshot },
            None => Snapshot::new(url, 404, "not found"),
        })
    }
}
