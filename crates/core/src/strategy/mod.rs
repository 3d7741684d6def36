//! Caching strategies and the engine that dispatches to them.
//!
//! Every strategy reads and writes the current dynamic generation. The only
//! other generation touched at runtime is the static one, and only to read
//! the offline fallback page.

pub mod cache_first;
pub mod network_first;
pub mod stale_while_revalidate;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::{Generation, Role, Snapshot, VersionedStore};
use crate::classify::{Strategy, classify};
use crate::network::Network;
use crate::request::{Method, Request};

pub use cache_first::cache_first;
pub use network_first::{OfflineFallback, network_first};
pub use stale_while_revalidate::{Revalidations, stale_while_revalidate};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Cache,
    Network,
    OfflineFallback,
}

/// A response handed back to the host, with how it was obtained.
#[derive(Debug, Clone)]
pub struct Served {
    pub snapshot: Snapshot,
    pub strategy: Strategy,
    pub source: Source,
}

impl Served {
    pub(crate) fn new(strategy: Strategy, source: Source, snapshot: Snapshot) -> Self {
        Self { snapshot, strategy, source }
    }
}

/// Store a copy of a fresh response in `generation`.
///
/// Returns whether the copy was written. Write failures are logged and
/// swallowed: the caller already holds a good response.
pub(crate) async fn capture(generation: &Generation, request: &Request, snapshot: &Snapshot) -> bool {
    if !request.is_cacheable() || !snapshot.is_storable() {
        tracing::debug!(
            url = %request.url(),
            method = %request.method(),
            status = snapshot.status,
            "response not cacheable, skipping write"
        );
        return false;
    }

    match generation.put(request, snapshot).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(url = %request.url(), generation = generation.name(), error = %e, "cache write failed");
            false
        }
    }
}

/// Classifies requests and runs the chosen strategy.
pub struct Engine {
    store: VersionedStore,
    network: Arc<dyn Network>,
    offline: OfflineFallback,
    revalidations: Revalidations,
}

impl Engine {
    pub fn new(store: VersionedStore, network: Arc<dyn Network>, offline_url: Url) -> Self {
        let offline = OfflineFallback::new(store.clone(), Request::from_url(Method::Get, offline_url));
        Self { store, network, offline, revalidations: Revalidations::default() }
    }

    pub fn store(&self) -> &VersionedStore {
        &self.store
    }

    /// Classify `request` and answer it.
    pub async fn respond(&self, request: &Request) -> Result<Served, Error> {
        let strategy = classify(request);
        tracing::debug!(url = %request.url(), destination = %request.destination(), %strategy, "classified request");
        self.execute(strategy, request).await
    }

    /// Answer `request` with a specific strategy.
    pub async fn execute(&self, strategy: Strategy, request: &Request) -> Result<Served, Error> {
        let dynamic = self.store.open(Role::Dynamic).await?;
        match strategy {
            Strategy::CacheFirst => cache_first(&dynamic, self.network.as_ref(), request).await,
            Strategy::NetworkFirst => network_first(&dynamic, self.network.as_ref(), request, &self.offline).await,
            Strategy::StaleWhileRevalidate => {
                stale_while_revalidate(&dynamic, Arc::clone(&self.network), request, &self.revalidations).await
            }
        }
    }

    pub fn pending_refreshes(&self) -> usize {
        self.revalidations.pending()
    }

    /// Wait for every background refresh started so far. Returns how many
    /// were awaited.
    pub async fn settle(&self) -> usize {
        self.revalidations.settle().await
    }
}
