//! The worker: lifecycle plus fetch handling for one version.

use std::sync::Arc;

use url::Url;

use crate::Error;
use crate::cache::{CacheNames, Storage, VersionedStore};
use crate::config::AppConfig;
use crate::lifecycle::{ActivateReport, ClientControl, InstallReport, Lifecycle, WorkerState};
use crate::network::Network;
use crate::request::Request;
use crate::strategy::{Engine, Served};

/// One deployed version of the offline worker.
pub struct Worker {
    lifecycle: Lifecycle,
    engine: Engine,
}

impl Worker {
    pub fn new(
        store: VersionedStore, network: Arc<dyn Network>, clients: Arc<dyn ClientControl>, offline_url: Url,
        precache: Vec<Url>,
    ) -> Self {
        let lifecycle = Lifecycle::new(store.clone(), Arc::clone(&network), clients, precache);
        let engine = Engine::new(store, network, offline_url);
        Self { lifecycle, engine }
    }

    /// Build a worker for the configured version, offline page and precache list.
    pub fn from_config(
        config: &AppConfig, storage: Arc<dyn Storage>, network: Arc<dyn Network>, clients: Arc<dyn ClientControl>,
    ) -> Result<Self, Error> {
        let store = VersionedStore::new(storage, config.cache_names());
        Ok(Self::new(store, network, clients, config.offline_url()?, config.precache_list()?))
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn names(&self) -> &CacheNames {
        self.engine.store().names()
    }

    pub fn store(&self) -> &VersionedStore {
        self.engine.store()
    }

    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.lifecycle.activate().await
    }

    /// Install then activate, as a fresh deployment does.
    pub async fn boot(&self) -> Result<(InstallReport, ActivateReport), Error> {
        let installed = self.install().await?;
        let activated = self.activate().await?;
        Ok((installed, activated))
    }

    /// Handle an intercepted request.
    ///
    /// # Errors
    ///
    /// Returns `Error::Lifecycle` unless the worker is activated, otherwise
    /// whatever the selected strategy surfaces.
    pub async fn fetch(&self, request: &Request) -> Result<Served, Error> {
        let state = self.state();
        if !state.can_intercept_fetch() {
            return Err(Error::Lifecycle(format!("worker is {state}, not intercepting fetches")));
        }
        self.engine.respond(request).await
    }

    /// Background refreshes started but not yet awaited.
    pub fn pending_refreshes(&self) -> usize {
        self.engine.pending_refreshes()
    }

    /// Wait for outstanding background refreshes.
    pub async fn settle(&self) -> usize {
        self.engine.settle().await
    }
}
