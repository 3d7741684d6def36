//! Install/activate lifecycle.
//!
//! A worker moves `Parsed → Installing → Installed → Activating → Activated`.
//! A failed install leaves it `Redundant`, from where install may be retried.
//! Install precaches into the static generation all-or-nothing; activate
//! purges every generation that does not belong to the current version.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::{Role, VersionedStore};
use crate::network::Network;
use crate::request::{Method, Request};

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    /// Only an activated worker intercepts fetches.
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Client-control side effects of the host runtime.
#[async_trait]
pub trait ClientControl: Send + Sync {
    /// Take effect without waiting for existing clients to close.
    async fn skip_waiting(&self);

    /// Take control of every open client.
    async fn claim(&self);
}

/// [`ClientControl`] that records what was asked of it.
#[derive(Debug, Default)]
pub struct ClientTracker {
    waiting_skipped: AtomicBool,
    claims: AtomicU64,
}

impl ClientTracker {
    pub fn waiting_skipped(&self) -> bool {
        self.waiting_skipped.load(Ordering::SeqCst)
    }

    /// Whether open clients are controlled by the current version.
    pub fn controlled(&self) -> bool {
        self.claims() > 0
    }

    pub fn claims(&self) -> u64 {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientControl for ClientTracker {
    async fn skip_waiting(&self) {
        self.waiting_skipped.store(true, Ordering::SeqCst);
    }

    async fn claim(&self) {
        self.claims.fetch_add(1, Ordering::SeqCst);
    }
}

/// Outcome of a successful install.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub generation: String,
    pub precached: Vec<String>,
}

/// Outcome of a successful activate.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub retained: Vec<String>,
}

/// Drives install and activate for one version.
pub struct Lifecycle {
    store: VersionedStore,
    network: Arc<dyn Network>,
    clients: Arc<dyn ClientControl>,
    precache: Vec<Url>,
    state: Mutex<WorkerState>,
}

impl Lifecycle {
    pub fn new(
        store: VersionedStore, network: Arc<dyn Network>, clients: Arc<dyn ClientControl>, precache: Vec<Url>,
    ) -> Self {
        Self { store, network, clients, precache, state: Mutex::new(WorkerState::Parsed) }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: WorkerState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(from = %*state, to = %next, "worker state change");
        *state = next;
    }

    /// Move to `next` if the current state is one of `allowed`.
    fn transition(&self, allowed: &[WorkerState], next: WorkerState) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !allowed.contains(&state) {
            return Err(Error::Lifecycle(format!("cannot move to {next} from {}", *state)));
        }
        tracing::info!(from = %*state, to = %next, "worker state change");
        *state = next;
        Ok(())
    }

    /// Precache every configured asset into the static generation.
    ///
    /// All assets are fetched before anything is written; one failure or
    /// non-2xx status fails the whole install, leaves the static generation
    /// as it was, and marks the worker redundant.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(&[WorkerState::Parsed, WorkerState::Redundant], WorkerState::Installing)?;

        match self.precache_all().await {
            Ok(report) => {
                self.clients.skip_waiting().await;
                self.set_state(WorkerState::Installed);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "install failed");
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn precache_all(&self) -> Result<InstallReport, Error> {
        let statics = self.store.open(Role::Static).await?;

        let fetches = self.precache.iter().map(|url| async move {
            let request = Request::from_url(Method::Get, url.clone());
            let snapshot = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::PrecacheFailed { url: url.to_string(), reason: e.to_string() })?;
            if !snapshot.is_success() {
                return Err(Error::PrecacheFailed { url: url.to_string(), reason: format!("status {}", snapshot.status) });
            }
            Ok((request, snapshot))
        });
        let pairs = try_join_all(fetches).await?;

        statics.put_all(&pairs).await?;

        let precached: Vec<String> = pairs.iter().map(|(request, _)| request.url().to_string()).collect();
        tracing::info!(generation = statics.name(), count = precached.len(), "precache complete");

        Ok(InstallReport { generation: statics.name().to_string(), precached })
    }

    /// Purge stale generations and claim open clients.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating)?;

        match self.purge_stale().await {
            Ok(report) => {
                self.clients.claim().await;
                self.set_state(WorkerState::Activated);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "activate failed");
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn purge_stale(&self) -> Result<ActivateReport, Error> {
        let names = self.store.names().clone();
        let mut report = ActivateReport { deleted: Vec::new(), retained: Vec::new() };

        for name in self.store.list_names().await? {
            if names.is_current(&name) {
                report.retained.push(name);
                continue;
            }
            self.store.delete(&name).await?;
            tracing::info!(generation = %name, "deleted stale generation");
            report.deleted.push(name);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheDb, CacheNames, Snapshot, Storage};
    use crate::testing::StubNetwork;

    const OFFLINE: &str = "https://example.com/offline.html";

    struct Fixture {
        db: CacheDb,
        network: Arc<StubNetwork>,
        clients: Arc<ClientTracker>,
    }

    impl Fixture {
        async fn new() -> Self {
            Self {
                db: CacheDb::open_in_memory().await.unwrap(),
                network: Arc::new(StubNetwork::new()),
                clients: Arc::new(ClientTracker::default()),
            }
        }

        fn lifecycle(&self, version: &str, precache: &[&str]) -> Lifecycle {
            let store = VersionedStore::new(Arc::new(self.db.clone()), CacheNames::for_version(version));
            let precache = precache.iter().map(|u| Url::parse(u).unwrap()).collect();
            Lifecycle::new(store, self.network.clone(), self.clients.clone(), precache)
        }
    }

    #[tokio::test]
    async fn test_install_precaches_offline_page() {
        let fx = Fixture::new().await;
        fx.network.serve(OFFLINE, 200, "offline");
        let lifecycle = fx.lifecycle("v3", &[OFFLINE]);

        let report = lifecycle.install().await.unwrap();

        assert_eq!(report.generation, "static-v3");
        assert_eq!(lifecycle.state(), WorkerState::Installed);
        assert!(fx.clients.waiting_skipped());
        assert_eq!(fx.db.urls("static-v3").await.unwrap(), vec![OFFLINE.to_string()]);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let fx = Fixture::new().await;
        fx.network.serve(OFFLINE, 200, "offline");
        // app.css is not served, so it answers 404
        let lifecycle = fx.lifecycle("v3", &[OFFLINE, "https://example.com/app.css"]);

        let result = lifecycle.install().await;

        assert!(matches!(result, Err(Error::PrecacheFailed { url, .. }) if url.ends_with("app.css")));
        assert_eq!(lifecycle.state(), WorkerState::Redundant);
        assert!(!fx.clients.waiting_skipped());
        assert!(fx.db.urls("static-v3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_fails_offline_and_can_retry() {
        let fx = Fixture::new().await;
        fx.network.serve(OFFLINE, 200, "offline");
        fx.network.set_online(false);
        let lifecycle = fx.lifecycle("v3", &[OFFLINE]);

        assert!(lifecycle.install().await.is_err());
        assert!(matches!(lifecycle.activate().await, Err(Error::Lifecycle(_))));

        fx.network.set_online(true);
        lifecycle.install().await.unwrap();
        assert_eq!(lifecycle.state(), WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_activate_purges_previous_version() {
        let fx = Fixture::new().await;
        fx.network.serve(OFFLINE, 200, "offline");
        let old = Snapshot::new(OFFLINE, 200, "old offline");
        fx.db.put("static-v2", "k", &old).await.unwrap();
        fx.db.put("dynamic-v2", "k", &old).await.unwrap();
        fx.db.open_generation("dynamic-v3").await.unwrap();

        let lifecycle = fx.lifecycle("v3", &[OFFLINE]);
        lifecycle.install().await.unwrap();
        let report = lifecycle.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["dynamic-v2".to_string(), "static-v2".to_string()]);
        assert_eq!(report.retained, vec!["dynamic-v3".to_string(), "static-v3".to_string()]);
        assert_eq!(fx.db.list_names().await.unwrap(), vec!["dynamic-v3".to_string(), "static-v3".to_string()]);
        assert!(fx.clients.controlled());
        assert_eq!(lifecycle.state(), WorkerState::Activated);
        assert!(lifecycle.state().can_intercept_fetch());
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let fx = Fixture::new().await;
        let lifecycle = fx.lifecycle("v3", &[OFFLINE]);

        assert!(matches!(lifecycle.activate().await, Err(Error::Lifecycle(_))));
        assert_eq!(lifecycle.state(), WorkerState::Parsed);
        assert!(!fx.clients.controlled());
    }

    #[tokio::test]
    async fn test_failed_install_keeps_previous_generations() {
        let fx = Fixture::new().await;
        fx.db
            .put("static-v2", "k", &Snapshot::new(OFFLINE, 200, "old"))
            .await
            .unwrap();
        fx.network.set_online(false);

        let lifecycle = fx.lifecycle("v3", &[OFFLINE]);
        assert!(lifecycle.install().await.is_err());

        assert!(fx.db.list_names().await.unwrap().contains(&"static-v2".to_string()));
    }
}
