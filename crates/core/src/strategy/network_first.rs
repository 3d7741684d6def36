//! Network-first: the network is authoritative. A successful fetch
//! overwrites the stored copy before it is returned. When the fetch fails
//! for any reason the stored copy is served, and failing that the offline
//! page from the static generation.

use super::{Served, Source, capture};
use crate::Error;
use crate::cache::{Generation, Role, Snapshot, VersionedStore};
use crate::classify::Strategy;
use crate::network::Network;
use crate::request::Request;

/// The precached offline page.
#[derive(Clone)]
pub struct OfflineFallback {
    store: VersionedStore,
    request: Request,
}

impl OfflineFallback {
    pub fn new(store: VersionedStore, request: Request) -> Self {
        Self { store, request }
    }

    pub fn url(&self) -> &url::Url {
        self.request.url()
    }

    /// Read the offline page from the static generation.
    pub async fn resolve(&self) -> Result<Option<Snapshot>, Error> {
        let statics = self.store.open(Role::Static).await?;
        statics.match_request(&self.request).await
    }
}

pub async fn network_first(
    dynamic: &Generation, network: &dyn Network, request: &Request, offline: &OfflineFallback,
) -> Result<Served, Error> {
    let error = match network.fetch(request).await {
        Ok(fresh) => {
            capture(dynamic, request, &fresh).await;
            return Ok(Served::new(Strategy::NetworkFirst, Source::Network, fresh));
        }
        Err(e) => e,
    };

    tracing::debug!(url = %request.url(), error = %error, "network failed, falling back to cache");

    if let Some(cached) = dynamic.match_request(request).await? {
        return Ok(Served::new(Strategy::NetworkFirst, Source::Cache, cached));
    }

    match offline.resolve().await? {
        Some(page) => {
            tracing::debug!(url = %request.url(), offline_url = %offline.url(), "serving offline page");
            Ok(Served::new(Strategy::NetworkFirst, Source::OfflineFallback, page))
        }
        None => Err(Error::OfflineFallbackMissing(format!(
            "{} unavailable and {} not precached ({error})",
            request.url(),
            offline.url()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::{CacheDb, CacheNames};
    use crate::testing::StubNetwork;

    const PAGE: &str = "https://example.com/page.html";
    const OFFLINE: &str = "https://example.com/offline.html";

    async fn setup() -> (Generation, OfflineFallback) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = VersionedStore::new(Arc::new(db), CacheNames::for_version("v3"));
        let dynamic = store.open(Role::Dynamic).await.unwrap();
        let offline = OfflineFallback::new(store, Request::get(OFFLINE).unwrap());
        (dynamic, offline)
    }

    async fn precache_offline(offline: &OfflineFallback) {
        let statics = offline.store.open(Role::Static).await.unwrap();
        statics
            .put(&offline.request, &Snapshot::new(OFFLINE, 200, "you are offline"))
            .await
            .unwrap();
    }

    fn page() -> Request {
        Request::get(PAGE).unwrap().with_header("accept", "text/html")
    }

    #[tokio::test]
    async fn test_success_updates_cache_before_returning() {
        let (dynamic, offline) = setup().await;
        let network = StubNetwork::new();
        dynamic.put(&page(), &Snapshot::new(PAGE, 200, "stale")).await.unwrap();
        network.serve(PAGE, 200, "fresh");

        let served = network_first(&dynamic, &network, &page(), &offline).await.unwrap();

        assert_eq!(served.source, Source::Network);
        assert_eq!(served.snapshot.body, b"fresh");
        let stored = dynamic.match_request(&page()).await.unwrap().unwrap();
        assert_eq!(stored.body, b"fresh");
    }

    #[tokio::test]
    async fn test_failure_serves_cached_copy() {
        let (dynamic, offline) = setup().await;
        precache_offline(&offline).await;
        let network = StubNetwork::new();
        network.serve(PAGE, 200, "v1");
        network_first(&dynamic, &network, &page(), &offline).await.unwrap();

        network.set_online(false);
        let served = network_first(&dynamic, &network, &page(), &offline).await.unwrap();

        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.snapshot.body, b"v1");
    }

    #[tokio::test]
    async fn test_offline_without_cache_serves_offline_page() {
        let (dynamic, offline) = setup().await;
        precache_offline(&offline).await;
        let network = StubNetwork::new();
        network.set_online(false);

        let served = network_first(&dynamic, &network, &page(), &offline).await.unwrap();

        assert_eq!(served.source, Source::OfflineFallback);
        assert_eq!(served.snapshot.body_text(), "you are offline");
    }

    #[tokio::test]
    async fn test_offline_page_missing_is_an_error() {
        let (dynamic, offline) = setup().await;
        let network = StubNetwork::new();
        network.set_online(false);

        let result = network_first(&dynamic, &network, &page(), &offline).await;

        assert!(matches!(result, Err(Error::OfflineFallbackMissing(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_authoritative() {
        let (dynamic, offline) = setup().await;
        let network = StubNetwork::new();
        dynamic.put(&page(), &Snapshot::new(PAGE, 200, "good")).await.unwrap();
        network.serve(PAGE, 500, "boom");

        let served = network_first(&dynamic, &network, &page(), &offline).await.unwrap();

        assert_eq!(served.source, Source::Network);
        assert_eq!(served.snapshot.status, 500);
        assert_eq!(dynamic.match_request(&page()).await.unwrap().unwrap().status, 500);
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_cache_then_offline_page() {
        let (dynamic, offline) = setup().await;
        precache_offline(&offline).await;
        let network = StubNetwork::new();
        network.time_out(PAGE);

        let served = network_first(&dynamic, &network, &page(), &offline).await.unwrap();
        assert_eq!(served.source, Source::OfflineFallback);
        assert_eq!(served.snapshot.body_text(), "you are offline");

        dynamic.put(&page(), &Snapshot::new(PAGE, 200, "earlier")).await.unwrap();
        let served = network_first(&dynamic, &network, &page(), &offline).await.unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.snapshot.body, b"earlier");
        assert_eq!(network.calls(PAGE), 2);
    }
}
