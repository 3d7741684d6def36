//! MCP tool implementations.
//!
//! This module contains all tools exposed by the offgrid server. The host
//! delivers lifecycle and fetch events through them.

pub mod cache;
pub mod sw_fetch;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use offgrid_core::testing::StubNetwork;
    use offgrid_core::{AppConfig, CacheDb, ClientTracker, Worker};
    use rmcp::model::CallToolResult;

    pub const OFFLINE: &str = "https://example.com/offline.html";

    /// A worker for version v3 that has not been installed yet.
    pub async fn idle_worker() -> (Arc<Worker>, Arc<StubNetwork>) {
        let network = Arc::new(StubNetwork::new());
        network.serve(OFFLINE, 200, "<h1>offline</h1>");

        let config = AppConfig { offline_url: OFFLINE.into(), ..Default::default() };
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker =
            Worker::from_config(&config, Arc::new(db), network.clone(), Arc::new(ClientTracker::default())).unwrap();
        (Arc::new(worker), network)
    }

    /// A worker that has been installed and activated.
    pub async fn active_worker() -> (Arc<Worker>, Arc<StubNetwork>) {
        let (worker, network) = idle_worker().await;
        worker.boot().await.unwrap();
        (worker, network)
    }

    pub fn output_text(result: CallToolResult) -> String {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        content.get("text").and_then(|t| t.as_str()).unwrap().to_string()
    }
}
