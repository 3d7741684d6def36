//! cache_get tool implementation.
//!
//! Looks up the stored response for a URL. Without an explicit generation the
//! dynamic generation is searched first, then the static one.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use offgrid_core::{Error, Request, Snapshot, Worker};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL of the cached GET request.
    pub url: String,

    /// Generation to search (e.g. "static-v3"). Defaults to the current ones.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// Generation the entry was found in.
    pub generation: String,
    /// The cached snapshot.
    pub snapshot: Snapshot,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &Worker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let request = Request::get(&params.url)?;
    let key = request.cache_key();
    let storage = worker.store().storage();

    let names = match params.generation {
        Some(name) => vec![name],
        None => vec![worker.names().dynamic_name().to_string(), worker.names().static_name().to_string()],
    };

    let mut found = None;
    for name in names {
        if let Some(snapshot) = storage.get(&name, &key).await? {
            found = Some(CacheGetOutput { generation: name, snapshot });
            break;
        }
    }
    let output = found.ok_or_else(|| Error::CacheMiss(request.url().to_string()))?;

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize snapshot: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{OFFLINE, active_worker, output_text};

    #[tokio::test]
    async fn test_get_impl_missing() {
        let (worker, _network) = active_worker().await;
        let params = CacheGetParams { url: "https://example.com/nothing".to_string(), generation: None };

        let err = get_impl(&worker, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_finds_precached_offline_page() {
        let (worker, _network) = active_worker().await;
        let params = CacheGetParams { url: OFFLINE.to_string(), generation: None };

        let result = get_impl(&worker, params).await.unwrap();
        let output: CacheGetOutput = serde_json::from_str(&output_text(result)).unwrap();

        assert_eq!(output.generation, "static-v3");
        assert_eq!(output.snapshot.body_text(), "<h1>offline</h1>");
    }

    #[tokio::test]
    async fn test_get_impl_explicit_generation() {
        let (worker, _network) = active_worker().await;
        let params = CacheGetParams { url: OFFLINE.to_string(), generation: Some("dynamic-v3".to_string()) };

        assert!(get_impl(&worker, params).await.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_relative_url() {
        let (worker, _network) = active_worker().await;
        let params = CacheGetParams { url: "/offline.html".to_string(), generation: None };

        let err = get_impl(&worker, params).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }
}
