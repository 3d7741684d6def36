//! cache_delete tool implementation.
//!
//! Drops a stale generation and everything in it. The running version's own
//! generations are refused; activate is what retires them.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use offgrid_core::{Error, Worker};

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Generation name, e.g. "dynamic-v2".
    pub name: String,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    /// False when no such generation existed.
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(worker: &Worker, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    let name = params.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("name cannot be empty".to_string()).into());
    }
    if worker.names().is_current(name) {
        return Err(Error::InvalidInput(format!("{name} belongs to the running version")).into());
    }

    let deleted = worker.store().delete(name).await?;
    tracing::info!(generation = name, deleted, "cache_delete");

    let output = CacheDeleteOutput { deleted };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{active_worker, output_text};
    use offgrid_core::Snapshot;

    #[tokio::test]
    async fn test_delete_stale_generation() {
        let (worker, _network) = active_worker().await;
        let snapshot = Snapshot::new("https://example.com/", 200, "old");
        worker.store().storage().put("dynamic-v2", "k", &snapshot).await.unwrap();

        let result = delete_impl(&worker, CacheDeleteParams { name: "dynamic-v2".to_string() }).await.unwrap();
        let output: CacheDeleteOutput = serde_json::from_str(&output_text(result)).unwrap();

        assert!(output.deleted);
        assert!(!worker.store().list_names().await.unwrap().contains(&"dynamic-v2".to_string()));
    }

    #[tokio::test]
    async fn test_delete_unknown_generation() {
        let (worker, _network) = active_worker().await;

        let result = delete_impl(&worker, CacheDeleteParams { name: "static-v1".to_string() }).await.unwrap();
        let output: CacheDeleteOutput = serde_json::from_str(&output_text(result)).unwrap();

        assert!(!output.deleted);
    }

    #[tokio::test]
    async fn test_delete_current_generation_refused() {
        let (worker, _network) = active_worker().await;

        let err = delete_impl(&worker, CacheDeleteParams { name: "static-v3".to_string() }).await.unwrap_err();

        assert_eq!(err.code.0, -32602);
        assert!(worker.store().list_names().await.unwrap().contains(&"static-v3".to_string()));
    }
}
