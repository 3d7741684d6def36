//! cache_list tool implementation.
//!
//! Lists every generation in storage with the URLs it holds.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use offgrid_core::{Error, Worker};

/// One generation in the listing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationEntry {
    pub name: String,
    /// Whether the generation belongs to the running version.
    pub current: bool,
    pub urls: Vec<String>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub generations: Vec<GenerationEntry>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let store = worker.store();
    let mut generations = Vec::new();
    for name in store.list_names().await? {
        let urls = store.storage().urls(&name).await?;
        let current = store.names().is_current(&name);
        generations.push(GenerationEntry { name, current, urls });
    }

    let output = CacheListOutput { generations };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
