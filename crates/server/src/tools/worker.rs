//! Worker lifecycle tools: worker_status, worker_install, worker_activate.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use offgrid_core::{Error, Worker, WorkerState};

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    pub state: WorkerState,
    pub static_generation: String,
    pub dynamic_generation: String,
    /// Every generation present in storage, current or not.
    pub generations: Vec<String>,
    /// Background refreshes still in flight.
    pub pending_refreshes: usize,
}

fn to_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Implementation of the worker_status tool.
pub async fn status_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let output = WorkerStatusOutput {
        state: worker.state(),
        static_generation: worker.names().static_name().to_string(),
        dynamic_generation: worker.names().dynamic_name().to_string(),
        generations: worker.store().list_names().await?,
        pending_refreshes: worker.pending_refreshes(),
    };
    to_result(&output)
}

/// Implementation of the worker_install tool.
pub async fn install_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    to_result(&report)
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    to_result(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{active_worker, idle_worker, output_text};
    use offgrid_core::lifecycle::{ActivateReport, InstallReport};

    #[tokio::test]
    async fn test_status_of_active_worker() {
        let (worker, _network) = active_worker().await;

        let output: WorkerStatusOutput = serde_json::from_str(&output_text(status_impl(&worker).await.unwrap())).unwrap();

        assert_eq!(output.state, WorkerState::Activated);
        assert_eq!(output.static_generation, "static-v3");
        assert_eq!(output.dynamic_generation, "dynamic-v3");
        assert!(output.generations.contains(&"static-v3".to_string()));
    }

    #[tokio::test]
    async fn test_install_then_activate() {
        let (worker, _network) = idle_worker().await;

        let installed: InstallReport =
            serde_json::from_str(&output_text(install_impl(&worker).await.unwrap())).unwrap();
        assert_eq!(installed.precached.len(), 1);

        let activated: ActivateReport =
            serde_json::from_str(&output_text(activate_impl(&worker).await.unwrap())).unwrap();
        assert!(activated.deleted.is_empty());
        assert_eq!(worker.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_before_install_fails() {
        let (worker, _network) = idle_worker().await;
        let err = activate_impl(&worker).await.unwrap_err();
        assert_eq!(err.code.0, -32015);
    }

    #[tokio::test]
    async fn test_install_offline_fails() {
        let (worker, network) = idle_worker().await;
        network.set_online(false);

        let err = install_impl(&worker).await.unwrap_err();

        assert_eq!(err.code.0, -32013);
        assert_eq!(worker.state(), WorkerState::Redundant);
    }
}
