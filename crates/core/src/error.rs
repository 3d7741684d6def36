//! Unified error types for offgrid.
//!
//! Every message carries a stable code prefix so callers on the far side of
//! the MCP boundary can match on it without parsing prose.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

use crate::config::ConfigError;

/// Unified error types for the offgrid worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or non-absolute URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No entry stored under the requested key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Connectivity loss or transport failure.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A precache asset could not be fetched during install.
    #[error("PRECACHE_FAILED: {url}: {reason}")]
    PrecacheFailed { url: String, reason: String },

    /// Network, dynamic cache and offline resource all came up empty.
    #[error("OFFLINE_FALLBACK_MISSING: {0}")]
    OfflineFallbackMissing(String),

    /// Lifecycle transition not allowed from the current state.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),

    /// Configuration could not be turned into a worker.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    /// A spawned fetch task panicked or was cancelled.
    #[error("TASK_FAILED: {0}")]
    TaskFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) | Error::Config(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::CacheMiss(_) => -32001,
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => -32002,
            Error::Network(_) => -32008,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::PrecacheFailed { .. } => -32013,
            Error::OfflineFallbackMissing(_) => -32014,
            Error::Lifecycle(_) => -32015,
            Error::TaskFailed(_) => -32000,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("abc123".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn test_precache_error_names_url() {
        let err = Error::PrecacheFailed { url: "https://example.com/offline.html".into(), reason: "status 404".into() };
        let msg = err.to_string();
        assert!(msg.starts_with("PRECACHE_FAILED"));
        assert!(msg.contains("offline.html"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let mcp_err: McpError = Error::CacheMiss("abc123".to_string()).into();
        assert_eq!(mcp_err.code.0, -32001);

        let mcp_err: McpError = Error::Lifecycle("not active".to_string()).into();
        assert_eq!(mcp_err.code.0, -32015);
        assert!(mcp_err.message.contains("LIFECYCLE_ERROR"));
    }
}
