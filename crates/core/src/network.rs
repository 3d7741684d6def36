//! Network substrate.

use async_trait::async_trait;

use crate::Error;
use crate::cache::Snapshot;
use crate::request::Request;

/// Performs the actual network I/O for a request.
///
/// Any HTTP status is a response. Implementations return `Err` only when no
/// response was obtained: connectivity loss, timeout, or a body over the
/// configured size limit.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Snapshot, Error>;
}
