//! Stored response snapshots.
//!
//! A snapshot is the immutable capture of a response at the moment it came
//! off the network. Generations hold snapshots; re-capturing a request
//! replaces the previous snapshot wholesale.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A captured response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Snapshot {
    /// Canonical URL the response was fetched for.
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// Response headers, names lowercased.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    /// RFC 3339 timestamp of the fetch.
    pub fetched_at: String,
}

impl Snapshot {
    /// Capture a response fetched just now.
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            content_type: None,
            headers: BTreeMap::new(),
            body: body.into(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Add a header. `content-type` also fills [`Snapshot::content_type`].
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == "content-type" {
            self.content_type = Some(value.clone());
        }
        self.headers.insert(name, value);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether a generation may hold this response. Partial content and
    /// `Vary: *` responses are never stored.
    pub fn is_storable(&self) -> bool {
        self.status != 206 && self.header("vary").is_none_or(|v| v.trim() != "*")
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
