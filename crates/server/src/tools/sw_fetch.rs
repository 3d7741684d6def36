//! sw_fetch tool implementation.
//!
//! Delivers one intercepted request to the worker and returns whatever the
//! selected strategy answered with.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use offgrid_core::{Destination, Error, Method, Request, Source, Strategy, Worker};

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL being requested.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Declared resource type: document, script, style, image, font, ...
    /// Empty or absent for plain fetch()/XHR requests.
    #[serde(default)]
    pub destination: Option<String>,

    /// Accept header sent by the page.
    #[serde(default)]
    pub accept: Option<String>,

    /// Any other request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub status: u16,
    /// Strategy the request was classified into.
    pub strategy: Strategy,
    /// Whether the answer came from the cache, the network or the offline page.
    pub source: Source,
    pub content_type: Option<String>,
    pub fetched_at: String,
    pub headers: BTreeMap<String, String>,
    /// Body as text. Empty when the body is not valid UTF-8.
    pub body: String,
    /// Standard base64 of the body, present only when it is not valid UTF-8.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_base64: Option<String>,
    pub body_bytes: usize,
}

impl SwFetchParams {
    fn into_request(self) -> Result<Request, Error> {
        let method = self.method.as_deref().map(str::parse::<Method>).transpose()?.unwrap_or(Method::Get);
        let destination = self
            .destination
            .as_deref()
            .map(str::parse::<Destination>)
            .transpose()?
            .unwrap_or(Destination::Empty);

        let mut request = Request::new(method, &self.url)?.with_destination(destination);
        for (name, value) in self.headers {
            request = request.with_header(&name, value);
        }
        if let Some(accept) = self.accept {
            request = request.with_header("accept", accept);
        }
        Ok(request)
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = params.into_request()?;
    let served = worker.fetch(&request).await?;
    let snapshot = served.snapshot;

    let (body, body_base64) = match std::str::from_utf8(&snapshot.body) {
        Ok(text) => (text.to_string(), None),
        Err(_) => (String::new(), Some(BASE64.encode(&snapshot.body))),
    };

    let output = SwFetchOutput {
        url: snapshot.url.clone(),
        status: snapshot.status,
        strategy: served.strategy,
        source: served.source,
        content_type: snapshot.content_type.clone(),
        fetched_at: snapshot.fetched_at.clone(),
        body,
        body_base64,
        body_bytes: snapshot.body.len(),
        headers: snapshot.headers,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
