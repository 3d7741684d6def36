//! HTTP network substrate.
//!
//! [`FetchClient`] performs the real network I/O for the worker:
//!
//! - Any HTTP status is a response; only transport failures are errors
//! - Request headers from the page are forwarded as-is
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable), enforced while streaming
//! - Timeouts are a property of this client, not of the strategies

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::{Client, header};

use offgrid_core::{AppConfig, Error, Method, Network, Request, Snapshot};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offgrid/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offgrid/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

/// Whether a declared content length is over `max`. Lengths that do not fit
/// in `usize` always are.
fn exceeds(len: u64, max: usize) -> bool {
    usize::try_from(len).map_or(true, |len| len > max)
}

/// HTTP client implementing [`Network`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Snapshot, Error> {
        let start = Instant::now();
        let url = request.url().as_str();

        let mut builder = self.http.request(to_reqwest_method(request.method()), url);
        for (name, value) in request.headers() {
            if name != "host" {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        let mut response = builder.send().await.map_err(|e| transport_error(url, &e))?;

        if let Some(len) = response.content_length()
            && exceeds(len, self.config.max_bytes)
        {
            return Err(Error::FetchTooLarge(format!("{url}: {len} bytes exceeds {}", self.config.max_bytes)));
        }

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(url, &e))? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(Error::FetchTooLarge(format!("{url}: body exceeds {}", self.config.max_bytes)));
            }
            body.extend_from_slice(&chunk);
        }

        let mut snapshot = Snapshot::new(url, status, body.freeze().to_vec());
        for (name, value) in &headers {
            if let Ok(value) = value.to_str() {
                snapshot = snapshot.with_header(name.as_str(), value);
            }
        }
        if snapshot.content_type.is_none() {
            snapshot.content_type = headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
        }

        tracing::debug!(
            url,
            status,
            bytes = snapshot.body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(snapshot)
    }
}
