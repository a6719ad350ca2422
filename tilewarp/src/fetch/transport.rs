//! HTTP transport seam.
//!
//! The fetcher talks to the network only through [`HttpTransport`], so tests
//! can substitute canned responses and count requests.

use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::error::TileError;

/// User-Agent sent when the caller supplies none. Some tile servers reject
/// requests without one.
const DEFAULT_USER_AGENT: &str = concat!("tilewarp/", env!("CARGO_PKG_VERSION"));

/// One GET request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub referrer: Option<String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }
}

/// Asynchronous GET returning the full response body.
///
/// Implementations must map a non-success status to [`TileError::Network`].
pub trait HttpTransport: Send + Sync + 'static {
    fn get(&self, request: &FetchRequest) -> impl Future<Output = Result<Bytes, TileError>> + Send;
}

impl<T: HttpTransport> HttpTransport for Arc<T> {
    fn get(&self, request: &FetchRequest) -> impl Future<Output = Result<Bytes, TileError>> + Send {
        (**self).get(request)
    }
}

/// Transport backed by a pooled `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TileError> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| TileError::Inner(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: &FetchRequest) -> Result<Bytes, TileError> {
        let url = request.url.as_str();
        trace!(url, "HTTP GET request starting");

        let mut builder = self.client.get(url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(referrer) = &request.referrer {
            builder = builder.header(reqwest::header::REFERER, referrer.as_str());
        }

        let response = match builder.send().await {
            Ok(resp) => {
                debug!(url, status = resp.status().as_u16(), "HTTP response received");
                resp
            }
            Err(e) => {
                warn!(
                    url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(TileError::network(url, format!("request failed: {}", e)));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "HTTP error status");
            return Err(TileError::network(url, format!("HTTP {}", status)));
        }

        response
            .bytes()
            .await
            .map_err(|e| TileError::network(url, format!("failed to read response: {}", e)))
    }
}
