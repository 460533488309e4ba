//! Shared HTTP client utilities

use crate::{EgressError, Result};
use futures::StreamExt;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;
use twinroute_core::provider::ByteStream;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Whole-request timeout for non-streaming calls.
    ///
    /// Never applied to streaming calls: a generation may legitimately keep
    /// the connection open for many minutes.
    pub request_timeout_secs: Option<u64>,

    /// Maximum number of idle connections per host
    pub pool_max_idle_per_host: usize,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: Some(600),
            pool_max_idle_per_host: 32,
            user_agent: format!("twinroute/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Apply the non-streaming timeout to a request, if one is configured
    pub(crate) fn bounded(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.request_timeout_secs {
            Some(secs) if secs > 0 => builder.timeout(Duration::from_secs(secs)),
            _ => builder,
        }
    }
}

/// Create a configured HTTP client with connection pooling.
///
/// The client itself carries no overall timeout; see [`HttpClientConfig::request_timeout_secs`].
pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        // Expire idle connections before upstream servers close them
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| EgressError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Join a base URL and an endpoint path without doubling slashes
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Fail with the upstream status and full body when the status is >= 400
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return Ok(response);
    }

    let status_code = status.as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error body".to_string());
    debug!(status = status_code, "Upstream returned error status");

    Err(EgressError::ProviderError {
        status_code,
        message,
    })
}

/// Check the status and decode a JSON body
pub(crate) async fn read_json(response: Response) -> Result<serde_json::Value> {
    let response = ensure_success(response).await?;
    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| EgressError::ParseError(format!("Failed to parse upstream response: {}", e)))
}

/// Expose a successful response body as a raw byte stream
pub(crate) fn byte_stream(response: Response) -> ByteStream {
    Box::pin(
        response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| twinroute_core::Error::Stream(e.to_string()))),
    )
}
