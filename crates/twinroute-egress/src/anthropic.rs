//! Anthropic-format upstream connector

use crate::{
    client::{HttpClientConfig, byte_stream, create_client, endpoint, ensure_success, read_json},
    EgressError,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, header};
use serde_json::Value;
use tracing::{debug, instrument};
use twinroute_core::{
    ApiFormat,
    anthropic::API_VERSION,
    provider::{ByteStream, Upstream},
};

/// Anthropic connector configuration
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key sent as `x-api-key`; empty disables the header
    pub api_key: String,

    /// Base URL including the version segment (default: https://api.anthropic.com/v1)
    pub base_url: String,

    /// Anthropic API version (default: 2023-06-01)
    pub api_version: String,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,
}

impl AnthropicConfig {
    /// Create a new Anthropic configuration
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            api_version: API_VERSION.to_string(),
            client_config: HttpClientConfig::default(),
        }
    }

    /// Set the base URL (for custom endpoints)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the API version
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_client_config(mut self, client_config: HttpClientConfig) -> Self {
        self.client_config = client_config;
        self
    }
}

/// Client for `POST {base}/messages`
pub struct AnthropicUpstream {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicUpstream {
    /// Create a new Anthropic connector
    pub fn new(config: AnthropicConfig) -> crate::Result<Self> {
        let client = create_client(&config.client_config)?;
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn request(&self, body: &Value) -> RequestBuilder {
        let builder = self
            .client
            .post(endpoint(&self.config.base_url, "messages"))
            .header(header::CONTENT_TYPE, "application/json")
            .header("anthropic-version", &self.config.api_version);

        let builder = if self.config.api_key.is_empty() {
            builder
        } else {
            builder.header("x-api-key", &self.config.api_key)
        };

        builder.json(body)
    }
}

fn set_stream_flag(body: &mut Value, stream: bool) {
    if let Some(object) = body.as_object_mut() {
        if stream {
            object.insert("stream".to_string(), Value::Bool(true));
        } else {
            object.remove("stream");
        }
    }
}

#[async_trait]
impl Upstream for AnthropicUpstream {
    fn format(&self) -> ApiFormat {
        ApiFormat::Anthropic
    }

    #[instrument(skip(self, body), fields(base_url = %self.config.base_url))]
    async fn send(&self, mut body: Value) -> twinroute_core::Result<Value> {
        set_stream_flag(&mut body, false);
        debug!("Sending messages request");

        let response = self
            .config
            .client_config
            .bounded(self.request(&body))
            .send()
            .await
            .map_err(EgressError::from)?;

        Ok(read_json(response).await?)
    }

    #[instrument(skip(self, body), fields(base_url = %self.config.base_url))]
    async fn stream(&self, mut body: Value) -> twinroute_core::Result<ByteStream> {
        set_stream_flag(&mut body, true);
        debug!("Sending streaming messages request");

        let response = self
            .request(&body)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(EgressError::from)?;

        let response = ensure_success(response).await?;
        Ok(byte_stream(response))
    }
}
