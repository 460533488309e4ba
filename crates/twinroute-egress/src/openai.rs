//! OpenAI-format upstream connector

use crate::{
    client::{HttpClientConfig, byte_stream, create_client, endpoint, ensure_success, read_json},
    vendor::{apply_reasoning_patch, requires_reasoning_patch},
    EgressError,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, header};
use serde_json::Value;
use tracing::{debug, instrument};
use twinroute_core::{
    ApiFormat,
    provider::{ByteStream, Upstream},
};

/// OpenAI connector configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key sent as a bearer token; empty disables the header
    pub api_key: String,

    /// Base URL including the version segment (default: https://api.openai.com/v1)
    pub base_url: String,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,
}

impl OpenAIConfig {
    /// Create a new OpenAI configuration
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            client_config: HttpClientConfig::default(),
        }
    }

    /// Set the base URL (for compatible endpoints)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_client_config(mut self, client_config: HttpClientConfig) -> Self {
        self.client_config = client_config;
        self
    }
}

/// Client for `POST {base}/chat/completions`
pub struct OpenAIUpstream {
    config: OpenAIConfig,
    client: Client,
    reasoning_patch: bool,
}

impl OpenAIUpstream {
    /// Create a new OpenAI connector
    pub fn new(config: OpenAIConfig) -> crate::Result<Self> {
        let client = create_client(&config.client_config)?;
        let reasoning_patch = requires_reasoning_patch(&config.base_url);
        if reasoning_patch {
            debug!(base_url = %config.base_url, "Enabling reasoning_content patch for upstream");
        }
        Ok(Self {
            config,
            client,
            reasoning_patch,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn request(&self, body: &Value) -> RequestBuilder {
        let builder = self
            .client
            .post(endpoint(&self.config.base_url, "chat/completions"))
            .header(header::CONTENT_TYPE, "application/json");

        let builder = if self.config.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.config.api_key)
        };

        builder.json(body)
    }

    /// Set the stream flag and apply vendor quirks; always the last mutation
    fn finalize_body(&self, body: &mut Value, stream: bool) {
        if let Some(object) = body.as_object_mut() {
            if stream {
                object.insert("stream".to_string(), Value::Bool(true));
            } else {
                object.remove("stream");
                object.remove("stream_options");
            }
        }
        if self.reasoning_patch {
            apply_reasoning_patch(body);
        }
    }
}

#[async_trait]
impl Upstream for OpenAIUpstream {
    fn format(&self) -> ApiFormat {
        ApiFormat::OpenAI
    }

    #[instrument(skip(self, body), fields(base_url = %self.config.base_url))]
    async fn send(&self, mut body: Value) -> twinroute_core::Result<Value> {
        self.finalize_body(&mut body, false);
        debug!("Sending chat completion request");

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
        self.finalize_body(&mut body, true);
        debug!("Sending streaming chat completion request");

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
