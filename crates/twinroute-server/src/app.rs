//! Assembling the gateway from configuration

use crate::{
    config::{ConfigError, ModelConfig, ServerConfig},
    recorder::JsonlRecorder,
};
use axum::Router;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use twinroute_core::{ApiFormat, provider::Upstream};
use twinroute_egress::{
    EgressError,
    anthropic::{AnthropicConfig, AnthropicUpstream},
    client::HttpClientConfig,
    openai::{OpenAIConfig, OpenAIUpstream},
};
use twinroute_ingress::{AppState, SkillSet};
use twinroute_observability::{HealthState, Metrics, health_router};
use twinroute_routing::{ModelRoute, Orchestrator};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create upstream client: {0}")]
    Egress(#[from] EgressError),

    #[error("Failed to register metrics: {0}")]
    Metrics(String),
}

/// HTTP client for one route, speaking the route's configured protocol
pub fn build_upstream(
    model: &ModelConfig,
    client_config: &HttpClientConfig,
) -> Result<Arc<dyn Upstream>, EgressError> {
    let upstream: Arc<dyn Upstream> = match model.api_format {
        ApiFormat::OpenAI => Arc::new(OpenAIUpstream::new(
            OpenAIConfig::new(model.api_key.clone())
                .with_base_url(model.base_url.clone())
                .with_client_config(client_config.clone()),
        )?),
        ApiFormat::Anthropic => Arc::new(AnthropicUpstream::new(
            AnthropicConfig::new(model.api_key.clone())
                .with_base_url(model.base_url.clone())
                .with_client_config(client_config.clone()),
        )?),
    };
    Ok(upstream)
}

fn build_route(
    model: &ModelConfig,
    client_config: &HttpClientConfig,
) -> Result<ModelRoute, EgressError> {
    let upstream = build_upstream(model, client_config)?;
    Ok(ModelRoute::new(
        model.route_name(),
        model.model_id.clone(),
        upstream,
    ))
}

/// Build the full router: both listeners, health, metrics and HTTP layers
pub fn build_app(config: &ServerConfig) -> Result<Router, BuildError> {
    config.validate()?;

    let client_config = config.http.client_config();
    let chat = build_route(&config.chat_model, &client_config)?;
    let work = build_route(&config.work_model, &client_config)?;

    info!(
        "Chat route '{}' -> {} ({}, {})",
        chat.name, chat.model_id, chat.format(), config.chat_model.base_url
    );
    info!(
        "Work route '{}' -> {} ({}, {})",
        work.name, work.model_id, work.format(), config.work_model.base_url
    );
    if config.preprocess_enabled {
        info!("Preprocessing enabled: work-bound requests are pre-checked by the chat route");
    }

    let orchestrator = Orchestrator::new(chat, work)
        .with_preprocessing(config.preprocess_enabled)
        .with_preprocess_instruction(config.preprocess_instruction.clone());

    let metrics = Arc::new(Metrics::new().map_err(|e| BuildError::Metrics(e.to_string()))?);

    let mut state = AppState::new(Arc::new(orchestrator), metrics.clone())
        .with_skills(SkillSet::load(&config.skill_dirs));

    if let Some(recorder) = JsonlRecorder::new(
        config.logging.prompt_log_path(),
        config.logging.response_log_path(),
    ) {
        if let Some(path) = recorder.prompt_path() {
            info!("Recording prompts to {}", path.display());
        }
        if let Some(path) = recorder.response_path() {
            info!("Recording responses to {}", path.display());
        }
        state = state.with_recorder(Arc::new(recorder));
    }

    Ok(twinroute_ingress::router(state)
        .merge(health_router(HealthState::new(metrics)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
