//! Shared handler state

use crate::{skills::SkillSet, types::IngressResult};
use axum::response::Response;
use std::{sync::Arc, time::Instant};
use tracing::{debug, warn};
use twinroute_core::{
    ApiFormat,
    openai::{ChatMessage, ChatResponse},
    recorder::ExchangeRecorder,
};
use twinroute_observability::Metrics;
use twinroute_routing::{Orchestrator, RouteKind};

/// Everything the inbound handlers need; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub skills: Arc<SkillSet>,
    pub metrics: Arc<Metrics>,
    pub recorder: Option<Arc<dyn ExchangeRecorder>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, metrics: Arc<Metrics>) -> Self {
        Self {
            orchestrator,
            skills: Arc::new(SkillSet::default()),
            metrics,
            recorder: None,
        }
    }

    pub fn with_skills(mut self, skills: SkillSet) -> Self {
        self.skills = Arc::new(skills);
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn ExchangeRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Hand the message list to the recorder without waiting on it
    pub fn record_prompt(&self, messages: &[ChatMessage]) {
        let Some(recorder) = self.recorder.clone() else {
            return;
        };
        let messages = messages.to_vec();
        tokio::spawn(async move {
            if let Err(e) = recorder.record_prompt(&messages).await {
                warn!("Failed to record prompt: {}", e);
            }
        });
    }

    /// Hand the completion to the recorder without waiting on it
    pub fn record_response(&self, response: &ChatResponse) {
        let Some(recorder) = self.recorder.clone() else {
            return;
        };
        let response = response.clone();
        tokio::spawn(async move {
            if let Err(e) = recorder.record_response(&response).await {
                warn!("Failed to record response: {}", e);
            }
        });
    }

    /// Record request metrics for a finished handler and render its error,
    /// if any, in the listener's error shape.
    pub fn finish(
        &self,
        listener: ApiFormat,
        route: RouteKind,
        started: Instant,
        result: IngressResult<Response>,
    ) -> Response {
        self.metrics.record_request(
            listener.as_str(),
            route.as_str(),
            started.elapsed().as_secs_f64(),
        );

        match result {
            Ok(response) => {
                debug!(listener = %listener, route = %route, status = %response.status(), "Request complete");
                response
            }
            Err(err) => {
                warn!(listener = %listener, route = %route, "Request failed: {}", err);
                if let Some(status) = err.upstream_status() {
                    self.metrics.record_upstream_error(route.as_str(), status);
                }
                err.into_response_for(listener)
            }
        }
    }
}
