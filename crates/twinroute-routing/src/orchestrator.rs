//! Route selection and dispatch

use crate::{
    dispatch::{Dispatch, NativeDispatch, StreamEnvelope},
    route::{ModelRoute, RouteKind},
};
use serde_json::Value;
use tracing::{debug, info};
use twinroute_core::{
    ApiFormat, Error, Result,
    anthropic::MessagesResponse,
    openai::{ChatMessage, ChatRequest, ChatResponse, Role},
    translate::{anthropic_response_to_openai, openai_request_to_anthropic},
};

/// Outcome of route selection for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    /// Route the first upstream call goes to
    pub route: RouteKind,
    /// The request asked for the work route but was demoted to a chat pre-check
    pub preprocessed: bool,
}

/// Chooses between the chat and work routes and dispatches requests to them.
///
/// Read-only after construction; share it behind an `Arc`.
#[derive(Debug)]
pub struct Orchestrator {
    chat: ModelRoute,
    work: ModelRoute,
    preprocess_enabled: bool,
    preprocess_instruction: Option<String>,
}

impl Orchestrator {
    pub fn new(chat: ModelRoute, work: ModelRoute) -> Self {
        Self {
            chat,
            work,
            preprocess_enabled: false,
            preprocess_instruction: None,
        }
    }

    /// Enable the chat pre-check for work-bound requests
    pub fn with_preprocessing(mut self, enabled: bool) -> Self {
        self.preprocess_enabled = enabled;
        self
    }

    /// System instruction appended to pre-check requests
    pub fn with_preprocess_instruction(mut self, instruction: Option<String>) -> Self {
        self.preprocess_instruction = instruction.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn route(&self, kind: RouteKind) -> &ModelRoute {
        match kind {
            RouteKind::Chat => &self.chat,
            RouteKind::Work => &self.work,
        }
    }

    pub fn preprocess_enabled(&self) -> bool {
        self.preprocess_enabled
    }

    pub fn preprocess_instruction(&self) -> Option<&str> {
        self.preprocess_instruction.as_deref()
    }

    /// Whether a caller-visible model name selects the work route
    pub fn wants_work(&self, model: &str) -> bool {
        model == self.work.name
    }

    /// Pick the route for the first upstream call.
    ///
    /// A work-bound request whose last message is from the user is demoted to
    /// the chat route when preprocessing is enabled.
    pub fn select(&self, request: &ChatRequest, use_work: bool) -> Result<RouteDecision> {
        if request.messages.is_empty() {
            return Err(Error::InvalidRequest("messages must not be empty".to_string()));
        }

        let last_is_user = request.last_role() == Some(Role::User);
        let preprocessed = use_work && last_is_user && self.preprocess_enabled;
        let route = if use_work && !preprocessed {
            RouteKind::Work
        } else {
            RouteKind::Chat
        };

        debug!(
            model = %request.model,
            route = %route,
            preprocessed,
            "Selected route"
        );

        Ok(RouteDecision {
            route,
            preprocessed,
        })
    }

    /// Select a route and dispatch to it, honoring the request's stream flag
    pub async fn process(&self, request: &ChatRequest, use_work: bool) -> Result<Dispatch> {
        let decision = self.select(request, use_work)?;
        self.dispatch(request, decision.route).await
    }

    /// Send the request to `kind`, substituting the route's upstream model id
    pub async fn dispatch(&self, request: &ChatRequest, kind: RouteKind) -> Result<Dispatch> {
        if request.stream {
            self.open_stream(request, kind)
                .await
                .map(Dispatch::Streaming)
        } else {
            self.complete(request, kind).await.map(Dispatch::Completed)
        }
    }

    /// Non-streaming call to `kind` regardless of the request's stream flag
    pub async fn complete(&self, request: &ChatRequest, kind: RouteKind) -> Result<ChatResponse> {
        let route = self.route(kind);
        let mut request = request.clone();
        request.model = route.model_id.clone();
        request.stream = false;

        info!(route = %kind, model_id = %route.model_id, format = %route.format(), "Dispatching request");

        match route.format() {
            ApiFormat::OpenAI => {
                let body = route.upstream.send(serde_json::to_value(&request)?).await?;
                serde_json::from_value::<ChatResponse>(body).map_err(malformed)
            }
            ApiFormat::Anthropic => {
                let translated = openai_request_to_anthropic(&request)?;
                let body = route
                    .upstream
                    .send(serde_json::to_value(&translated)?)
                    .await?;
                let response = serde_json::from_value::<MessagesResponse>(body).map_err(malformed)?;
                Ok(anthropic_response_to_openai(response))
            }
        }
    }

    /// Streaming call to `kind`; the envelope is tagged with the route's format
    pub async fn open_stream(
        &self,
        request: &ChatRequest,
        kind: RouteKind,
    ) -> Result<StreamEnvelope> {
        let route = self.route(kind);
        let mut request = request.clone();
        request.model = route.model_id.clone();
        request.stream = true;

        info!(route = %kind, model_id = %route.model_id, format = %route.format(), "Dispatching streaming request");

        let format = route.format();
        let body = match format {
            ApiFormat::OpenAI => serde_json::to_value(&request)?,
            ApiFormat::Anthropic => serde_json::to_value(openai_request_to_anthropic(&request)?)?,
        };

        let body = route.upstream.stream(body).await?;
        Ok(StreamEnvelope::Live { body, format })
    }

    /// Forward a raw body in the route's own schema without translation.
    ///
    /// Only `model` is rewritten; everything else the caller sent is kept.
    pub async fn forward_native(
        &self,
        kind: RouteKind,
        mut body: Value,
        stream: bool,
    ) -> Result<NativeDispatch> {
        let route = self.route(kind);
        let Some(object) = body.as_object_mut() else {
            return Err(Error::InvalidRequest(
                "request body must be a JSON object".to_string(),
            ));
        };
        object.insert("model".to_string(), Value::String(route.model_id.clone()));

        info!(route = %kind, model_id = %route.model_id, stream, "Forwarding native request");

        if stream {
            let stream_body = route.upstream.stream(body).await?;
            Ok(NativeDispatch::Streaming(StreamEnvelope::Live {
                body: stream_body,
                format: route.format(),
            }))
        } else {
            Ok(NativeDispatch::Json(route.upstream.send(body).await?))
        }
    }

    /// Copy of `request` prepared for the chat pre-check
    pub fn precheck_request(&self, request: &ChatRequest) -> ChatRequest {
        let mut precheck = request.clone();
        precheck.stream = false;
        if let Some(instruction) = &self.preprocess_instruction {
            precheck.messages.push(ChatMessage::system(instruction.clone()));
        }
        precheck
    }
}

fn malformed(err: serde_json::Error) -> Error {
    Error::Transport(format!("Malformed upstream response: {}", err))
}
