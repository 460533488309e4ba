//! Anthropic-compatible listener: `POST /v1/messages`
//!
//! Requests are parsed twice: once as raw JSON, kept for native forwarding to
//! an Anthropic-format route, and once as a typed request that is translated
//! to the OpenAI shape for route selection, the pre-check and OpenAI-format
//! routes.

use crate::{
    middleware::{RequestIdExt, request_span},
    relay::{counted, relay, sse_response},
    state::AppState,
    types::{IngressError, IngressResult},
};
use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;
use std::time::Instant;
use tracing::{Instrument, debug, warn};
use twinroute_core::{
    ApiFormat,
    anthropic::MessagesRequest,
    translate::{anthropic_request_to_openai, anthropic_response_to_openai, openai_response_to_anthropic},
};
use twinroute_routing::{Dispatch, NativeDispatch, RouteKind, process_with_escalation};

/// Messages endpoint
pub async fn messages(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestIdExt>>,
    body: Bytes,
) -> Response {
    let span = request_span("messages", request_id);
    async move {
        let started = Instant::now();
        let mut route = RouteKind::Chat;
        let result = handle(&state, &body, &mut route).await;
        state.finish(ApiFormat::Anthropic, route, started, result)
    }
    .instrument(span)
    .await
}

async fn handle(state: &AppState, body: &[u8], route: &mut RouteKind) -> IngressResult<Response> {
    let mut raw: Value = serde_json::from_slice(body)?;
    let typed: MessagesRequest = serde_json::from_value(raw.clone())?;

    let mut request = anthropic_request_to_openai(&typed);
    state.skills.inject(&mut request.messages);
    if request.messages.is_empty() {
        return Err(IngressError::InvalidRequest(
            "messages must not be empty".to_string(),
        ));
    }

    state.record_prompt(&request.messages);

    let use_work = state.orchestrator.wants_work(&typed.model);
    let decision = state.orchestrator.select(&request, use_work)?;
    *route = decision.route;
    debug!(
        model = %typed.model,
        messages = request.messages.len(),
        stream = typed.stream,
        route = %decision.route,
        preprocessed = decision.preprocessed,
        "Messages request"
    );

    if !decision.preprocessed
        && state.orchestrator.route(decision.route).format() == ApiFormat::Anthropic
    {
        state.skills.inject_anthropic(&mut raw);
        return forward_native(state, decision.route, raw, &typed).await;
    }

    let outcome = process_with_escalation(&state.orchestrator, &request, use_work).await?;
    *route = outcome.route;
    if outcome.escalated {
        state.metrics.record_escalation();
    }

    match outcome.dispatch {
        Dispatch::Completed(response) => {
            state.record_response(&response);
            let response = openai_response_to_anthropic(response, &typed.model);
            Ok(Json(response).into_response())
        }
        Dispatch::Streaming(envelope) => {
            let frames = relay(envelope, ApiFormat::Anthropic, &typed.model);
            Ok(sse_response(counted(
                frames,
                state.metrics.clone(),
                ApiFormat::Anthropic,
            )))
        }
    }
}

/// Same protocol on both sides: only `model` is rewritten
async fn forward_native(
    state: &AppState,
    kind: RouteKind,
    raw: Value,
    typed: &MessagesRequest,
) -> IngressResult<Response> {
    match state
        .orchestrator
        .forward_native(kind, raw, typed.stream)
        .await?
    {
        NativeDispatch::Json(body) => {
            if state.recorder.is_some() {
                match serde_json::from_value(body.clone()) {
                    Ok(response) => state.record_response(&anthropic_response_to_openai(response)),
                    Err(e) => warn!("Upstream response not recordable: {}", e),
                }
            }
            Ok(Json(body).into_response())
        }
        NativeDispatch::Streaming(envelope) => {
            let frames = relay(envelope, ApiFormat::Anthropic, &typed.model);
            Ok(sse_response(counted(
                frames,
                state.metrics.clone(),
                ApiFormat::Anthropic,
            )))
        }
    }
}

/// Router for the Anthropic listener
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/messages", post(messages))
        .with_state(state)
}
