//! OpenAI-compatible listener: `POST /v1/chat/completions`

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
use std::time::Instant;
use tracing::{Instrument, debug};
use twinroute_core::{ApiFormat, openai::ChatRequest};
use twinroute_routing::{Dispatch, RouteKind, process_with_escalation};

/// Chat completions endpoint
pub async fn chat_completions(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestIdExt>>,
    body: Bytes,
) -> Response {
    let span = request_span("chat_completions", request_id);
    async move {
        let started = Instant::now();
        let mut route = RouteKind::Chat;
        let result = handle(&state, &body, &mut route).await;
        state.finish(ApiFormat::OpenAI, route, started, result)
    }
    .instrument(span)
    .await
}

async fn handle(state: &AppState, body: &[u8], route: &mut RouteKind) -> IngressResult<Response> {
    let mut request: ChatRequest = serde_json::from_slice(body)?;

    state.skills.inject(&mut request.messages);
    if request.messages.is_empty() {
        return Err(IngressError::InvalidRequest(
            "messages must not be empty".to_string(),
        ));
    }

    state.record_prompt(&request.messages);

    let use_work = state.orchestrator.wants_work(&request.model);
    if use_work {
        *route = RouteKind::Work;
    }
    debug!(
        model = %request.model,
        messages = request.messages.len(),
        stream = request.stream,
        use_work,
        "Chat completion request"
    );

    let outcome = process_with_escalation(&state.orchestrator, &request, use_work).await?;
    *route = outcome.route;
    if outcome.escalated {
        state.metrics.record_escalation();
    }

    match outcome.dispatch {
        Dispatch::Completed(response) => {
            state.record_response(&response);
            Ok(Json(response).into_response())
        }
        Dispatch::Streaming(envelope) => {
            let frames = relay(envelope, ApiFormat::OpenAI, &request.model);
            Ok(sse_response(counted(
                frames,
                state.metrics.clone(),
                ApiFormat::OpenAI,
            )))
        }
    }
}

/// Router for the OpenAI listener
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state)
}
