//! Escalation from a chat pre-check to the work route

use crate::{
    dispatch::{Dispatch, StreamEnvelope},
    orchestrator::Orchestrator,
    route::RouteKind,
    tool_detector::needs_tool,
};
use tracing::{debug, info};
use twinroute_core::{ApiFormat, Result, openai::ChatRequest};

/// What the escalation stage did with one request
#[derive(Debug)]
pub struct EscalationOutcome {
    pub dispatch: Dispatch,
    /// Route that produced `dispatch`
    pub route: RouteKind,
    /// The pre-check asked for the work route and it was called
    pub escalated: bool,
}

/// Run a request through selection, the optional pre-check and escalation.
///
/// Without preprocessing this is a plain dispatch. With it, the chat route is
/// called non-streaming so its reply can be inspected; if it needs a tool the
/// original request goes to the work route and that result replaces the
/// first. Otherwise the chat reply is returned, buffered for synthesis when
/// the caller asked for a stream. The two calls never overlap.
pub async fn process_with_escalation(
    orchestrator: &Orchestrator,
    request: &ChatRequest,
    use_work: bool,
) -> Result<EscalationOutcome> {
    let decision = orchestrator.select(request, use_work)?;

    if !decision.preprocessed {
        let dispatch = orchestrator.dispatch(request, decision.route).await?;
        return Ok(EscalationOutcome {
            dispatch,
            route: decision.route,
            escalated: false,
        });
    }

    let precheck = orchestrator.precheck_request(request);
    let reply = orchestrator.complete(&precheck, RouteKind::Chat).await?;

    if needs_tool(&reply) {
        info!(model = %request.model, "Pre-check requires tools, escalating to work route");
        let dispatch = orchestrator.dispatch(request, RouteKind::Work).await?;
        return Ok(EscalationOutcome {
            dispatch,
            route: RouteKind::Work,
            escalated: true,
        });
    }

    debug!(model = %request.model, "Pre-check answered without tools");
    let dispatch = if request.stream {
        Dispatch::Streaming(StreamEnvelope::Buffered {
            response: reply,
            format: ApiFormat::OpenAI,
        })
    } else {
        Dispatch::Completed(reply)
    };

    Ok(EscalationOutcome {
        dispatch,
        route: RouteKind::Chat,
        escalated: false,
    })
}
