//! TwinRoute Ingress
//!
//! HTTP listeners for both caller dialects:
//! - `POST /v1/chat/completions` (OpenAI)
//! - `POST /v1/messages` (Anthropic)
//!
//! plus the stream relay that turns upstream bodies into the caller's SSE
//! grammar, skill injection and request-id propagation.

pub mod anthropic;
pub mod middleware;
pub mod openai;
pub mod relay;
pub mod skills;
pub mod state;
pub mod types;

pub use skills::SkillSet;
pub use state::AppState;
pub use types::{IngressError, IngressResult, RequestId};

use axum::Router;

/// Both listeners on one router, with `x-request-id` on every response
pub fn router(state: AppState) -> Router {
    openai::router(state.clone())
        .merge(anthropic::router(state))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
}
