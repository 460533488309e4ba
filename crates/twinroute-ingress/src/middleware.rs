//! Shared ingress middleware

use crate::types::RequestId;
use axum::{
    Extension,
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{Span, debug_span};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Extension key for the request ID
#[derive(Debug, Clone)]
pub struct RequestIdExt(pub RequestId);

/// Span for one handler invocation, tagged with the `x-request-id` echoed to the caller
pub fn request_span(handler: &'static str, request_id: Option<Extension<RequestIdExt>>) -> Span {
    let request_id = request_id
        .map(|Extension(RequestIdExt(id))| id)
        .unwrap_or_else(RequestId::generate);
    debug_span!("request", handler, request_id = %request_id)
}

/// Propagate the caller's `x-request-id` or generate one, and echo it on the response
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| RequestId::from_string(value.to_string()))
        .unwrap_or_else(RequestId::generate);

    req.extensions_mut().insert(RequestIdExt(request_id.clone()));

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
