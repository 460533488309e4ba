//! Common test utilities for integration tests

use axum::{
    Router,
    body::{Body, to_bytes},
    http::Request,
    response::Response,
};
use serde_json::Value;
use tower::ServiceExt;
use twinroute_core::ApiFormat;
use twinroute_server::{ServerConfig, build_app};

/// Config with `chat` and `work` routes pointing at the given base URLs
#[allow(dead_code)]
pub fn config(
    chat_url: &str,
    chat_format: ApiFormat,
    work_url: &str,
    work_format: ApiFormat,
) -> ServerConfig {
    let mut config = ServerConfig::default();

    config.chat_model.base_url = chat_url.to_string();
    config.chat_model.api_key = "chat-key".to_string();
    config.chat_model.model_name = Some("chat".to_string());
    config.chat_model.model_id = "chat-upstream".to_string();
    config.chat_model.api_format = chat_format;

    config.work_model.base_url = work_url.to_string();
    config.work_model.api_key = "work-key".to_string();
    config.work_model.model_name = Some("work".to_string());
    config.work_model.model_id = "work-upstream".to_string();
    config.work_model.api_format = work_format;

    config
}

#[allow(dead_code)]
pub fn app(config: &ServerConfig) -> Router {
    build_app(config).unwrap()
}

#[allow(dead_code)]
pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Payloads of every `data:` line except `[DONE]`
#[allow(dead_code)]
pub fn data_payloads(sse: &str) -> Vec<Value> {
    sse.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter(|data| *data != "[DONE]")
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

/// Names of every `event:` line, in order
#[allow(dead_code)]
pub fn event_names(sse: &str) -> Vec<String> {
    sse.lines()
        .filter_map(|line| line.strip_prefix("event: "))
        .map(str::to_string)
        .collect()
}

#[allow(dead_code)]
pub fn openai_completion(content: &str, finish_reason: &str) -> Value {
    serde_json::json!({
        "id": "chatcmpl-e2e",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "upstream",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": finish_reason
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
    })
}
