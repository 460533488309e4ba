//! End-to-end: Anthropic-dialect callers through the full gateway

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use twinroute_core::ApiFormat;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

const TOOL_CALL_SSE: &str = concat!(
    "data: {\"id\":\"chatcmpl-s\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"chat-upstream\",",
    "\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Checking\"},\"finish_reason\":null}]}\n\n",
    "data: {\"id\":\"chatcmpl-s\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"chat-upstream\",",
    "\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",",
    "\"function\":{\"name\":\"get_weather\",\"arguments\":\"\"}}]},\"finish_reason\":null}]}\n\n",
    "data: {\"id\":\"chatcmpl-s\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"chat-upstream\",",
    "\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"city\\\":\\\"NYC\\\"}\"}}]},",
    "\"finish_reason\":null}]}\n\n",
    "data: {\"id\":\"chatcmpl-s\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"chat-upstream\",",
    "\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
    "data: [DONE]\n\n",
);

fn anthropic_message() -> serde_json::Value {
    json!({
        "id": "msg_native",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": "Native reply"}],
        "model": "work-upstream",
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {"input_tokens": 8, "output_tokens": 3}
    })
}

#[tokio::test]
async fn test_native_forward_to_anthropic_route() {
    let chat_server = MockServer::start().await;
    let work_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "work-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "work-upstream",
            "max_tokens": 256,
            "metadata": {"user_id": "user_42"},
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_message()))
        .expect(1)
        .mount(&work_server)
        .await;

    let config = config(
        &chat_server.uri(),
        ApiFormat::OpenAI,
        &work_server.uri(),
        ApiFormat::Anthropic,
    );
    let app = app(&config);

    let response = post_json(
        &app,
        "/v1/messages",
        json!({
            "model": "work",
            "max_tokens": 256,
            "metadata": {"user_id": "user_42"},
            "messages": [{"role": "user", "content": "Hello"}]
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, anthropic_message());
}

#[tokio::test]
async fn test_openai_route_reply_is_translated() {
    let chat_server = MockServer::start().await;
    let work_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "chat-upstream",
            "max_tokens": 64,
            "messages": [
                {"role": "system", "content": "Be terse"},
                {"role": "user", "content": "Hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("Hi", "stop")))
        .expect(1)
        .mount(&chat_server)
        .await;

    let config = config(
        &chat_server.uri(),
        ApiFormat::OpenAI,
        &work_server.uri(),
        ApiFormat::Anthropic,
    );
    let app = app(&config);

    let response = post_json(
        &app,
        "/v1/messages",
        json!({
            "model": "chat",
            "max_tokens": 64,
            "system": "Be terse",
            "messages": [{"role": "user", "content": "Hello"}]
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["type"], "message");
    assert_eq!(body["role"], "assistant");
    assert_eq!(body["model"], "chat");
    assert_eq!(body["content"], json!([{"type": "text", "text": "Hi"}]));
    assert_eq!(body["stop_reason"], "end_turn");
    assert_eq!(body["usage"]["input_tokens"], 12);
    assert_eq!(body["usage"]["output_tokens"], 4);
}

#[tokio::test]
async fn test_openai_stream_is_encoded_for_anthropic_caller() {
    let chat_server = MockServer::start().await;
    let work_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "chat-upstream", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(TOOL_CALL_SSE, "text/event-stream"))
        .expect(1)
        .mount(&chat_server)
        .await;

    let config = config(
        &chat_server.uri(),
        ApiFormat::OpenAI,
        &work_server.uri(),
        ApiFormat::Anthropic,
    );
    let app = app(&config);

    let response = post_json(
        &app,
        "/v1/messages",
        json!({
            "model": "chat",
            "max_tokens": 64,
            "stream": true,
            "messages": [{"role": "user", "content": "Weather in NYC?"}]
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    let sse = body_text(response).await;

    assert_eq!(
        event_names(&sse),
        vec![
            "message_start",
            "content_block_start",
            "content_block_delta",
            "content_block_stop",
            "content_block_start",
            "content_block_delta",
            "content_block_stop",
            "message_delta",
            "message_stop",
        ]
    );

    let events = data_payloads(&sse);
    assert_eq!(events[0]["message"]["model"], "chat");
    assert_eq!(events[2]["delta"], json!({"type": "text_delta", "text": "Checking"}));
    assert_eq!(events[4]["index"], 1);
    assert_eq!(events[4]["content_block"]["type"], "tool_use");
    assert_eq!(events[4]["content_block"]["id"], "call_1");
    assert_eq!(events[4]["content_block"]["name"], "get_weather");
    assert_eq!(events[5]["delta"]["type"], "input_json_delta");
    assert_eq!(events[5]["delta"]["partial_json"], r#"{"city":"NYC"}"#);
    assert_eq!(events[7]["delta"]["stop_reason"], "tool_use");
}

#[tokio::test]
async fn test_native_stream_passes_through_verbatim() {
    let chat_server = MockServer::start().await;
    let work_server = MockServer::start().await;

    let upstream_sse = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_p\",\"type\":\"message\",\"role\":\"assistant\",\"content\":[],\"model\":\"work-upstream\"}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_partial_json(json!({"model": "work-upstream", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(upstream_sse, "text/event-stream"))
        .expect(1)
        .mount(&work_server)
        .await;

    let config = config(
        &chat_server.uri(),
        ApiFormat::OpenAI,
        &work_server.uri(),
        ApiFormat::Anthropic,
    );
    let app = app(&config);

    let response = post_json(
        &app,
        "/v1/messages",
        json!({
            "model": "work",
            "max_tokens": 64,
            "stream": true,
            "messages": [{"role": "user", "content": "hi"}]
        }),
    )
    .await;

    assert_eq!(body_text(response).await, upstream_sse);
}

#[tokio::test]
async fn test_upstream_error_uses_anthropic_shape() {
    let chat_server = MockServer::start().await;
    let work_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("Overloaded"))
        .mount(&work_server)
        .await;

    let config = config(
        &chat_server.uri(),
        ApiFormat::OpenAI,
        &work_server.uri(),
        ApiFormat::Anthropic,
    );
    let app = app(&config);

    let response = post_json(
        &app,
        "/v1/messages",
        json!({
            "model": "work",
            "max_tokens": 64,
            "messages": [{"role": "user", "content": "hi"}]
        }),
    )
    .await;

    assert_eq!(response.status().as_u16(), 529);
    let body = body_json(response).await;
    assert_eq!(body["type"], "error");
    assert_eq!(body["error"]["type"], "overloaded_error");
    assert_eq!(body["error"]["message"], "Overloaded");
}
