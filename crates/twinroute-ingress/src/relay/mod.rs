//! Stream relay
//!
//! Turns a [`StreamEnvelope`] into the SSE grammar the caller speaks:
//! - same protocol: line-verbatim pass-through
//! - Anthropic upstream, OpenAI caller: event decode
//! - OpenAI upstream, Anthropic caller: event encode
//! - buffered completion: synthetic one-step stream
//!
//! Every item of a [`FrameStream`] is written and flushed on its own. Dropping
//! the stream (caller disconnect) drops the upstream body with it.

pub mod decode;
pub mod encode;
pub mod passthrough;
pub mod sse;
pub mod synthesize;

use axum::{
    body::Body,
    http::{HeaderValue, header},
    response::Response,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::{convert::Infallible, pin::Pin, sync::Arc};
use twinroute_core::ApiFormat;
use twinroute_observability::Metrics;
use twinroute_routing::StreamEnvelope;

pub use decode::{ChunkDecoder, decode_anthropic};
pub use encode::{EventEncoder, encode_openai};
pub use passthrough::passthrough;
pub use synthesize::{synthesize_anthropic, synthesize_openai, synthetic_chunks};

/// Outbound SSE frames, one flush unit per item
pub type FrameStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// Pick the relay mode for `envelope` given the caller's protocol.
///
/// `model` labels frames the relay has to invent (Anthropic `message_start`,
/// chunks before the upstream names its model).
pub fn relay(envelope: StreamEnvelope, caller: ApiFormat, model: &str) -> FrameStream {
    match envelope {
        StreamEnvelope::Live { body, format } if format == caller => passthrough(body),
        StreamEnvelope::Live { body, .. } => match caller {
            ApiFormat::OpenAI => decode_anthropic(body, model.to_string()),
            ApiFormat::Anthropic => encode_openai(body, model.to_string()),
        },
        StreamEnvelope::Buffered { response, .. } => match caller {
            ApiFormat::OpenAI => synthesize_openai(&response),
            ApiFormat::Anthropic => synthesize_anthropic(&response, model),
        },
    }
}

/// Count each frame as it is handed to a `listener` caller
pub fn counted(frames: FrameStream, metrics: Arc<Metrics>, listener: ApiFormat) -> FrameStream {
    Box::pin(frames.inspect(move |_| metrics.record_stream_frame(listener.as_str())))
}

/// Wrap frames in a `text/event-stream` response
pub fn sse_response(frames: FrameStream) -> Response {
    let mut response = Response::new(Body::from_stream(frames.map(Ok::<_, Infallible>)));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use twinroute_core::openai::ChatResponse;

    fn live(text: &'static str, format: ApiFormat) -> StreamEnvelope {
        let items: Vec<twinroute_core::Result<Bytes>> = vec![Ok(Bytes::from_static(text.as_bytes()))];
        StreamEnvelope::Live {
            body: Box::pin(futures::stream::iter(items)),
            format,
        }
    }

    async fn collect(stream: FrameStream) -> String {
        let frames: Vec<Bytes> = stream.collect().await;
        frames
            .iter()
            .map(|f| String::from_utf8(f.to_vec()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_same_format_is_verbatim() {
        let text = "data: {\"x\":1}\n\ndata: [DONE]\n\n";
        let out = collect(relay(live(text, ApiFormat::OpenAI), ApiFormat::OpenAI, "m")).await;
        assert_eq!(out, text);
    }

    #[tokio::test]
    async fn test_cross_format_decodes() {
        let text = "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n";
        let out = collect(relay(live(text, ApiFormat::Anthropic), ApiFormat::OpenAI, "m")).await;
        assert!(out.ends_with("data: [DONE]\n\n"));
    }

    #[tokio::test]
    async fn test_buffered_synthesizes_for_anthropic() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "id": "c", "model": "small",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}, "finish_reason": "stop"}]
        }))
        .unwrap();
        let envelope = StreamEnvelope::Buffered {
            response,
            format: ApiFormat::OpenAI,
        };

        let out = collect(relay(envelope, ApiFormat::Anthropic, "work")).await;
        assert!(out.starts_with("event: message_start\n"));
        assert!(out.ends_with("event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n"));
    }

    #[tokio::test]
    async fn test_counted_frames() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let text = "data: 1\n\ndata: [DONE]\n\n";
        let frames = counted(
            relay(live(text, ApiFormat::OpenAI), ApiFormat::OpenAI, "m"),
            metrics.clone(),
            ApiFormat::OpenAI,
        );
        collect(frames).await;

        assert_eq!(
            metrics
                .stream_frames_total
                .with_label_values(&["openai"])
                .get(),
            4.0
        );
    }

    #[test]
    fn test_sse_headers() {
        let response = sse_response(Box::pin(futures::stream::empty()));
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONNECTION], "keep-alive");
        assert_eq!(headers["x-accel-buffering"], "no");
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// One chunk, then an upstream that never finishes; `dropped` flips when
    /// the body is released
    fn open_upstream(first: &'static str, format: ApiFormat) -> (StreamEnvelope, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(dropped.clone());
        let items: Vec<twinroute_core::Result<Bytes>> = vec![Ok(Bytes::from_static(first.as_bytes()))];
        let body = futures::stream::iter(items)
            .chain(futures::stream::pending())
            .map(move |item| {
                let _guard = &guard;
                item
            });
        let envelope = StreamEnvelope::Live {
            body: Box::pin(body),
            format,
        };
        (envelope, dropped)
    }

    #[tokio::test]
    async fn test_dropping_relay_releases_upstream() {
        let cases = [
            ("data: {\"x\":1}\n\n", ApiFormat::OpenAI, ApiFormat::OpenAI),
            (
                "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"type\":\"message\",\"role\":\"assistant\",\"content\":[],\"model\":\"m\"}}\n\n",
                ApiFormat::Anthropic,
                ApiFormat::OpenAI,
            ),
            (
                "data: {\"id\":\"c1\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n\n",
                ApiFormat::OpenAI,
                ApiFormat::Anthropic,
            ),
        ];

        for (first, upstream, caller) in cases {
            let (envelope, dropped) = open_upstream(first, upstream);
            let mut frames = relay(envelope, caller, "m");

            assert!(frames.next().await.is_some());
            assert!(!dropped.load(Ordering::SeqCst));

            drop(frames);
            assert!(dropped.load(Ordering::SeqCst), "{} -> {}", upstream, caller);
        }
    }
}
