//! Anthropic event stream to OpenAI chunk stream

use super::{
    FrameStream,
    sse::{data_frame, done_frame},
};
use async_stream::stream;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use tracing::{debug, warn};
use twinroute_core::{
    Error, Result, ToolArguments,
    anthropic::{BlockDelta, ContentBlock, StreamEvent},
    openai::{ChatChunk, ChunkDelta, FunctionCallDelta, Role, ToolCallDelta, Usage},
    provider::ByteStream,
    translate::finish_reason_from_anthropic,
};

/// Tool call whose `tool_use` block has started but not stopped
#[derive(Debug)]
struct OpenToolCall {
    id: String,
    name: String,
    arguments: ToolArguments,
}

/// Per-stream decoding state.
///
/// At most one tool block is open at a time; `content_block_stop` closes it
/// and advances the tool-call index.
#[derive(Debug)]
pub struct ChunkDecoder {
    id: String,
    model: String,
    created: i64,
    role_sent: bool,
    tool_index: u32,
    open_tool: Option<OpenToolCall>,
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

impl ChunkDecoder {
    /// `model` labels chunks until `message_start` supplies the upstream's own
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            model: model.into(),
            created: chrono::Utc::now().timestamp(),
            role_sent: false,
            tool_index: 0,
            open_tool: None,
            input_tokens: None,
            output_tokens: None,
        }
    }

    /// Translate one upstream event into zero or more chunks.
    ///
    /// Fails on an upstream `error` event; the stream must end there.
    pub fn on_event(&mut self, event: StreamEvent) -> Result<Vec<ChatChunk>> {
        let mut out = Vec::new();

        match event {
            StreamEvent::MessageStart { message } => {
                self.id = message.id;
                if !message.model.is_empty() {
                    self.model = message.model;
                }
                self.input_tokens = Some(message.usage.input_tokens);
                self.ensure_role(&mut out);
            }
            StreamEvent::ContentBlockStart { content_block, .. } => {
                if let ContentBlock::ToolUse { id, name, .. } = content_block {
                    self.ensure_role(&mut out);
                    if self.open_tool.is_some() {
                        self.close_tool();
                    }
                    out.push(self.chunk(ChunkDelta {
                        tool_calls: Some(vec![ToolCallDelta {
                            index: self.tool_index,
                            id: Some(id.clone()),
                            kind: Some("function".to_string()),
                            function: Some(FunctionCallDelta {
                                name: Some(name.clone()),
                                arguments: Some(String::new()),
                            }),
                        }]),
                        ..Default::default()
                    }));
                    self.open_tool = Some(OpenToolCall {
                        id,
                        name,
                        arguments: ToolArguments::default(),
                    });
                }
            }
            StreamEvent::ContentBlockDelta { delta, .. } => match delta {
                BlockDelta::TextDelta { text } if !text.is_empty() => {
                    self.ensure_role(&mut out);
                    out.push(self.chunk(ChunkDelta {
                        content: Some(text),
                        ..Default::default()
                    }));
                }
                BlockDelta::InputJsonDelta { partial_json } => {
                    let index = self.tool_index;
                    let Some(open) = self.open_tool.as_mut() else {
                        debug!("Dropping input_json_delta outside a tool_use block");
                        return Ok(out);
                    };
                    open.arguments.push_fragment(&partial_json);
                    self.ensure_role(&mut out);
                    out.push(self.chunk(ChunkDelta {
                        tool_calls: Some(vec![ToolCallDelta {
                            index,
                            function: Some(FunctionCallDelta {
                                name: None,
                                arguments: Some(partial_json),
                            }),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }));
                }
                _ => {}
            },
            StreamEvent::ContentBlockStop { .. } => {
                if self.open_tool.is_some() {
                    self.close_tool();
                }
            }
            StreamEvent::MessageDelta { delta, usage } => {
                if let Some(usage) = usage {
                    if let Some(input) = usage.input_tokens {
                        self.input_tokens = Some(input);
                    }
                    self.output_tokens = Some(usage.output_tokens);
                }
                self.ensure_role(&mut out);

                let finish_reason =
                    finish_reason_from_anthropic(delta.stop_reason.as_deref().unwrap_or("end_turn"));
                let mut chunk = ChatChunk::new(
                    self.id.clone(),
                    self.model.clone(),
                    self.created,
                    ChunkDelta::default(),
                    Some(finish_reason.to_string()),
                );
                chunk.usage = self.usage();
                out.push(chunk);
            }
            StreamEvent::Error { error } => {
                return Err(Error::Stream(format!("{}: {}", error.kind, error.message)));
            }
            StreamEvent::MessageStop | StreamEvent::Ping | StreamEvent::Unknown => {}
        }

        Ok(out)
    }

    fn ensure_role(&mut self, out: &mut Vec<ChatChunk>) {
        if !self.role_sent {
            self.role_sent = true;
            out.push(self.chunk(ChunkDelta {
                role: Some(Role::Assistant),
                ..Default::default()
            }));
        }
    }

    fn close_tool(&mut self) {
        if let Some(tool) = self.open_tool.take() {
            if !tool.arguments.is_empty() && !tool.arguments.is_valid_json() {
                warn!(tool_id = %tool.id, tool = %tool.name, "Streamed tool arguments are not valid JSON");
            }
            debug!(tool_id = %tool.id, tool = %tool.name, index = self.tool_index, "Tool call complete");
            self.tool_index += 1;
        }
    }

    fn chunk(&self, delta: ChunkDelta) -> ChatChunk {
        ChatChunk::new(self.id.clone(), self.model.clone(), self.created, delta, None)
    }

    fn usage(&self) -> Option<Usage> {
        match (self.input_tokens, self.output_tokens) {
            (None, None) => None,
            (input, output) => Some(Usage::new(input.unwrap_or(0), output.unwrap_or(0))),
        }
    }
}

/// Relay an Anthropic SSE body to an OpenAI-speaking caller.
///
/// Ends with `[DONE]` on upstream EOF. An upstream error event or read error
/// ends the stream without it.
pub fn decode_anthropic(body: ByteStream, model: String) -> FrameStream {
    Box::pin(stream! {
        let mut decoder = ChunkDecoder::new(model);
        let mut events = body.eventsource();

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!("Upstream stream failed while decoding: {}", e);
                    return;
                }
            };
            if event.data.trim().is_empty() {
                continue;
            }

            let parsed = match serde_json::from_str::<StreamEvent>(&event.data) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!(event = %event.event, "Skipping unparseable upstream event: {}", e);
                    continue;
                }
            };

            match decoder.on_event(parsed) {
                Ok(chunks) => {
                    for chunk in chunks {
                        if let Some(frame) = data_frame(&chunk) {
                            yield frame;
                        }
                    }
                }
                Err(e) => {
                    warn!("Upstream reported an error mid-stream: {}", e);
                    return;
                }
            }
        }

        yield done_frame();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    fn event(value: serde_json::Value) -> StreamEvent {
        serde_json::from_value(value).unwrap()
    }

    fn message_start() -> StreamEvent {
        event(json!({
            "type": "message_start",
            "message": {
                "id": "msg_1", "type": "message", "role": "assistant", "content": [],
                "model": "claude-sonnet-4", "usage": {"input_tokens": 12, "output_tokens": 0}
            }
        }))
    }

    fn weather_sequence() -> Vec<StreamEvent> {
        vec![
            message_start(),
            event(json!({"type": "content_block_start", "index": 0,
                "content_block": {"type": "tool_use", "id": "t1", "name": "get_weather", "input": {}}})),
            event(json!({"type": "content_block_delta", "index": 0,
                "delta": {"type": "input_json_delta", "partial_json": "{\"city\":"}})),
            event(json!({"type": "content_block_delta", "index": 0,
                "delta": {"type": "input_json_delta", "partial_json": "\"NYC\"}"}})),
            event(json!({"type": "content_block_stop", "index": 0})),
            event(json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"},
                "usage": {"output_tokens": 9}})),
            event(json!({"type": "message_stop"})),
        ]
    }

    fn decode_all(events: Vec<StreamEvent>) -> Vec<ChatChunk> {
        let mut decoder = ChunkDecoder::new("caller-model");
        events
            .into_iter()
            .flat_map(|e| decoder.on_event(e).unwrap())
            .collect()
    }

    #[test]
    fn test_tool_arguments_concatenate() {
        let chunks = decode_all(weather_sequence());

        let first = &chunks[0].choices[0];
        assert_eq!(first.delta.role, Some(Role::Assistant));

        let arguments: String = chunks
            .iter()
            .filter_map(|c| c.choices[0].delta.tool_calls.as_ref())
            .flatten()
            .filter_map(|tc| tc.function.as_ref()?.arguments.clone())
            .collect();
        assert_eq!(arguments, "{\"city\":\"NYC\"}");

        let last = chunks.last().unwrap();
        assert_eq!(last.choices[0].finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(last.choices[0].delta, ChunkDelta::default());
        assert_eq!(last.usage, Some(Usage::new(12, 9)));

        let start = chunks[1].choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(start[0].id.as_deref(), Some("t1"));
        assert_eq!(
            start[0].function.as_ref().unwrap().name.as_deref(),
            Some("get_weather")
        );
        assert!(chunks.iter().all(|c| c.id == "msg_1" && c.model == "claude-sonnet-4"));
    }

    #[test]
    fn test_second_tool_block_gets_next_index() {
        let mut events = weather_sequence();
        events.truncate(5);
        events.push(event(json!({"type": "content_block_start", "index": 1,
            "content_block": {"type": "tool_use", "id": "t2", "name": "get_time", "input": {}}})));

        let chunks = decode_all(events);
        let last = chunks.last().unwrap().choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(last[0].index, 1);
        assert_eq!(last[0].id.as_deref(), Some("t2"));
    }

    #[test]
    fn test_text_deltas_and_empty_text() {
        let chunks = decode_all(vec![
            message_start(),
            event(json!({"type": "content_block_start", "index": 0,
                "content_block": {"type": "text", "text": ""}})),
            event(json!({"type": "content_block_delta", "index": 0,
                "delta": {"type": "text_delta", "text": ""}})),
            event(json!({"type": "content_block_delta", "index": 0,
                "delta": {"type": "text_delta", "text": "Hello"}})),
            event(json!({"type": "ping"})),
            event(json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}})),
        ]);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].choices[0].delta.content.as_deref(), Some("Hello"));
        assert_eq!(chunks[2].choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_role_chunk_emitted_lazily_without_message_start() {
        let chunks = decode_all(vec![event(json!({"type": "content_block_delta", "index": 0,
            "delta": {"type": "text_delta", "text": "Hi"}}))]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].choices[0].delta.role, Some(Role::Assistant));
        assert_eq!(chunks[0].model, "caller-model");
    }

    #[test]
    fn test_json_delta_outside_tool_block_is_dropped() {
        let chunks = decode_all(vec![
            message_start(),
            event(json!({"type": "content_block_delta", "index": 0,
                "delta": {"type": "input_json_delta", "partial_json": "{}"}})),
        ]);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_max_tokens_maps_to_length() {
        let chunks = decode_all(vec![
            message_start(),
            event(json!({"type": "message_delta", "delta": {"stop_reason": "max_tokens"}})),
        ]);
        assert_eq!(
            chunks.last().unwrap().choices[0].finish_reason.as_deref(),
            Some("length")
        );
    }

    #[test]
    fn test_error_event_fails() {
        let mut decoder = ChunkDecoder::new("m");
        let result = decoder.on_event(event(json!({"type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}})));
        assert!(result.is_err());
    }

    fn sse_body(text: &'static str) -> ByteStream {
        let items: Vec<twinroute_core::Result<Bytes>> = vec![Ok(Bytes::from_static(text.as_bytes()))];
        Box::pin(futures::stream::iter(items))
    }

    async fn collect(stream: FrameStream) -> String {
        let frames: Vec<Bytes> = stream.collect().await;
        frames
            .iter()
            .map(|f| String::from_utf8(f.to_vec()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_stream_ends_with_done() {
        let output = collect(decode_anthropic(
            sse_body(concat!(
                "event: message_start\n",
                "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_9\",\"model\":\"claude\",\"usage\":{\"input_tokens\":1,\"output_tokens\":0}}}\n\n",
                "event: content_block_delta\n",
                "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
                "event: message_delta\n",
                "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":1}}\n\n",
                "event: message_stop\n",
                "data: {\"type\":\"message_stop\"}\n\n",
            )),
            "caller".to_string(),
        ))
        .await;

        let frames: Vec<&str> = output.split("\n\n").filter(|f| !f.is_empty()).collect();
        assert_eq!(frames.len(), 4);
        assert!(frames[0].contains("\"role\":\"assistant\""));
        assert!(frames[1].contains("\"content\":\"Hi\""));
        assert!(frames[2].contains("\"finish_reason\":\"stop\""));
        assert_eq!(frames[3], "data: [DONE]");
    }

    #[tokio::test]
    async fn test_upstream_error_event_ends_without_done() {
        let output = collect(decode_anthropic(
            sse_body(concat!(
                "event: error\n",
                "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
            )),
            "caller".to_string(),
        ))
        .await;

        assert!(!output.contains("[DONE]"));
    }
}
