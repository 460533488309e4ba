//! OpenAI chunk stream to Anthropic event stream

use super::{FrameStream, sse::event_frame};
use async_stream::stream;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde_json::{Value, json};
use tracing::{debug, warn};
use twinroute_core::{
    anthropic::{self, BlockDelta, ContentBlock, DeltaUsage, MessageDeltaBody, StreamEvent, StreamMessage},
    openai::ChatChunk,
    provider::ByteStream,
    translate::stop_reason_from_openai,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBlock {
    Text { index: u32 },
    ToolUse { index: u32, call_index: u32 },
}

impl OpenBlock {
    fn index(&self) -> u32 {
        match self {
            OpenBlock::Text { index } | OpenBlock::ToolUse { index, .. } => *index,
        }
    }
}

/// Per-stream encoding state
#[derive(Debug)]
pub struct EventEncoder {
    model: String,
    message_id: Option<String>,
    started: bool,
    finished: bool,
    next_index: u32,
    open: Option<OpenBlock>,
    finish_reason: Option<String>,
    input_tokens: u32,
    output_tokens: u32,
}

impl EventEncoder {
    /// `model` is the caller-visible model reported in `message_start`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            message_id: None,
            started: false,
            finished: false,
            next_index: 0,
            open: None,
            finish_reason: None,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    /// Translate one chunk into zero or more Anthropic frames
    pub fn on_chunk(&mut self, chunk: ChatChunk) -> Vec<Bytes> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }

        if let Some(usage) = chunk.usage {
            self.input_tokens = usage.prompt_tokens;
            self.output_tokens = usage.completion_tokens;
        }
        if self.message_id.is_none() && !chunk.id.is_empty() {
            self.message_id = Some(chunk.id.clone());
        }
        self.ensure_started(&mut out);

        let Some(choice) = chunk.choices.into_iter().next() else {
            return out;
        };

        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            if !matches!(self.open, Some(OpenBlock::Text { .. })) {
                self.close_block(&mut out);
                let index = self.open_block(|index| OpenBlock::Text { index });
                emit(
                    &mut out,
                    StreamEvent::ContentBlockStart {
                        index,
                        content_block: ContentBlock::text(""),
                    },
                );
            }
            let index = self.open.map_or(0, |b| b.index());
            emit(
                &mut out,
                StreamEvent::ContentBlockDelta {
                    index,
                    delta: BlockDelta::TextDelta { text },
                },
            );
        }

        for call in choice.delta.tool_calls.unwrap_or_default() {
            let function = call.function.unwrap_or_default();
            let starts_call = call.id.is_some() || function.name.is_some();
            let continues_open = matches!(
                self.open,
                Some(OpenBlock::ToolUse { call_index, .. }) if call_index == call.index
            );

            if starts_call && !continues_open {
                self.close_block(&mut out);
                let call_index = call.index;
                let index = self.open_block(|index| OpenBlock::ToolUse { index, call_index });
                emit(
                    &mut out,
                    StreamEvent::ContentBlockStart {
                        index,
                        content_block: ContentBlock::ToolUse {
                            id: call.id.unwrap_or_else(|| format!("toolu_{}", index)),
                            name: function.name.unwrap_or_default(),
                            input: json!({}),
                        },
                    },
                );
            }

            let Some(arguments) = function.arguments.filter(|a| !a.is_empty()) else {
                continue;
            };
            match self.open {
                Some(OpenBlock::ToolUse { index, .. }) => emit(
                    &mut out,
                    StreamEvent::ContentBlockDelta {
                        index,
                        delta: BlockDelta::InputJsonDelta {
                            partial_json: arguments,
                        },
                    },
                ),
                _ => debug!("Dropping tool argument fragment outside a tool block"),
            }
        }

        if let Some(reason) = choice.finish_reason {
            self.finish_reason = Some(reason);
        }

        out
    }

    /// Close the open block and end the message. Later calls emit nothing.
    pub fn finish(&mut self) -> Vec<Bytes> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }
        self.ensure_started(&mut out);
        self.close_block(&mut out);

        let stop_reason =
            stop_reason_from_openai(self.finish_reason.as_deref().unwrap_or("stop")).to_string();
        emit(
            &mut out,
            StreamEvent::MessageDelta {
                delta: MessageDeltaBody {
                    stop_reason: Some(stop_reason),
                    stop_sequence: None,
                },
                usage: Some(DeltaUsage {
                    input_tokens: None,
                    output_tokens: self.output_tokens,
                }),
            },
        );
        emit(&mut out, StreamEvent::MessageStop);

        self.finished = true;
        out
    }

    fn ensure_started(&mut self, out: &mut Vec<Bytes>) {
        if self.started {
            return;
        }
        self.started = true;

        let id = match self.message_id.as_deref() {
            Some(id) if id.starts_with("msg_") => id.to_string(),
            Some(id) => format!("msg_{}", id),
            None => format!("msg_{}", uuid::Uuid::new_v4().simple()),
        };
        emit(
            out,
            StreamEvent::MessageStart {
                message: StreamMessage {
                    id,
                    kind: "message".to_string(),
                    role: anthropic::Role::Assistant,
                    content: Vec::new(),
                    model: self.model.clone(),
                    stop_reason: None,
                    stop_sequence: None,
                    usage: anthropic::Usage {
                        input_tokens: self.input_tokens,
                        output_tokens: 0,
                    },
                },
            },
        );
    }

    fn open_block(&mut self, make: impl FnOnce(u32) -> OpenBlock) -> u32 {
        let index = self.next_index;
        self.next_index += 1;
        self.open = Some(make(index));
        index
    }

    fn close_block(&mut self, out: &mut Vec<Bytes>) {
        if let Some(block) = self.open.take() {
            emit(out, StreamEvent::ContentBlockStop { index: block.index() });
        }
    }
}

fn emit(out: &mut Vec<Bytes>, event: StreamEvent) {
    out.extend(event_frame(event.name(), &event));
}

/// Relay an OpenAI SSE body to an Anthropic-speaking caller.
///
/// `[DONE]` or EOF closes the message. A read error or an upstream error
/// object ends the stream without `message_stop`.
pub fn encode_openai(body: ByteStream, model: String) -> FrameStream {
    Box::pin(stream! {
        let mut encoder = EventEncoder::new(model);
        let mut events = body.eventsource();

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!("Upstream stream failed while encoding: {}", e);
                    return;
                }
            };
            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                break;
            }

            let value = match serde_json::from_str::<Value>(data) {
                Ok(value) => value,
                Err(e) => {
                    debug!("Skipping unparseable upstream chunk: {}", e);
                    continue;
                }
            };
            if let Some(error) = value.get("error") {
                warn!(error = %error, "Upstream reported an error mid-stream");
                return;
            }
            let chunk = match serde_json::from_value::<ChatChunk>(value) {
                Ok(chunk) => chunk,
                Err(e) => {
                    debug!("Skipping malformed upstream chunk: {}", e);
                    continue;
                }
            };

            for frame in encoder.on_chunk(chunk) {
                yield frame;
            }
        }

        for frame in encoder.finish() {
            yield frame;
        }
    })
}
