//! Replaying a buffered completion as a stream

use super::{
    FrameStream,
    encode::EventEncoder,
    sse::{data_frame, done_frame},
};
use twinroute_core::openai::{
    ChatChunk, ChatResponse, ChunkDelta, FunctionCallDelta, Role, ToolCallDelta,
};

/// The chunks a genuine one-step stream of `response` would carry:
/// role, then content and tool calls (omitted when both are empty), then finish.
pub fn synthetic_chunks(response: &ChatResponse) -> Vec<ChatChunk> {
    let id = response.id.clone();
    let model = response.model.clone();
    let created = response.created;
    let chunk = |delta: ChunkDelta, finish_reason: Option<String>| {
        ChatChunk::new(id.clone(), model.clone(), created, delta, finish_reason)
    };

    let mut chunks = vec![chunk(
        ChunkDelta {
            role: Some(Role::Assistant),
            ..Default::default()
        },
        None,
    )];

    let choice = response.first_choice();
    let content = choice
        .map(|c| c.message.text())
        .filter(|text| !text.is_empty());
    let tool_calls: Vec<ToolCallDelta> = choice
        .map(|c| c.message.tool_calls.as_slice())
        .unwrap_or_default()
        .iter()
        .zip(0u32..)
        .map(|(call, index)| ToolCallDelta {
            index,
            id: Some(call.id.clone()),
            kind: Some(call.kind.clone()),
            function: Some(FunctionCallDelta {
                name: Some(call.function.name.clone()),
                arguments: Some(call.function.arguments.to_string()),
            }),
        })
        .collect();

    if content.is_some() || !tool_calls.is_empty() {
        chunks.push(chunk(
            ChunkDelta {
                role: None,
                content,
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            },
            None,
        ));
    }

    let finish_reason = choice
        .and_then(|c| c.finish_reason.clone())
        .unwrap_or_else(|| "stop".to_string());
    let mut finish = chunk(ChunkDelta::default(), Some(finish_reason));
    finish.usage = response.usage;
    chunks.push(finish);

    chunks
}

/// OpenAI wire form: the synthetic chunks followed by `[DONE]`
pub fn synthesize_openai(response: &ChatResponse) -> FrameStream {
    let mut frames: Vec<_> = synthetic_chunks(response)
        .iter()
        .filter_map(data_frame)
        .collect();
    frames.push(done_frame());
    Box::pin(futures::stream::iter(frames))
}

/// Anthropic wire form: the synthetic chunks run through the stream encoder
pub fn synthesize_anthropic(response: &ChatResponse, model: &str) -> FrameStream {
    let mut encoder = EventEncoder::new(model);
    let mut frames = Vec::new();
    for chunk in synthetic_chunks(response) {
        frames.extend(encoder.on_chunk(chunk));
    }
    frames.extend(encoder.finish());
    Box::pin(futures::stream::iter(frames))
}
