use super::{finish_reason_from_anthropic, stop_reason_from_openai};
use crate::{
    ToolArguments,
    anthropic::{self, ContentBlock, MessagesResponse},
    openai::{ChatMessage, ChatResponse, Choice, MessageContent, Role, ToolCall, Usage},
};

/// Convert an Anthropic messages response into an OpenAI chat completion.
///
/// Text blocks are concatenated in order, each `tool_use` block becomes one
/// tool call with its `input` re-serialized as the argument string.
pub fn anthropic_response_to_openai(response: MessagesResponse) -> ChatResponse {
    let mut text = String::new();
    let mut reasoning = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            ContentBlock::Text { text: fragment } => text.push_str(&fragment),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::function(id, name, ToolArguments::from_input(&input)))
            }
            ContentBlock::Thinking { thinking, .. } => reasoning.push_str(&thinking),
            _ => {}
        }
    }

    let content = if text.is_empty() && !tool_calls.is_empty() {
        None
    } else {
        Some(MessageContent::Text(text))
    };
    let finish_reason =
        finish_reason_from_anthropic(response.stop_reason.as_deref().unwrap_or("end_turn"));

    ChatResponse {
        id: response.id,
        object: "chat.completion".to_string(),
        created: chrono::Utc::now().timestamp(),
        model: response.model,
        choices: vec![Choice {
            index: 0,
            message: ChatMessage {
                role: Role::Assistant,
                content,
                name: None,
                tool_calls,
                tool_call_id: None,
                reasoning_content: (!reasoning.is_empty()).then_some(reasoning),
            },
            finish_reason: Some(finish_reason.to_string()),
        }],
        usage: Some(Usage::new(
            response.usage.input_tokens,
            response.usage.output_tokens,
        )),
    }
}

/// Convert an OpenAI chat completion into an Anthropic messages response.
///
/// `model` is the name the caller asked for, echoed back unchanged.
pub fn openai_response_to_anthropic(response: ChatResponse, model: &str) -> MessagesResponse {
    let id = if response.id.starts_with("msg_") {
        response.id
    } else {
        format!("msg_{}", response.id)
    };
    let usage = response
        .usage
        .map(|usage| anthropic::Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        })
        .unwrap_or_default();

    let (content, stop_reason) = match response.choices.into_iter().next() {
        Some(choice) => {
            let mut blocks = Vec::with_capacity(choice.message.tool_calls.len() + 1);
            let text = choice.message.text();
            if !text.is_empty() {
                blocks.push(ContentBlock::text(text));
            }
            blocks.extend(choice.message.tool_calls.into_iter().map(|call| {
                ContentBlock::ToolUse {
                    input: call.function.arguments.to_input(),
                    id: call.id,
                    name: call.function.name,
                }
            }));
            let stop_reason =
                stop_reason_from_openai(choice.finish_reason.as_deref().unwrap_or("stop"));
            (blocks, stop_reason)
        }
        None => (Vec::new(), "end_turn"),
    };

    MessagesResponse {
        id,
        kind: "message".to_string(),
        role: anthropic::Role::Assistant,
        content,
        model: model.to_string(),
        stop_reason: Some(stop_reason.to_string()),
        stop_sequence: None,
        usage,
    }
}
