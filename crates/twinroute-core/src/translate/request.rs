use super::parse_data_url;
use crate::{
    Error, Result, ToolArguments,
    anthropic::{
        self, Content, ContentBlock, DEFAULT_MAX_TOKENS, ImageSource, MessagesRequest,
        SystemPrompt, ToolResultContent,
    },
    openai::{
        ChatMessage, ChatRequest, ContentPart, FunctionDefinition, ImageUrl, MessageContent,
        Role, Stop, Tool, ToolCall, ToolChoice,
    },
};
use serde_json::{Map, json};

/// Convert an OpenAI chat request into an Anthropic messages request.
///
/// System messages are folded into the top-level `system` field, each `tool`
/// message becomes a user message holding one `tool_result` block, and an
/// assistant message with tool calls becomes an optional text block followed
/// by one `tool_use` block per call, in call order.
pub fn openai_request_to_anthropic(request: &ChatRequest) -> Result<MessagesRequest> {
    let mut system_parts = Vec::new();
    let mut messages = Vec::with_capacity(request.messages.len());

    for message in &request.messages {
        match message.role {
            Role::System => {
                let text = message.text();
                if !text.is_empty() {
                    system_parts.push(text);
                }
            }
            Role::User => {
                messages.push(anthropic::Message::user(user_content(
                    message.content.as_ref(),
                )));
            }
            Role::Assistant => {
                messages.push(anthropic::Message::assistant(assistant_content(message)));
            }
            Role::Tool => {
                let tool_use_id = message
                    .tool_call_id
                    .clone()
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        Error::InvalidRequest("tool message is missing tool_call_id".to_string())
                    })?;

                messages.push(anthropic::Message::user(Content::Blocks(vec![
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content: Some(ToolResultContent::Text(message.text())),
                        is_error: None,
                    },
                ])));
            }
        }
    }

    let tools = request
        .tools
        .as_ref()
        .filter(|tools| !tools.is_empty())
        .map(|tools| tools.iter().map(tool_to_anthropic).collect());

    Ok(MessagesRequest {
        model: request.model.clone(),
        messages,
        max_tokens: request.effective_max_tokens().unwrap_or(DEFAULT_MAX_TOKENS),
        system: (!system_parts.is_empty()).then(|| SystemPrompt::Text(system_parts.join("\n\n"))),
        temperature: request.temperature,
        top_p: request.top_p,
        top_k: None,
        stop_sequences: request.stop.clone().map(Stop::into_vec),
        stream: request.stream,
        tools,
        tool_choice: request.tool_choice.as_ref().map(tool_choice_to_anthropic),
    })
}

fn user_content(content: Option<&MessageContent>) -> Content {
    match content {
        None => Content::Text(String::new()),
        Some(MessageContent::Text(text)) => Content::Text(text.clone()),
        Some(MessageContent::Parts(parts)) => {
            Content::Blocks(parts.iter().map(part_to_block).collect())
        }
    }
}

fn part_to_block(part: &ContentPart) -> ContentBlock {
    match part {
        ContentPart::Text { text } => ContentBlock::text(text.clone()),
        ContentPart::ImageUrl { image_url } => {
            let source = match parse_data_url(&image_url.url) {
                Some((media_type, data)) => ImageSource::Base64 {
                    media_type: media_type.to_string(),
                    data: data.to_string(),
                },
                None => ImageSource::Url {
                    url: image_url.url.clone(),
                },
            };
            ContentBlock::Image { source }
        }
    }
}

fn assistant_content(message: &ChatMessage) -> Content {
    let text = message.text();
    if message.tool_calls.is_empty() {
        return Content::Text(text);
    }

    let mut blocks = Vec::with_capacity(message.tool_calls.len() + 1);
    if !text.is_empty() {
        blocks.push(ContentBlock::text(text));
    }
    blocks.extend(message.tool_calls.iter().map(|call| ContentBlock::ToolUse {
        id: call.id.clone(),
        name: call.function.name.clone(),
        input: call.function.arguments.to_input(),
    }));
    Content::Blocks(blocks)
}

fn tool_to_anthropic(tool: &Tool) -> anthropic::Tool {
    anthropic::Tool {
        kind: None,
        name: tool.function.name.clone(),
        description: tool.function.description.clone(),
        input_schema: tool
            .function
            .parameters
            .clone()
            .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
    }
}

fn tool_choice_to_anthropic(choice: &ToolChoice) -> anthropic::ToolChoice {
    match choice {
        ToolChoice::Mode(mode) => mode_to_anthropic(mode),
        ToolChoice::Named(named) => match named.function_name() {
            Some(name) => anthropic::ToolChoice::Tool {
                name: name.to_string(),
            },
            None => named
                .kind
                .as_deref()
                .map(mode_to_anthropic)
                .unwrap_or(anthropic::ToolChoice::Auto),
        },
    }
}

fn mode_to_anthropic(mode: &str) -> anthropic::ToolChoice {
    match mode {
        "required" | "any" => anthropic::ToolChoice::Any,
        "none" => anthropic::ToolChoice::None,
        _ => anthropic::ToolChoice::Auto,
    }
}

/// Convert an Anthropic messages request into an OpenAI chat request.
///
/// `tool_result` blocks become separate `tool` messages placed before any
/// remaining text of the same turn, so they directly follow the assistant
/// message that issued the calls.
pub fn anthropic_request_to_openai(request: &MessagesRequest) -> ChatRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);

    if let Some(system) = &request.system {
        let text = system.text();
        if !text.is_empty() {
            messages.push(ChatMessage::system(text));
        }
    }

    for message in &request.messages {
        let role = match message.role {
            anthropic::Role::User => Role::User,
            anthropic::Role::Assistant => Role::Assistant,
        };

        match &message.content {
            Content::Text(text) => messages.push(ChatMessage {
                role,
                ..ChatMessage::user(text.clone())
            }),
            Content::Blocks(blocks) => push_block_message(role, blocks, &mut messages),
        }
    }

    let tools = request
        .tools
        .as_ref()
        .map(|tools| {
            tools
                .iter()
                .filter(|tool| tool.is_custom())
                .map(|tool| Tool {
                    kind: "function".to_string(),
                    function: FunctionDefinition {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: Some(tool.input_schema.clone()),
                    },
                })
                .collect::<Vec<_>>()
        })
        .filter(|tools| !tools.is_empty());

    ChatRequest {
        model: request.model.clone(),
        messages,
        tools,
        tool_choice: request.tool_choice.as_ref().map(tool_choice_to_openai),
        temperature: request.temperature,
        top_p: request.top_p,
        max_tokens: Some(request.max_tokens),
        stop: request
            .stop_sequences
            .clone()
            .filter(|stops| !stops.is_empty())
            .map(Stop::Many),
        stream: request.stream,
        extra: Map::new(),
    }
}

fn push_block_message(role: Role, blocks: &[ContentBlock], out: &mut Vec<ChatMessage>) {
    let mut parts = Vec::new();
    let mut has_image = false;
    let mut tool_calls = Vec::new();
    let mut reasoning = String::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text } => parts.push(ContentPart::Text { text: text.clone() }),
            ContentBlock::Image { source } => {
                has_image = true;
                parts.push(ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_source_url(source),
                        detail: None,
                    },
                });
            }
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall::function(
                id.clone(),
                name.clone(),
                ToolArguments::from_input(input),
            )),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => out.push(ChatMessage::tool(
                tool_use_id.clone(),
                content
                    .as_ref()
                    .map(ToolResultContent::text)
                    .unwrap_or_default(),
            )),
            ContentBlock::Thinking { thinking, .. } => reasoning.push_str(thinking),
            ContentBlock::RedactedThinking { .. } | ContentBlock::Unsupported => {}
        }
    }

    if parts.is_empty() && tool_calls.is_empty() {
        return;
    }

    let content = if parts.is_empty() {
        None
    } else if has_image {
        Some(MessageContent::Parts(parts))
    } else {
        Some(MessageContent::Text(MessageContent::Parts(parts).text()))
    };

    out.push(ChatMessage {
        role,
        content,
        name: None,
        tool_calls,
        tool_call_id: None,
        reasoning_content: (role == Role::Assistant && !reasoning.is_empty()).then_some(reasoning),
    });
}

fn image_source_url(source: &ImageSource) -> String {
    match source {
        ImageSource::Base64 { media_type, data } => format!("data:{};base64,{}", media_type, data),
        ImageSource::Url { url } => url.clone(),
    }
}

fn tool_choice_to_openai(choice: &anthropic::ToolChoice) -> ToolChoice {
    match choice {
        anthropic::ToolChoice::Auto => ToolChoice::Mode("auto".to_string()),
        anthropic::ToolChoice::Any => ToolChoice::Mode("required".to_string()),
        anthropic::ToolChoice::None => ToolChoice::Mode("none".to_string()),
        anthropic::ToolChoice::Tool { name } => ToolChoice::function(name.clone()),
    }
}
