//! Tool-need detection on pre-check replies

use twinroute_core::openai::ChatResponse;

/// Marker the pre-check instruction asks the chat model to emit
pub const TOOL_CALL_MARKER: &str = "<TOOL_CALL_NEEDED>";

/// Keywords matched case-insensitively when the marker is absent
const FALLBACK_KEYWORDS: [&str; 2] = ["function_call", "tool_call"];

/// Whether the chat model's reply indicates the work model is needed.
///
/// Only the first choice is inspected. True when it carries tool calls,
/// finished with `tool_calls`, contains [`TOOL_CALL_MARKER`] verbatim, or
/// mentions one of the fallback keywords in any case.
pub fn needs_tool(response: &ChatResponse) -> bool {
    let Some(choice) = response.first_choice() else {
        return false;
    };

    if !choice.message.tool_calls.is_empty() {
        return true;
    }

    if choice.finish_reason.as_deref() == Some("tool_calls") {
        return true;
    }

    let content = choice.message.text();
    if content.contains(TOOL_CALL_MARKER) {
        return true;
    }

    let lowered = content.to_lowercase();
    FALLBACK_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinroute_core::openai::{ChatMessage, Choice, ToolCall};

    fn response(message: ChatMessage, finish_reason: &str) -> ChatResponse {
        ChatResponse {
            id: "chatcmpl-1".to_string(),
            object: "chat.completion".to_string(),
            created: 0,
            model: "chat".to_string(),
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: Some(finish_reason.to_string()),
            }],
            usage: None,
        }
    }

    #[test]
    fn test_plain_answer_does_not_need_tool() {
        let resp = response(ChatMessage::assistant("The capital of France is Paris."), "stop");
        assert!(!needs_tool(&resp));
    }

    #[test]
    fn test_tool_calls_need_tool() {
        let mut message = ChatMessage::assistant("");
        message.tool_calls = vec![ToolCall::function("call_1", "get_weather", "{}")];
        assert!(needs_tool(&response(message, "stop")));
    }

    #[test]
    fn test_finish_reason_tool_calls_needs_tool() {
        let resp = response(ChatMessage::assistant(""), "tool_calls");
        assert!(needs_tool(&resp));
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let resp = response(
            ChatMessage::assistant("I need help. <TOOL_CALL_NEEDED>"),
            "stop",
        );
        assert!(needs_tool(&resp));

        let resp = response(ChatMessage::assistant("<tool-call-needed>"), "stop");
        assert!(!needs_tool(&resp));
    }

    #[test]
    fn test_keywords_match_any_case() {
        let resp = response(
            ChatMessage::assistant("I would issue a Function_Call here"),
            "stop",
        );
        assert!(needs_tool(&resp));

        let resp = response(ChatMessage::assistant("TOOL_CALL please"), "stop");
        assert!(needs_tool(&resp));
    }

    #[test]
    fn test_only_first_choice_counts() {
        let mut resp = response(ChatMessage::assistant("fine"), "stop");
        resp.choices.push(Choice {
            index: 1,
            message: ChatMessage::assistant("<TOOL_CALL_NEEDED>"),
            finish_reason: Some("stop".to_string()),
        });
        assert!(!needs_tool(&resp));
    }

    #[test]
    fn test_no_choices() {
        let mut resp = response(ChatMessage::assistant(""), "stop");
        resp.choices.clear();
        assert!(!needs_tool(&resp));
    }
}
