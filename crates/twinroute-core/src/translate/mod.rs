//! Protocol translation between the OpenAI and Anthropic schemas
//!
//! Every function here is pure: no I/O, no shared state. Requests and
//! responses are converted in both directions; streaming events are
//! handled incrementally by the relay, which reuses the stop-reason maps
//! defined here.

mod request;
mod response;

pub use request::{anthropic_request_to_openai, openai_request_to_anthropic};
pub use response::{anthropic_response_to_openai, openai_response_to_anthropic};

/// Map an Anthropic `stop_reason` to an OpenAI `finish_reason`
pub fn finish_reason_from_anthropic(stop_reason: &str) -> &'static str {
    match stop_reason {
        "tool_use" => "tool_calls",
        "max_tokens" => "length",
        _ => "stop",
    }
}

/// Map an OpenAI `finish_reason` to an Anthropic `stop_reason`
pub fn stop_reason_from_openai(finish_reason: &str) -> &'static str {
    match finish_reason {
        "tool_calls" | "function_call" => "tool_use",
        "length" => "max_tokens",
        _ => "end_turn",
    }
}

/// Split a `data:` URL into its media type and base64 payload
pub(crate) fn parse_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    let media_type = meta.strip_suffix(";base64")?;
    Some((media_type, data))
}
