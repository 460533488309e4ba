//! Vendor compatibility patches for OpenAI-compatible upstreams

use serde_json::Value;

/// Whether the base URL points at a Moonshot endpoint.
///
/// Moonshot's thinking models reject assistant turns without
/// `reasoning_content`, so their request bodies need [`apply_reasoning_patch`].
pub fn requires_reasoning_patch(base_url: &str) -> bool {
    base_url.to_ascii_lowercase().contains("moonshot")
}

/// Give every assistant message lacking `reasoning_content` a single-space
/// value and disable reasoning at the top level.
///
/// Operates on the serialized body as the last step before transmission.
/// Idempotent: existing `reasoning_content` fields are left untouched.
pub fn apply_reasoning_patch(body: &mut Value) {
    let Some(object) = body.as_object_mut() else {
        return;
    };

    if let Some(Value::Array(messages)) = object.get_mut("messages") {
        for message in messages.iter_mut().filter_map(Value::as_object_mut) {
            let is_assistant = message.get("role").and_then(Value::as_str) == Some("assistant");
            if is_assistant && !message.contains_key("reasoning_content") {
                message.insert(
                    "reasoning_content".to_string(),
                    Value::String(" ".to_string()),
                );
            }
        }
    }

    object.insert("reasoning".to_string(), Value::Bool(false));
}
