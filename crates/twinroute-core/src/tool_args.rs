//! Opaque tool-call argument payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// JSON-encoded tool arguments, carried verbatim between protocols.
///
/// OpenAI transmits arguments as a JSON string while Anthropic uses an
/// `input` object; the payload is only re-serialized when crossing that
/// boundary and is otherwise never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArguments(String);

impl ToolArguments {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Serialize an Anthropic `input` object into an argument string
    pub fn from_input(input: &Value) -> Self {
        Self(input.to_string())
    }

    /// Parse into an Anthropic `input` object.
    ///
    /// Empty or non-object payloads become `{}` since Anthropic requires an object.
    pub fn to_input(&self) -> Value {
        match serde_json::from_str::<Value>(&self.0) {
            Ok(value @ Value::Object(_)) => value,
            _ => Value::Object(Map::new()),
        }
    }

    pub fn is_valid_json(&self) -> bool {
        serde_json::from_str::<Value>(&self.0).is_ok()
    }

    pub fn push_fragment(&mut self, fragment: &str) {
        self.0.push_str(fragment);
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ToolArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ToolArguments {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for ToolArguments {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}
