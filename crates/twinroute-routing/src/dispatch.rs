//! Outcomes of dispatching a request to an upstream

use twinroute_core::{ApiFormat, openai::ChatResponse, provider::ByteStream};

/// Result of a translated dispatch
pub enum Dispatch {
    /// A complete non-streaming response, already in OpenAI shape
    Completed(ChatResponse),
    /// A stream for the relay to consume
    Streaming(StreamEnvelope),
}

/// Streaming source handed to the relay; consumed exactly once.
///
/// Dropping a `Live` envelope drops the upstream body and releases its connection.
pub enum StreamEnvelope {
    /// Raw SSE body of an upstream speaking `format`
    Live { body: ByteStream, format: ApiFormat },
    /// A buffered completion that must be replayed as a synthetic stream
    Buffered {
        response: ChatResponse,
        format: ApiFormat,
    },
}

impl StreamEnvelope {
    pub fn format(&self) -> ApiFormat {
        match self {
            StreamEnvelope::Live { format, .. } | StreamEnvelope::Buffered { format, .. } => {
                *format
            }
        }
    }
}

impl std::fmt::Debug for StreamEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamEnvelope::Live { format, .. } => {
                f.debug_struct("Live").field("format", format).finish()
            }
            StreamEnvelope::Buffered { response, format } => f
                .debug_struct("Buffered")
                .field("id", &response.id)
                .field("format", format)
                .finish(),
        }
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::Completed(response) => f.debug_tuple("Completed").field(&response.id).finish(),
            Dispatch::Streaming(envelope) => f.debug_tuple("Streaming").field(envelope).finish(),
        }
    }
}

/// Result of forwarding a raw body without translation
pub enum NativeDispatch {
    Json(serde_json::Value),
    Streaming(StreamEnvelope),
}
