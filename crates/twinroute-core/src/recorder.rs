//! Prompt and response recording hooks

use crate::{
    Result,
    openai::{ChatMessage, ChatResponse},
};

/// Sink for the final message list and completion of each exchange.
///
/// Callers treat failures as non-fatal: they are logged and the request proceeds.
#[async_trait::async_trait]
pub trait ExchangeRecorder: Send + Sync {
    /// Record the message list about to be dispatched
    async fn record_prompt(&self, messages: &[ChatMessage]) -> Result<()>;

    /// Record the completion returned to the caller
    async fn record_response(&self, response: &ChatResponse) -> Result<()>;
}
