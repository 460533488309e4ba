//! Upstream trait definitions

use crate::{ApiFormat, Result};
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Raw response body of a streaming upstream call, positioned at the first SSE byte
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// An HTTP backend speaking one wire protocol.
///
/// Bodies are already in the upstream's own schema; implementations apply
/// protocol headers and any vendor quirks, and fail on status >= 400.
#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    /// The wire protocol this upstream speaks
    fn format(&self) -> ApiFormat;

    /// Send a non-streaming request and return the decoded JSON body
    async fn send(&self, body: serde_json::Value) -> Result<serde_json::Value>;

    /// Send a streaming request and return the raw SSE body
    async fn stream(&self, body: serde_json::Value) -> Result<ByteStream>;
}
