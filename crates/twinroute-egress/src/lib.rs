//! TwinRoute Egress Connectors
//!
//! This crate provides the HTTP clients for the two upstream backends:
//! - OpenAI-format upstream (chat completions)
//! - Anthropic-format upstream (messages)
//! - Vendor compatibility patches applied to outgoing bodies

pub mod anthropic;
pub mod client;
pub mod error;
pub mod openai;
pub mod vendor;

pub use error::{EgressError, Result};
