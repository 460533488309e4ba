//! TwinRoute Core Types and Traits
//!
//! This crate provides the fundamental types shared across TwinRoute:
//! - OpenAI and Anthropic wire types
//! - Protocol translation between the two schemas
//! - The upstream and recorder trait abstractions
//! - Core error types

pub mod anthropic;
pub mod error;
pub mod format;
pub mod openai;
pub mod provider;
pub mod recorder;
pub mod tool_args;
pub mod translate;

pub use error::{Error, Result};
pub use format::ApiFormat;
pub use tool_args::ToolArguments;
