//! TwinRoute server assembly
//!
//! Configuration loading, JSONL recorders and the router builder used by the
//! `twinroute-server` binary and the end-to-end tests.

pub mod app;
pub mod config;
pub mod recorder;

pub use app::{BuildError, build_app, build_upstream};
pub use config::{ConfigError, LogFormat, ServerConfig};
pub use recorder::JsonlRecorder;
