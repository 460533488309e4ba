//! TwinRoute Routing Engine
//!
//! This crate provides the routing logic for TwinRoute:
//! - Chat/work route selection with preprocessing demotion
//! - Dispatch to the selected upstream, translating where formats differ
//! - Tool-need detection on pre-check replies
//! - The escalation stage that re-dispatches to the work route

pub mod dispatch;
pub mod escalation;
pub mod orchestrator;
pub mod route;
pub mod tool_detector;

// Re-export commonly used types
pub use dispatch::{Dispatch, NativeDispatch, StreamEnvelope};
pub use escalation::{EscalationOutcome, process_with_escalation};
pub use orchestrator::{Orchestrator, RouteDecision};
pub use route::{ModelRoute, RouteKind};
pub use tool_detector::{TOOL_CALL_MARKER, needs_tool};
