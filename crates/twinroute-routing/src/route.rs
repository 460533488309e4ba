//! Route definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use twinroute_core::{ApiFormat, provider::Upstream};

/// Which of the two configured backends a request goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// The cheap model; also the fallback for unknown model names
    Chat,
    /// The expensive model
    Work,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Chat => "chat",
            RouteKind::Work => "work",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named upstream backend, resolved once at startup
#[derive(Clone)]
pub struct ModelRoute {
    /// Model name callers put in requests to select this route
    pub name: String,
    /// Model id substituted into the outgoing request
    pub model_id: String,
    pub upstream: Arc<dyn Upstream>,
}

impl ModelRoute {
    pub fn new(
        name: impl Into<String>,
        model_id: impl Into<String>,
        upstream: Arc<dyn Upstream>,
    ) -> Self {
        Self {
            name: name.into(),
            model_id: model_id.into(),
            upstream,
        }
    }

    pub fn format(&self) -> ApiFormat {
        self.upstream.format()
    }
}

impl fmt::Debug for ModelRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRoute")
            .field("name", &self.name)
            .field("model_id", &self.model_id)
            .field("format", &self.format())
            .finish()
    }
}
