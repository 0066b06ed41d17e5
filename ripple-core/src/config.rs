//! Runtime Configuration
//!
//! Settings for one runtime. Every field has a default, so a configuration
//! document only needs to mention what it changes:
//!
//! ```json
//! { "label": "session-42", "flush_limit": 10000 }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Name used in log spans and diagnostics.
    pub label: String,

    /// Maximum number of observer executions in a single flush.
    ///
    /// `None` drains the queue no matter how long it takes. With a limit, a
    /// flush that hits it stops with
    /// [`ReactiveError::FlushLimitExceeded`](crate::ReactiveError::FlushLimitExceeded)
    /// and leaves the rest of the queue for the next flush.
    pub flush_limit: Option<usize>,

    /// Install a [`TracingHook`](crate::graph::TracingHook) that logs every
    /// graph event at trace level.
    pub trace_events: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            label: "runtime".to_string(),
            flush_limit: None,
            trace_events: false,
        }
    }
}

impl RuntimeConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_flush_limit(mut self, limit: usize) -> Self {
        self.flush_limit = Some(limit);
        self
    }

    pub fn with_trace_events(mut self, enabled: bool) -> Self {
        self.trace_events = enabled;
        self
    }
}
