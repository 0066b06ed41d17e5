//! Graph Events
//!
//! Every structural change to the dependency graph is described by a
//! [`GraphEvent`]. A runtime forwards these to any registered [`GraphHook`]
//! so that external tooling (a graph visualizer, a log collector) can follow
//! along without the core depending on it.
//!
//! Events are recorded while the graph is being mutated and dispatched once
//! the mutation is complete, so hooks never observe a half-updated graph and
//! may freely call the runtime's read-only introspection methods.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::node::{NodeId, NodeKind};

/// How a consumer's execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RunOutcome {
    /// The function returned normally.
    Completed,
    /// The function returned an ordinary error.
    Errored,
    /// The function raised a silent stop.
    Stopped { preserve: bool },
    /// The function unwound (panicked) before finishing.
    Abandoned,
}

/// A single change to the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum GraphEvent {
    NodeCreated {
        node: NodeId,
        kind: NodeKind,
        label: Option<String>,
    },
    NodeLabeled {
        node: NodeId,
        label: String,
    },
    NodeDisposed {
        node: NodeId,
    },
    EdgeAdded {
        producer: NodeId,
        consumer: NodeId,
    },
    EdgeRemoved {
        producer: NodeId,
        consumer: NodeId,
    },
    ValueSet {
        node: NodeId,
    },
    Invalidated {
        node: NodeId,
    },
    ExecutionStarted {
        node: NodeId,
    },
    ExecutionFinished {
        node: NodeId,
        outcome: RunOutcome,
    },
}

/// Receiver of graph events.
///
/// Hooks are called synchronously on the runtime's thread, after the graph
/// change they describe has been applied.
pub trait GraphHook {
    fn on_event(&self, event: &GraphEvent);
}

/// A graph event tagged with its position in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub event: GraphEvent,
}

#[derive(Debug, Default)]
struct LogInner {
    next_seq: u64,
    entries: Vec<LoggedEvent>,
}

/// A hook that records every event.
///
/// Clones share the same buffer. The buffer sits behind a mutex so a
/// diagnostics thread can drain it while the runtime keeps running.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<LogInner>>,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether no events are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the buffered events.
    pub fn snapshot(&self) -> Vec<LoggedEvent> {
        self.inner.lock().entries.clone()
    }

    /// Remove and return the buffered events. Sequence numbers keep counting.
    pub fn drain(&self) -> Vec<LoggedEvent> {
        std::mem::take(&mut self.inner.lock().entries)
    }

    /// Buffered events as newline-delimited JSON.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let inner = self.inner.lock();
        let mut out = String::new();
        for entry in &inner.entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl GraphHook for EventLog {
    fn on_event(&self, event: &GraphEvent) {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.push(LoggedEvent {
            seq,
            event: event.clone(),
        });
    }
}

/// A hook that forwards events to `tracing` at trace level.
#[derive(Debug, Clone, Default)]
pub struct TracingHook {
    label: String,
}

impl TracingHook {
    /// A hook that tags every event with the given runtime label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl GraphHook for TracingHook {
    fn on_event(&self, event: &GraphEvent) {
        tracing::trace!(runtime = %self.label, ?event, "graph event");
    }
}
