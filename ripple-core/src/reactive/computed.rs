//! Computed Expressions
//!
//! A computed node caches the result of a function of other producers. It
//! is lazy: invalidation only marks it, and the function runs again on the
//! next read.
//!
//! The cache holds whatever the last run produced, so a failed run is cached
//! just like a successful one. Reading a computed that last failed re-raises
//! the same [`ComputeError`] object without running the function again.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::context::Frame;
use super::runtime::{run_outcome, RuntimeHandle, RuntimeInner};
use crate::error::{ComputeError, Interrupt, Outcome, ReactiveError};
use crate::graph::{NodeId, NodeState, Role};

enum Cached<T> {
    Value(T),
    Error(ComputeError),
    Stopped { preserve: bool },
}

impl<T> From<Outcome<T>> for Cached<T> {
    fn from(outcome: Outcome<T>) -> Self {
        match outcome {
            Ok(value) => Cached::Value(value),
            Err(Interrupt::Error(error)) => Cached::Error(error),
            Err(Interrupt::Stop { preserve }) => Cached::Stopped { preserve },
        }
    }
}

struct ComputedBody<T> {
    compute: Box<dyn Fn() -> Outcome<T>>,
    cache: RefCell<Option<Cached<T>>>,
    runs: Cell<u64>,
}

/// A lazily evaluated, cached reactive expression.
///
/// Cloning a `Computed` creates another handle to the same node and cache.
pub struct Computed<T> {
    id: NodeId,
    rt: RuntimeHandle,
    body: Rc<ComputedBody<T>>,
}

impl<T: 'static> Computed<T> {
    pub(crate) fn new(
        inner: &RuntimeInner,
        rt: RuntimeHandle,
        compute: Box<dyn Fn() -> Outcome<T>>,
    ) -> Self {
        let id = inner.add_node(Role::Computed, None);
        Self {
            id,
            rt,
            body: Rc::new(ComputedBody {
                compute,
                cache: RefCell::new(None),
                runs: Cell::new(0),
            }),
        }
    }

    /// Id of the computed node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Attach a label for logs and diagnostics.
    pub fn labeled(self, label: impl Into<String>) -> Self {
        if let Some(rt) = self.rt.upgrade() {
            rt.set_label(self.id, label.into());
        }
        self
    }

    /// Current state, or `None` once the runtime is gone.
    pub fn state(&self) -> Option<NodeState> {
        self.rt.upgrade().and_then(|rt| rt.node_state(self.id))
    }

    /// How many times the function has run.
    pub fn run_count(&self) -> u64 {
        self.body.runs.get()
    }

    /// Read the cached result, recomputing first if invalidated.
    ///
    /// # Panics
    ///
    /// Panics if the computed reads itself while running (a cycle).
    pub fn get(&self) -> Outcome<T>
    where
        T: Clone,
    {
        let Some(rt) = self.rt.upgrade() else {
            return Err(ReactiveError::TornDown.into());
        };

        match rt.node_state(self.id) {
            Some(NodeState::Valid) => {}
            Some(NodeState::Invalidated) => self.evaluate(&rt),
            Some(NodeState::Running) => {
                panic!(
                    "cycle detected: {} was read while it was running",
                    rt.label_of(self.id)
                );
            }
            None => return Err(ReactiveError::TornDown.into()),
        }

        rt.record_read(self.id);

        match self.body.cache.borrow().as_ref() {
            Some(Cached::Value(value)) => Ok(value.clone()),
            Some(Cached::Error(error)) => Err(Interrupt::Error(error.clone())),
            Some(Cached::Stopped { preserve }) => Err(Interrupt::Stop {
                preserve: *preserve,
            }),
            None => unreachable!("computed {} has no cached result", self.id),
        }
    }

    /// Read without recording a dependency.
    pub fn get_untracked(&self) -> Outcome<T>
    where
        T: Clone,
    {
        self.rt.isolate(|| self.get())
    }

    fn evaluate(&self, rt: &RuntimeInner) {
        let run = rt.begin_run(self.id);
        let outcome = {
            let _guard = rt.enter(Frame::Consumer(self.id));
            (self.body.compute)()
        };
        let valid = run.finish(run_outcome(&outcome));
        self.body.runs.set(self.body.runs.get() + 1);
        tracing::trace!(node = %self.id, valid, "computed evaluated");

        // Kept even when invalidated mid-run; the next read runs again.
        *self.body.cache.borrow_mut() = Some(Cached::from(outcome));
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            rt: self.rt.clone(),
            body: self.body.clone(),
        }
    }
}

impl<T> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id)
            .field("runs", &self.body.runs.get())
            .finish()
    }
}
