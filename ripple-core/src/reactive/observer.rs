//! Observers
//!
//! Observers are the eager end of the graph. They run for their side
//! effects, are queued when invalidated, and execute on the next flush in
//! priority order.
//!
//! A suspended observer is never run. Invalidations that reach it while
//! suspended are remembered and replayed once it resumes, so the observer
//! runs at most once no matter how many changes it missed.

use std::fmt;

use super::runtime::RuntimeHandle;
use crate::graph::{NodeId, NodeState};

/// Options for [`Runtime::observer_with`](super::Runtime::observer_with).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserverOptions {
    /// Higher runs first within a flush.
    pub priority: i32,
    pub label: Option<String>,
    /// Start suspended. The observer does not run until resumed.
    pub suspended: bool,
}

impl ObserverOptions {
    /// Default options: priority 0, no label, not suspended.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the priority. Higher runs first within a flush.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the label used in logs and diagnostics.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Create the observer suspended.
    pub fn suspended(mut self, suspended: bool) -> Self {
        self.suspended = suspended;
        self
    }
}

/// Handle to an observer.
#[derive(Clone)]
pub struct Observer {
    id: NodeId,
    rt: RuntimeHandle,
}

impl Observer {
    pub(crate) fn new(id: NodeId, rt: RuntimeHandle) -> Self {
        Self { id, rt }
    }

    /// Id of the observer node.
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

    /// Current state, or `None` once disposed.
    pub fn state(&self) -> Option<NodeState> {
        self.rt.upgrade().and_then(|rt| rt.node_state(self.id))
    }

    /// Scheduling priority, or `None` once disposed.
    pub fn priority(&self) -> Option<i32> {
        self.rt.upgrade().and_then(|rt| rt.priority_of(self.id))
    }

    /// Suspend or resume the observer.
    ///
    /// Resuming queues the observer if it was invalidated before or during
    /// the suspension.
    pub fn set_suspended(&self, suspended: bool) {
        if let Some(rt) = self.rt.upgrade() {
            rt.set_suspended(self.id, suspended);
        }
    }

    /// Whether the observer is currently suspended.
    pub fn is_suspended(&self) -> bool {
        self.rt
            .upgrade()
            .map_or(false, |rt| rt.is_suspended(self.id))
    }

    /// Run `callback` the next time this observer is invalidated.
    ///
    /// Callbacks fire once. Register again from the observer body to hear
    /// about every invalidation.
    pub fn on_invalidate(&self, callback: impl FnOnce() + 'static) {
        if let Some(rt) = self.rt.upgrade() {
            rt.on_invalidate(self.id, Box::new(callback));
        }
    }

    /// Remove the observer from the graph. It never runs again.
    pub fn dispose(&self) {
        if let Some(rt) = self.rt.upgrade() {
            rt.dispose(self.id);
        }
    }

    /// Whether the observer was disposed (or its runtime dropped).
    pub fn is_disposed(&self) -> bool {
        self.state().is_none()
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Runtime;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn counting(
        rt: &Runtime,
        source: &crate::Value<i32>,
        options: ObserverOptions,
    ) -> (Observer, Rc<Cell<u32>>) {
        let runs = Rc::new(Cell::new(0));
        let observer = rt.observer_with(options, {
            let source = source.clone();
            let runs = runs.clone();
            move || {
                source.get();
                runs.set(runs.get() + 1);
                Ok(())
            }
        });
        (observer, runs)
    }

    #[test]
    fn suspended_observer_replays_once_on_resume() {
        let rt = Runtime::new();
        let x = rt.value(0);
        let (observer, runs) = counting(&rt, &x, ObserverOptions::new());
        rt.flush().unwrap();
        assert_eq!(runs.get(), 1);

        observer.set_suspended(true);
        assert!(observer.is_suspended());
        x.set(1);
        x.set(2);
        rt.flush().unwrap();
        assert_eq!(runs.get(), 1);
        // Edges survive suspension.
        assert_eq!(observer.state(), Some(NodeState::Valid));

        observer.set_suspended(false);
        rt.flush().unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn resume_without_changes_does_not_run() {
        let rt = Runtime::new();
        let x = rt.value(0);
        let (observer, runs) = counting(&rt, &x, ObserverOptions::new());
        rt.flush().unwrap();

        observer.set_suspended(true);
        observer.set_suspended(false);
        rt.flush().unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn initially_suspended_runs_after_resume() {
        let rt = Runtime::new();
        let x = rt.value(0);
        let (observer, runs) = counting(&rt, &x, ObserverOptions::new().suspended(true));

        rt.flush().unwrap();
        assert_eq!(runs.get(), 0);
        assert!(rt.pending_observers().is_empty());

        observer.set_suspended(false);
        rt.flush().unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn disposed_observer_never_runs() {
        let rt = Runtime::new();
        let x = rt.value(0);
        let (observer, runs) = counting(&rt, &x, ObserverOptions::new());
        rt.flush().unwrap();

        x.set(1);
        observer.dispose();
        rt.flush().unwrap();
        assert_eq!(runs.get(), 1);
        assert!(observer.is_disposed());
        assert!(rt.dependents_of(x.id()).is_empty());

        x.set(2);
        rt.flush().unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn on_invalidate_fires_once() {
        let rt = Runtime::new();
        let x = rt.value(0);
        let (observer, _) = counting(&rt, &x, ObserverOptions::new().label("watcher"));
        rt.flush().unwrap();

        let fired = Rc::new(RefCell::new(Vec::new()));
        observer.on_invalidate({
            let fired = fired.clone();
            move || fired.borrow_mut().push("invalidated")
        });

        x.set(1);
        x.set(2);
        assert_eq!(*fired.borrow(), vec!["invalidated"]);
        assert_eq!(rt.label_of(observer.id()), "watcher");
    }

    #[test]
    fn observe_event_ignores_handler_reads() {
        let rt = Runtime::new();
        let clicks = rt.value(0);
        let other = rt.value("a");
        let log = Rc::new(RefCell::new(Vec::new()));

        rt.observe_event(
            {
                let clicks = clicks.clone();
                move || Ok(clicks.get())
            },
            {
                let other = other.clone();
                let log = log.clone();
                move |count| {
                    log.borrow_mut().push(format!("{count}:{}", other.get()));
                    Ok(())
                }
            },
        );

        rt.flush().unwrap();
        other.set("b");
        rt.flush().unwrap();
        clicks.set(1);
        rt.flush().unwrap();

        assert_eq!(*log.borrow(), vec!["0:a", "1:b"]);
    }
}
