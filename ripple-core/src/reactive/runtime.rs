//! Reactive Runtime
//!
//! The runtime is the central coordinator of one reactive domain (typically
//! one user session). It owns the dependency graph, the context stack and
//! the flush queue, and connects values, computed expressions and observers.
//!
//! # How It Works
//!
//! 1. Creating a value, computed or observer registers a node in the graph.
//!
//! 2. When a consumer runs, it is pushed onto the context stack. Every
//!    producer it reads records an edge to it.
//!
//! 3. When a value is set, the runtime:
//!    a. Invalidates every node reachable from it, erasing their edges
//!    b. Queues the observers among them
//!    c. Leaves computed nodes alone; they recompute on next read
//!
//! 4. [`Runtime::flush`] drains the queue, highest priority first. Running
//!    an observer re-reads its producers and rebuilds its edges from scratch.
//!
//! # Threading
//!
//! A runtime and all of its handles are `!Send`. Independent runtimes share
//! no state and may live on different threads.
//!
//! # Ownership
//!
//! [`Runtime`] is the only strong owner of the domain. Handles keep a
//! [`RuntimeHandle`] (a weak reference), so user closures that capture
//! handles never keep the domain alive. Dropping the `Runtime` tears down
//! every node at once.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, debug_span, error, trace, warn};

use super::computed::Computed;
use super::context::{ContextGuard, ContextStack, Frame};
use super::observer::{Observer, ObserverOptions};
use super::output::{Output, Rendered};
use super::value::Value;
use crate::config::RuntimeConfig;
use crate::error::{Interrupt, Outcome, ReactiveError, Result};
use crate::graph::{
    FlushQueue, Graph, GraphEvent, GraphHook, Invalidation, NodeId, NodeKind, NodeState, Role,
    RunOutcome, TracingHook,
};

/// How a runner's ordinary errors are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Boundary {
    /// Errors are fatal to the runtime.
    Observer,
    /// Errors were already rendered by the runner.
    Output,
}

/// The body of an observer, as seen by the flush loop.
pub(crate) struct Runner {
    body: Box<dyn Fn() -> Outcome<()>>,
    boundary: Boundary,
}

impl Runner {
    pub(crate) fn new(body: Box<dyn Fn() -> Outcome<()>>, boundary: Boundary) -> Self {
        Self { body, boundary }
    }
}

type Callback = Box<dyn FnOnce()>;

/// Classify a run for diagnostics.
pub(crate) fn run_outcome<T>(outcome: &Outcome<T>) -> RunOutcome {
    match outcome {
        Ok(_) => RunOutcome::Completed,
        Err(Interrupt::Error(_)) => RunOutcome::Errored,
        Err(Interrupt::Stop { preserve }) => RunOutcome::Stopped {
            preserve: *preserve,
        },
    }
}

/// Shared state of one reactive domain.
pub(crate) struct RuntimeInner {
    config: RuntimeConfig,
    graph: RefCell<Graph>,
    context: RefCell<ContextStack>,
    queue: RefCell<FlushQueue>,
    runners: RefCell<HashMap<NodeId, Rc<Runner>>>,
    on_invalidate: RefCell<HashMap<NodeId, Vec<Callback>>>,
    hooks: RefCell<Vec<Rc<dyn GraphHook>>>,
    flushing: Cell<bool>,
    terminated: Cell<bool>,
}

/// Marks a consumer as running and finishes the run on every exit path.
pub(crate) struct RunGuard<'a> {
    runtime: &'a RuntimeInner,
    node: NodeId,
    finished: bool,
}

impl RunGuard<'_> {
    /// Finish the run. Returns whether the node is now valid.
    pub(crate) fn finish(mut self, outcome: RunOutcome) -> bool {
        self.finished = true;
        let valid = self.runtime.graph.borrow_mut().finish_run(self.node, outcome);
        self.runtime.dispatch();
        valid
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Unwinding out of user code. An abandoned observer lost its edges,
        // so it goes back on the queue or nothing would ever run it again.
        let requeue = match self.runtime.graph.try_borrow_mut() {
            Ok(mut graph) => {
                graph.finish_run(self.node, RunOutcome::Abandoned);
                graph
                    .get_node(self.node)
                    .filter(|node| {
                        node.is_observer()
                            && !node.is_suspended()
                            && node.state() == NodeState::Invalidated
                    })
                    .map(|node| node.priority())
            }
            Err(_) => None,
        };
        if let Some(priority) = requeue {
            if let Ok(mut queue) = self.runtime.queue.try_borrow_mut() {
                queue.push(self.node, priority);
            }
        }
    }
}

/// Resets the flushing flag when the flush loop exits.
struct FlushReset<'a>(&'a Cell<bool>);

impl Drop for FlushReset<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl RuntimeInner {
    fn new(config: RuntimeConfig) -> Self {
        let mut hooks: Vec<Rc<dyn GraphHook>> = Vec::new();
        if config.trace_events {
            hooks.push(Rc::new(TracingHook::new(config.label.clone())));
        }
        Self {
            config,
            graph: RefCell::new(Graph::new()),
            context: RefCell::new(ContextStack::new()),
            queue: RefCell::new(FlushQueue::new()),
            runners: RefCell::new(HashMap::new()),
            on_invalidate: RefCell::new(HashMap::new()),
            hooks: RefCell::new(hooks),
            flushing: Cell::new(false),
            terminated: Cell::new(false),
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    pub(crate) fn add_node(&self, role: Role, label: Option<String>) -> NodeId {
        let id = self.graph.borrow_mut().add_node(role, label);
        self.dispatch();
        id
    }

    pub(crate) fn add_observer(&self, options: ObserverOptions, runner: Runner) -> NodeId {
        let id = self.graph.borrow_mut().add_node(
            Role::observer(options.priority, options.suspended),
            options.label,
        );
        self.runners.borrow_mut().insert(id, Rc::new(runner));
        if !options.suspended {
            self.queue.borrow_mut().push(id, options.priority);
        }
        self.dispatch();
        id
    }

    pub(crate) fn set_label(&self, node: NodeId, label: String) {
        self.graph.borrow_mut().set_label(node, label);
        self.dispatch();
    }

    pub(crate) fn dispose(&self, node: NodeId) {
        let removed = self.graph.borrow_mut().remove_node(node).is_some();
        self.queue.borrow_mut().remove(node);
        let runner = self.runners.borrow_mut().remove(&node);
        let callbacks = self.on_invalidate.borrow_mut().remove(&node);
        if removed {
            trace!(runtime = %self.config.label, %node, "observer disposed");
        }
        self.dispatch();

        // User closures are dropped outside of any borrow.
        drop(runner);
        drop(callbacks);
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    /// Record that the running consumer (if any) read `producer`.
    pub(crate) fn record_read(&self, producer: NodeId) {
        let Some(consumer) = self.context.borrow().tracking() else {
            return;
        };
        let stale = {
            let mut graph = self.graph.borrow_mut();
            if graph.state(producer) == Some(NodeState::Invalidated) {
                true
            } else {
                graph.add_edge(producer, consumer);
                false
            }
        };
        if stale {
            // The producer was invalidated while producing what was just
            // read, so the reader is out of date as well.
            self.invalidate(consumer);
        } else {
            self.dispatch();
        }
    }

    pub(crate) fn enter(&self, frame: Frame) -> ContextGuard<'_> {
        ContextGuard::enter(&self.context, frame)
    }

    pub(crate) fn isolate<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter(Frame::Isolated);
        f()
    }

    pub(crate) fn begin_run(&self, node: NodeId) -> RunGuard<'_> {
        self.graph.borrow_mut().begin_run(node);
        self.dispatch();
        RunGuard {
            runtime: self,
            node,
            finished: false,
        }
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    pub(crate) fn value_changed(&self, node: NodeId) {
        let report = {
            let mut graph = self.graph.borrow_mut();
            graph.record(GraphEvent::ValueSet { node });
            graph.invalidate(node)
        };
        self.schedule(report);
    }

    pub(crate) fn invalidate(&self, node: NodeId) {
        let report = self.graph.borrow_mut().invalidate(node);
        self.schedule(report);
    }

    fn schedule(&self, report: Invalidation) {
        {
            let mut queue = self.queue.borrow_mut();
            for &(observer, priority) in &report.observers {
                queue.push(observer, priority);
            }
        }
        let callbacks: Vec<Callback> = {
            let mut registered = self.on_invalidate.borrow_mut();
            report
                .invalidated
                .iter()
                .filter_map(|node| registered.remove(node))
                .flatten()
                .collect()
        };
        if !report.is_empty() {
            trace!(
                runtime = %self.config.label,
                invalidated = report.invalidated.len(),
                queued = report.observers.len(),
                deferred = report.deferred.len(),
                "invalidation propagated"
            );
        }
        self.dispatch();
        for callback in callbacks {
            callback();
        }
    }

    pub(crate) fn on_invalidate(&self, node: NodeId, callback: Callback) {
        if self.graph.borrow().get_node(node).is_none() {
            return;
        }
        self.on_invalidate
            .borrow_mut()
            .entry(node)
            .or_default()
            .push(callback);
    }

    pub(crate) fn set_suspended(&self, node: NodeId, suspended: bool) {
        let report = {
            let mut graph = self.graph.borrow_mut();
            let Some(entry) = graph.get_node_mut(node) else {
                return;
            };
            let state = entry.state();
            let priority = entry.priority();
            let Some(meta) = entry.observer_meta_mut() else {
                return;
            };
            if meta.suspended == suspended {
                return;
            }
            meta.suspended = suspended;

            if suspended {
                None
            } else if state == NodeState::Invalidated {
                // Never ran, or was dropped from the queue while suspended.
                meta.pending = false;
                Some(Invalidation {
                    observers: vec![(node, priority)],
                    ..Invalidation::default()
                })
            } else if std::mem::take(&mut meta.pending) {
                Some(graph.invalidate(node))
            } else {
                None
            }
        };

        trace!(runtime = %self.config.label, %node, suspended, "observer suspension changed");
        match report {
            Some(report) => self.schedule(report),
            None if suspended => {
                self.queue.borrow_mut().remove(node);
            }
            None => {}
        }
    }

    // ------------------------------------------------------------------
    // Flush
    // ------------------------------------------------------------------

    pub(crate) fn flush(&self) -> Result<()> {
        if self.terminated.get() {
            return Err(ReactiveError::Terminated);
        }
        if self.flushing.replace(true) {
            // The outer flush drains whatever this one would have run.
            trace!(runtime = %self.config.label, "nested flush ignored");
            return Ok(());
        }
        let _reset = FlushReset(&self.flushing);
        let _span = debug_span!("flush", runtime = %self.config.label).entered();

        let mut executed = 0usize;
        while let Some((node, priority)) = self.next_runnable() {
            if let Some(limit) = self.config.flush_limit {
                if executed >= limit {
                    self.queue.borrow_mut().push(node, priority);
                    error!(limit, pending = self.queue.borrow().len(), "flush limit exceeded");
                    return Err(ReactiveError::FlushLimitExceeded { limit });
                }
            }
            executed += 1;
            self.execute_observer(node)?;
        }

        debug!(executed, "flush complete");
        Ok(())
    }

    /// Pop the next observer that is invalidated and not suspended.
    fn next_runnable(&self) -> Option<(NodeId, i32)> {
        loop {
            let node = self.queue.borrow_mut().pop()?;
            let graph = self.graph.borrow();
            match graph.get_node(node) {
                Some(entry)
                    if entry.state() == NodeState::Invalidated && !entry.is_suspended() =>
                {
                    return Some((node, entry.priority()));
                }
                _ => continue,
            }
        }
    }

    fn execute_observer(&self, node: NodeId) -> Result<()> {
        let Some(runner) = self.runners.borrow().get(&node).cloned() else {
            return Ok(());
        };

        let run = self.begin_run(node);
        let outcome = {
            let _guard = self.enter(Frame::Consumer(node));
            (runner.body)()
        };
        let valid = run.finish(run_outcome(&outcome));
        trace!(%node, valid, "observer executed");

        match outcome {
            Ok(()) | Err(Interrupt::Stop { .. }) => Ok(()),
            Err(Interrupt::Error(_)) if runner.boundary == Boundary::Output => Ok(()),
            Err(Interrupt::Error(error)) => {
                let label = self.label_of(node);
                warn!(
                    runtime = %self.config.label,
                    %node,
                    %label,
                    %error,
                    "observer failed, terminating runtime"
                );
                self.terminated.set(true);
                Err(ReactiveError::ObserverFailed { node, label, error })
            }
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    pub(crate) fn add_hook(&self, hook: Rc<dyn GraphHook>) {
        self.hooks.borrow_mut().push(hook);
    }

    /// Deliver journaled graph events to the hooks.
    fn dispatch(&self) {
        let events = self.graph.borrow_mut().take_events();
        if events.is_empty() {
            return;
        }
        let hooks = self.hooks.borrow().clone();
        for event in &events {
            for hook in &hooks {
                hook.on_event(event);
            }
        }
    }

    pub(crate) fn node_state(&self, node: NodeId) -> Option<NodeState> {
        self.graph.borrow().state(node)
    }

    pub(crate) fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.graph.borrow().get_node(node).map(|entry| entry.kind())
    }

    pub(crate) fn is_suspended(&self, node: NodeId) -> bool {
        self.graph
            .borrow()
            .get_node(node)
            .map_or(false, |entry| entry.is_suspended())
    }

    pub(crate) fn priority_of(&self, node: NodeId) -> Option<i32> {
        self.graph.borrow().get_node(node).map(|entry| entry.priority())
    }

    pub(crate) fn label_of(&self, node: NodeId) -> String {
        self.graph
            .borrow()
            .get_node(node)
            .map(|entry| entry.display_name())
            .unwrap_or_else(|| node.to_string())
    }

    pub(crate) fn dependencies_of(&self, node: NodeId) -> Vec<NodeId> {
        self.graph.borrow().dependencies_of(node)
    }

    pub(crate) fn dependents_of(&self, node: NodeId) -> Vec<NodeId> {
        self.graph.borrow().dependents_of(node)
    }
}

/// One reactive domain.
///
/// # Example
///
/// ```rust
/// use ripple_core::Runtime;
///
/// let rt = Runtime::new();
/// let celsius = rt.value(10.0);
///
/// let fahrenheit = rt.computed({
///     let celsius = celsius.clone();
///     move || Ok(celsius.get() * 9.0 / 5.0 + 32.0)
/// });
/// assert_eq!(fahrenheit.get().unwrap(), 50.0);
///
/// celsius.set(100.0);
/// assert_eq!(fahrenheit.get().unwrap(), 212.0);
/// ```
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime from an explicit configuration.
    ///
    /// With `trace_events` set, a [`TracingHook`] is installed before any
    /// node exists.
    pub fn with_config(config: RuntimeConfig) -> Self {
        debug!(runtime = %config.label, "runtime created");
        Self {
            inner: Rc::new(RuntimeInner::new(config)),
        }
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// A weak handle for use inside user closures.
    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Create a value node.
    pub fn value<T: 'static>(&self, initial: T) -> Value<T> {
        Value::new(&self.inner, self.handle(), initial)
    }

    /// Create a computed node. `compute` does not run until the first read.
    pub fn computed<T, F>(&self, compute: F) -> Computed<T>
    where
        T: 'static,
        F: Fn() -> Outcome<T> + 'static,
    {
        Computed::new(&self.inner, self.handle(), Box::new(compute))
    }

    /// Create an observer with default options. It first runs on the next
    /// flush.
    pub fn observer<F>(&self, run: F) -> Observer
    where
        F: Fn() -> Outcome<()> + 'static,
    {
        self.observer_with(ObserverOptions::default(), run)
    }

    /// Create an observer with a priority, label, or initial suspension.
    pub fn observer_with<F>(&self, options: ObserverOptions, run: F) -> Observer
    where
        F: Fn() -> Outcome<()> + 'static,
    {
        let runner = Runner::new(Box::new(run), Boundary::Observer);
        Observer::new(self.inner.add_observer(options, runner), self.handle())
    }

    /// Create an observer that re-runs only when `trigger` changes.
    ///
    /// `trigger` runs tracked; `handler` runs isolated with its result, so
    /// nothing `handler` reads becomes a dependency.
    pub fn observe_event<E, Tr, H>(&self, trigger: Tr, handler: H) -> Observer
    where
        E: 'static,
        Tr: Fn() -> Outcome<E> + 'static,
        H: Fn(E) -> Outcome<()> + 'static,
    {
        let handle = self.handle();
        self.observer(move || {
            let event = trigger()?;
            handle.isolate(|| handler(event))
        })
    }

    /// Create an output: an observer that renders its result.
    ///
    /// Each time `render` produces something new, `sink` receives it.
    /// Ordinary errors are rendered rather than terminating the runtime.
    pub fn output<T, F, S>(&self, render: F, sink: S) -> Output<T>
    where
        T: 'static,
        F: Fn() -> Outcome<T> + 'static,
        S: Fn(&Rendered<T>) + 'static,
    {
        self.output_with(ObserverOptions::default(), render, sink)
    }

    pub fn output_with<T, F, S>(&self, options: ObserverOptions, render: F, sink: S) -> Output<T>
    where
        T: 'static,
        F: Fn() -> Outcome<T> + 'static,
        S: Fn(&Rendered<T>) + 'static,
    {
        Output::new(&self.inner, self.handle(), options, Box::new(render), Box::new(sink))
    }

    /// Run `f` without recording any dependencies.
    pub fn isolate<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.isolate(f)
    }

    /// Run every queued observer.
    ///
    /// Observers queued while flushing run in the same call. Returns an
    /// error if an observer fails (the runtime is then terminated) or the
    /// configured flush limit is exceeded.
    pub fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    /// Register a hook that receives every graph event.
    pub fn add_hook(&self, hook: impl GraphHook + 'static) {
        self.inner.add_hook(Rc::new(hook));
    }

    /// Whether an observer failure terminated this runtime.
    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.get()
    }

    /// State of a node, or `None` if it does not exist.
    pub fn node_state(&self, node: NodeId) -> Option<NodeState> {
        self.inner.node_state(node)
    }

    /// Kind of a node, or `None` if it does not exist.
    pub fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.inner.node_kind(node)
    }

    /// Label of a node, or `kind#id` if it has none.
    pub fn label_of(&self, node: NodeId) -> String {
        self.inner.label_of(node)
    }

    /// Producers `node` read during its current run.
    pub fn dependencies_of(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.dependencies_of(node)
    }

    /// Consumers that will be invalidated when `node` changes.
    pub fn dependents_of(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.dependents_of(node)
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.inner.graph.borrow().node_count()
    }

    /// Number of dependency edges currently recorded.
    pub fn edge_count(&self) -> usize {
        self.inner.graph.borrow().edge_count()
    }

    /// Observers waiting for the next flush, in the order they will run.
    pub fn pending_observers(&self) -> Vec<NodeId> {
        self.inner.queue.borrow().pending()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("label", &self.config().label)
            .field("node_count", &self.node_count())
            .field("pending", &self.inner.queue.borrow().len())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// Weak reference to a [`Runtime`].
///
/// Safe to capture in user closures. Once the runtime is dropped, isolated
/// blocks simply run and flushes report [`ReactiveError::TornDown`].
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
}

impl RuntimeHandle {
    pub(crate) fn upgrade(&self) -> Option<Rc<RuntimeInner>> {
        self.inner.upgrade()
    }

    /// Whether the owning [`Runtime`] still exists.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Run `f` without recording any dependencies.
    pub fn isolate<R>(&self, f: impl FnOnce() -> R) -> R {
        match self.upgrade() {
            Some(runtime) => runtime.isolate(f),
            None => f(),
        }
    }

    /// Same as [`Runtime::flush`]. A no-op when called from inside a flush.
    pub fn flush(&self) -> Result<()> {
        self.upgrade().ok_or(ReactiveError::TornDown)?.flush()
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EventLog;
    use std::cell::Cell;

    #[test]
    fn observer_runs_on_first_flush() {
        let rt = Runtime::new();
        let runs = Rc::new(Cell::new(0));

        let observer = rt.observer({
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                Ok(())
            }
        });

        assert_eq!(rt.pending_observers(), vec![observer.id()]);
        assert_eq!(runs.get(), 0);

        rt.flush().unwrap();
        assert_eq!(runs.get(), 1);
        assert_eq!(rt.node_state(observer.id()), Some(NodeState::Valid));

        // Nothing changed, nothing runs.
        rt.flush().unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn set_queues_dependents_without_running_them() {
        let rt = Runtime::new();
        let x = rt.value(1);
        let seen = Rc::new(Cell::new(0));

        rt.observer({
            let x = x.clone();
            let seen = seen.clone();
            move || {
                seen.set(x.get());
                Ok(())
            }
        });
        rt.flush().unwrap();
        assert_eq!(seen.get(), 1);

        x.set(2);
        x.set(3);
        assert_eq!(seen.get(), 1);
        assert_eq!(rt.pending_observers().len(), 1);

        rt.flush().unwrap();
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn higher_priority_runs_first() {
        let rt = Runtime::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (name, priority) in [("low", -1), ("high", 10), ("mid", 0)] {
            let order = order.clone();
            rt.observer_with(ObserverOptions::new().priority(priority), move || {
                order.borrow_mut().push(name);
                Ok(())
            });
        }

        rt.flush().unwrap();
        assert_eq!(*order.borrow(), vec!["high", "mid", "low"]);
    }

    #[test]
    fn observer_error_terminates_runtime() {
        let rt = Runtime::new();
        let observer = rt.observer_with(ObserverOptions::new().label("writer"), || {
            Err(Interrupt::msg("disk full"))
        });

        let err = rt.flush().unwrap_err();
        match err {
            ReactiveError::ObserverFailed { node, label, error } => {
                assert_eq!(node, observer.id());
                assert_eq!(label, "writer");
                assert_eq!(error.to_string(), "disk full");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(rt.is_terminated());
        assert!(matches!(rt.flush(), Err(ReactiveError::Terminated)));
    }

    #[test]
    fn silent_stop_is_absorbed_by_observer() {
        let rt = Runtime::new();
        let flag = rt.value(false);

        let observer = rt.observer({
            let flag = flag.clone();
            move || {
                crate::require(flag.get())?;
                Ok(())
            }
        });

        rt.flush().unwrap();
        assert!(!rt.is_terminated());
        // Still subscribed to what it read before stopping.
        assert_eq!(rt.dependencies_of(observer.id()), vec![flag.id()]);
    }

    #[test]
    fn flush_limit_stops_runaway_loops() {
        let rt = Runtime::with_config(RuntimeConfig::default().with_flush_limit(5));
        let x = rt.value(0);

        // Reads and writes the same value without isolation.
        rt.observer({
            let x = x.clone();
            move || {
                x.set(x.get() + 1);
                Ok(())
            }
        });

        let err = rt.flush().unwrap_err();
        assert!(matches!(err, ReactiveError::FlushLimitExceeded { limit: 5 }));
        assert_eq!(x.get_untracked(), 5);
        assert_eq!(rt.pending_observers().len(), 1);
        assert!(!rt.is_terminated());
    }

    #[test]
    fn nested_flush_is_a_no_op() {
        let rt = Runtime::new();
        let handle = rt.handle();
        let runs = Rc::new(Cell::new(0));

        rt.observer({
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                handle.flush().unwrap();
                Ok(())
            }
        });

        rt.flush().unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn observers_queued_during_flush_run_in_same_flush() {
        let rt = Runtime::new();
        let stage = rt.value(0);
        let seen = Rc::new(Cell::new(0));

        let reader = rt.observer_with(ObserverOptions::new().priority(1), {
            let stage = stage.clone();
            let seen = seen.clone();
            move || {
                seen.set(stage.get());
                Ok(())
            }
        });
        rt.observer({
            let stage = stage.clone();
            move || {
                stage.set(1);
                Ok(())
            }
        });

        // The reader runs first, then is invalidated by the writer.
        rt.flush().unwrap();
        assert_eq!(seen.get(), 1);
        assert_eq!(rt.node_state(reader.id()), Some(NodeState::Valid));
        assert!(rt.pending_observers().is_empty());
    }

    #[test]
    fn hooks_receive_events() {
        let rt = Runtime::new();
        let log = EventLog::new();
        rt.add_hook(log.clone());

        let x = rt.value(1);
        let observer = rt.observer({
            let x = x.clone();
            move || {
                x.get();
                Ok(())
            }
        });
        rt.flush().unwrap();
        x.set(2);

        let events: Vec<GraphEvent> = log.drain().into_iter().map(|e| e.event).collect();
        assert!(events.contains(&GraphEvent::EdgeAdded {
            producer: x.id(),
            consumer: observer.id(),
        }));
        assert!(events.contains(&GraphEvent::ExecutionFinished {
            node: observer.id(),
            outcome: RunOutcome::Completed,
        }));
        assert!(events.contains(&GraphEvent::ValueSet { node: x.id() }));
        assert!(events.contains(&GraphEvent::Invalidated {
            node: observer.id()
        }));
    }

    #[test]
    fn handle_outlives_runtime() {
        let rt = Runtime::new();
        let handle = rt.handle();
        assert!(handle.is_alive());

        drop(rt);
        assert!(!handle.is_alive());
        assert_eq!(handle.isolate(|| 7), 7);
        assert!(matches!(handle.flush(), Err(ReactiveError::TornDown)));
    }
}
