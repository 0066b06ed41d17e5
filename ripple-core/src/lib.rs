//! Ripple Core
//!
//! This crate provides a reactive runtime: a dependency graph that knows
//! which computations must re-run when a piece of state changes. It
//! implements:
//!
//! - Reactive primitives (values, computed expressions, observers, outputs)
//! - Automatic dependency tracking with per-run edge discovery
//! - Priority-ordered flushing of invalidated observers
//! - Error and silent-stop propagation through the graph
//!
//! # Architecture
//!
//! - `graph`: nodes, edges, invalidation and the flush queue
//! - `reactive`: the runtime and the handles user code works with
//!
//! Every runtime is an independent, single-threaded domain. Hosts that serve
//! many sessions create one runtime per session.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use ripple_core::Runtime;
//!
//! let rt = Runtime::new();
//!
//! // Create a value
//! let count = rt.value(0);
//!
//! // Create a derived value
//! let doubled = rt.computed({
//!     let count = count.clone();
//!     move || Ok(count.get() * 2)
//! });
//!
//! // Create an observer
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! rt.observer({
//!     let (count, doubled, seen) = (count.clone(), doubled.clone(), seen.clone());
//!     move || {
//!         seen.borrow_mut().push((count.get(), doubled.get()?));
//!         Ok(())
//!     }
//! });
//! rt.flush().unwrap();
//!
//! // Update the value, then flush
//! count.set(5);
//! rt.flush().unwrap();
//! assert_eq!(*seen.borrow(), vec![(0, 0), (5, 10)]);
//! ```

pub mod graph;
pub mod reactive;

mod config;
mod error;

pub use config::RuntimeConfig;
pub use error::{require, ComputeError, Interrupt, Outcome, ReactiveError, Result};
pub use graph::{EventLog, GraphEvent, GraphHook, NodeId, NodeKind, NodeState, RunOutcome};
pub use reactive::{
    Computed, Observer, ObserverOptions, Output, Rendered, Runtime, RuntimeHandle, Value,
};
