//! Reactive Primitives
//!
//! This module implements the user-facing side of the system: values,
//! computed expressions, observers and outputs, all owned by a [`Runtime`].
//!
//! # Concepts
//!
//! ## Values
//!
//! A [`Value`] is a container for mutable state. When it is read while a
//! consumer runs, the consumer registers as a dependent. Setting the value
//! invalidates every dependent.
//!
//! ## Computed
//!
//! A [`Computed`] is a derived value that caches its result, including a
//! failed one. It re-evaluates lazily, on the first read after one of its
//! dependencies changed.
//!
//! ## Observers
//!
//! An [`Observer`] is a side-effecting computation. When invalidated it is
//! queued, and [`Runtime::flush`] runs the queue in priority order. An
//! [`Output`] is an observer that renders its result (or its error) to a
//! sink.
//!
//! # Implementation Notes
//!
//! Each runtime keeps a context stack of running consumers. Reading a
//! producer checks the top of the stack and, if a consumer is running,
//! records the edge. Dependencies are rebuilt from scratch on every run, so
//! branches not taken are never dependencies.

mod computed;
mod context;
mod observer;
mod output;
mod runtime;
mod value;

pub use computed::Computed;
pub use context::{ContextStack, Frame};
pub use observer::{Observer, ObserverOptions};
pub use output::{Output, Rendered};
pub use runtime::{Runtime, RuntimeHandle};
pub use value::Value;
