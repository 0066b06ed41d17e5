//! Dependency Graph
//!
//! This module implements the bookkeeping side of the runtime: the nodes,
//! the edges between them, invalidation propagation, and the queue of
//! observers waiting to run. Nothing in here ever calls user code.
//!
//! # Overview
//!
//! - Nodes represent values, computed expressions, or observers
//! - Edges represent dependencies: if B read A, there is an edge A -> B
//!
//! Edges are one-shot. They are discovered while a consumer runs and erased
//! the moment that consumer is invalidated, so after every run a consumer's
//! dependency set is exactly what it read on that run.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena owned by one runtime and refer to each other by
//!    [`NodeId`]. The logical graph is many-to-many, but ownership stays a
//!    tree and erasing an edge is a set removal.
//!
//! 2. Both directions are stored (dependencies and dependents) so that
//!    invalidation can walk forward and erasure can walk backward, each in
//!    O(degree).
//!
//! 3. Structural changes are journaled as [`GraphEvent`]s for diagnostics.

mod arena;
mod events;
mod node;
mod scheduler;

pub use arena::{Graph, Invalidation};
pub use events::{EventLog, GraphEvent, GraphHook, LoggedEvent, RunOutcome, TracingHook};
pub use node::{Node, NodeId, NodeKind, NodeState};
pub use scheduler::FlushQueue;

pub(crate) use node::Role;
