//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.
//!
//! A node is pure bookkeeping: its kind, its lifecycle state, and the two
//! mirrored adjacency sets that make up the edges touching it. The values,
//! user functions and cached results belong to the typed handles in
//! [`crate::reactive`]; the graph only ever sees [`NodeId`]s.

use std::fmt;

use indexmap::IndexSet;
use serde::Serialize;

/// Identifier of a node in one runtime's dependency graph.
///
/// Ids are allocated sequentially by the owning [`Graph`](super::Graph) and
/// are only meaningful within that runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A value node. These are the roots of the graph: they only have
    /// dependents and never become invalidated themselves.
    Value,

    /// A computed node. Lazily evaluated, caches its outcome, may have both
    /// dependencies and dependents.
    Computed,

    /// An observer node. Eagerly re-executed on flush; a leaf of the graph.
    Observer,
}

impl NodeKind {
    /// Whether this kind of node can be read by consumers.
    pub fn is_producer(self) -> bool {
        matches!(self, NodeKind::Value | NodeKind::Computed)
    }

    /// Whether this kind of node reads producers.
    pub fn is_consumer(self) -> bool {
        matches!(self, NodeKind::Computed | NodeKind::Observer)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Value => "value",
            NodeKind::Computed => "computed",
            NodeKind::Observer => "observer",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// The node must run before its result can be used. It has no edges.
    Invalidated,

    /// The node's function is on the call stack right now.
    Running,

    /// The node's last run is current. Value nodes are always valid.
    Valid,
}

/// Scheduling data carried by observer nodes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ObserverMeta {
    pub priority: i32,
    pub suspended: bool,
    /// An invalidation reached this observer while it was suspended.
    pub pending: bool,
}

/// Per-kind payload of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Value,
    Computed,
    Observer(ObserverMeta),
}

impl Role {
    pub(crate) fn observer(priority: i32, suspended: bool) -> Self {
        Role::Observer(ObserverMeta {
            priority,
            suspended,
            pending: false,
        })
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Role::Value => NodeKind::Value,
            Role::Computed => NodeKind::Computed,
            Role::Observer(_) => NodeKind::Observer,
        }
    }
}

/// A node in the dependency graph.
#[derive(Debug)]
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// Kind-specific data.
    role: Role,

    /// Current lifecycle state.
    state: NodeState,

    /// Human-readable name used in diagnostics.
    label: Option<String>,

    /// Producers this node read during its current run.
    dependencies: IndexSet<NodeId>,

    /// Consumers that read this node and must be invalidated with it.
    dependents: IndexSet<NodeId>,
}

impl Node {
    pub(crate) fn new(id: NodeId, role: Role) -> Self {
        Self {
            id,
            role,
            state: match role {
                Role::Value => NodeState::Valid,
                // Consumers start invalidated so their first read (or flush) runs them.
                Role::Computed | Role::Observer(_) => NodeState::Invalidated,
            },
            label: None,
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.role.kind()
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> NodeState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }

    /// Whether this node is an observer.
    pub fn is_observer(&self) -> bool {
        matches!(self.role, Role::Observer(_))
    }

    /// Scheduling priority. Non-observers report the default of 0.
    pub fn priority(&self) -> i32 {
        match self.role {
            Role::Observer(meta) => meta.priority,
            _ => 0,
        }
    }

    /// Whether this observer is currently suspended.
    pub fn is_suspended(&self) -> bool {
        matches!(self.role, Role::Observer(meta) if meta.suspended)
    }

    pub(crate) fn observer_meta_mut(&mut self) -> Option<&mut ObserverMeta> {
        match &mut self.role {
            Role::Observer(meta) => Some(meta),
            _ => None,
        }
    }

    /// The diagnostic label, if one was assigned.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    /// The label, or `kind#id` when none was assigned.
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("{}{}", self.kind(), self.id),
        }
    }

    pub(crate) fn add_dependency(&mut self, node_id: NodeId) -> bool {
        self.dependencies.insert(node_id)
    }

    pub(crate) fn remove_dependency(&mut self, node_id: NodeId) -> bool {
        self.dependencies.shift_remove(&node_id)
    }

    /// Producers read by this node's current run.
    pub fn dependencies(&self) -> &IndexSet<NodeId> {
        &self.dependencies
    }

    pub(crate) fn take_dependencies(&mut self) -> IndexSet<NodeId> {
        std::mem::take(&mut self.dependencies)
    }

    pub(crate) fn add_dependent(&mut self, node_id: NodeId) -> bool {
        self.dependents.insert(node_id)
    }

    pub(crate) fn remove_dependent(&mut self, node_id: NodeId) -> bool {
        // Dependent order carries no meaning; keep removal O(1).
        self.dependents.swap_remove(&node_id)
    }

    /// Consumers that depend on this node.
    pub fn dependents(&self) -> &IndexSet<NodeId> {
        &self.dependents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_node_starts_valid() {
        let node = Node::new(NodeId::from_raw(0), Role::Value);
        assert_eq!(node.kind(), NodeKind::Value);
        assert_eq!(node.state(), NodeState::Valid);
    }

    #[test]
    fn consumers_start_invalidated() {
        let computed = Node::new(NodeId::from_raw(1), Role::Computed);
        let observer = Node::new(NodeId::from_raw(2), Role::observer(3, false));

        assert_eq!(computed.state(), NodeState::Invalidated);
        assert_eq!(observer.state(), NodeState::Invalidated);
        assert_eq!(observer.priority(), 3);
        assert_eq!(computed.priority(), 0);
        assert!(observer.is_observer());
        assert!(!computed.is_observer());
    }

    #[test]
    fn dependency_management() {
        let mut node = Node::new(NodeId::from_raw(0), Role::Computed);
        let dep1 = NodeId::from_raw(1);
        let dep2 = NodeId::from_raw(2);

        assert!(node.add_dependency(dep1));
        assert!(node.add_dependency(dep2));
        assert!(!node.add_dependency(dep1));
        assert_eq!(node.dependencies().len(), 2);

        node.remove_dependency(dep1);
        assert!(!node.dependencies().contains(&dep1));

        let taken = node.take_dependencies();
        assert_eq!(taken.len(), 1);
        assert!(node.dependencies().is_empty());
    }

    #[test]
    fn display_name_falls_back_to_kind_and_id() {
        let mut node = Node::new(NodeId::from_raw(7), Role::Computed);
        assert_eq!(node.display_name(), "computed#7");

        node.set_label("fahrenheit");
        assert_eq!(node.display_name(), "fahrenheit");
    }

    #[test]
    fn kind_capabilities() {
        assert!(NodeKind::Value.is_producer());
        assert!(!NodeKind::Value.is_consumer());
        assert!(NodeKind::Computed.is_producer());
        assert!(NodeKind::Computed.is_consumer());
        assert!(!NodeKind::Observer.is_producer());
    }
}
