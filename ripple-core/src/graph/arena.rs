//! Node Arena
//!
//! [`Graph`] owns every node of one runtime, indexed by [`NodeId`], together
//! with the edges between them. It is the only place edges are created or
//! destroyed.
//!
//! # Invalidation
//!
//! [`Graph::invalidate`] walks the graph depth-first from a changed node:
//!
//! 1. A node that is already invalidated is skipped (this is also the
//!    visited guard, so every node is processed at most once).
//! 2. The node is marked invalidated, its dependents are snapshotted, and its
//!    incoming edges are erased.
//! 3. Every former dependent is pushed onto the work stack.
//!
//! A node is therefore stripped of its edges before any of its dependents
//! are looked at. Outgoing edges disappear as each dependent in turn erases
//! its own incoming edges.
//!
//! Value nodes are never invalidated; invalidating one forwards to its
//! dependents. Suspended observers are not invalidated either: they keep
//! their edges and are flagged as pending instead.

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::events::{GraphEvent, RunOutcome};
use super::node::{Node, NodeId, NodeKind, NodeState, Role};

/// Nodes touched by one [`Graph::invalidate`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Invalidation {
    /// Consumers that moved to [`NodeState::Invalidated`], in visit order.
    pub invalidated: Vec<NodeId>,

    /// Observers that must be queued, with their priority.
    pub observers: Vec<(NodeId, i32)>,

    /// Suspended observers that were flagged as pending.
    pub deferred: Vec<NodeId>,
}

impl Invalidation {
    pub fn is_empty(&self) -> bool {
        self.invalidated.is_empty() && self.deferred.is_empty()
    }
}

/// The dependency graph of one runtime.
#[derive(Debug, Default)]
pub struct Graph {
    /// All nodes in the graph, indexed by ID.
    nodes: IndexMap<NodeId, Node>,

    /// Next raw id to hand out.
    next_id: u64,

    /// Events recorded since the last [`Graph::take_events`].
    journal: Vec<GraphEvent>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_node(&mut self, role: Role, label: Option<String>) -> NodeId {
        let id = NodeId::from_raw(self.next_id);
        self.next_id += 1;

        let mut node = Node::new(id, role);
        if let Some(label) = &label {
            node.set_label(label.clone());
        }
        self.nodes.insert(id, node);
        self.journal.push(GraphEvent::NodeCreated {
            node: id,
            kind: role.kind(),
            label,
        });
        id
    }

    /// Remove a node from the graph.
    ///
    /// Also removes all edges involving this node.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        if !self.nodes.contains_key(&node_id) {
            return None;
        }
        self.erase_edges(node_id);

        let node = self.nodes.swap_remove(&node_id)?;
        for dependent_id in node.dependents() {
            if let Some(dependent) = self.nodes.get_mut(dependent_id) {
                dependent.remove_dependency(node_id);
                self.journal.push(GraphEvent::EdgeRemoved {
                    producer: node_id,
                    consumer: *dependent_id,
                });
            }
        }
        self.journal.push(GraphEvent::NodeDisposed { node: node_id });
        Some(node)
    }

    /// Get a reference to a node.
    pub fn get_node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub(crate) fn get_node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Current state of a node, if it exists.
    pub fn state(&self, node_id: NodeId) -> Option<NodeState> {
        self.nodes.get(&node_id).map(Node::state)
    }

    pub(crate) fn set_label(&mut self, node_id: NodeId, label: String) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.set_label(label.clone());
            self.journal.push(GraphEvent::NodeLabeled {
                node: node_id,
                label,
            });
        }
    }

    /// Record that `consumer` read `producer` during its current run.
    ///
    /// Only a running consumer can gain edges. Returns whether a new edge
    /// was created.
    pub fn add_edge(&mut self, producer: NodeId, consumer: NodeId) -> bool {
        let readable = self
            .nodes
            .get(&producer)
            .map_or(false, |node| node.kind().is_producer());
        if producer == consumer || !readable {
            return false;
        }
        let added = match self.nodes.get_mut(&consumer) {
            Some(node) if node.kind().is_consumer() && node.state() == NodeState::Running => {
                node.add_dependency(producer)
            }
            _ => false,
        };
        if added {
            if let Some(producer_node) = self.nodes.get_mut(&producer) {
                producer_node.add_dependent(consumer);
            }
            self.journal.push(GraphEvent::EdgeAdded { producer, consumer });
        }
        added
    }

    /// Erase every incoming edge of `node_id`.
    ///
    /// The node is removed from each producer's dependent set and its own
    /// dependency set is emptied. O(degree).
    pub fn erase_edges(&mut self, node_id: NodeId) {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        for producer in node.take_dependencies() {
            if let Some(producer_node) = self.nodes.get_mut(&producer) {
                producer_node.remove_dependent(node_id);
            }
            self.journal.push(GraphEvent::EdgeRemoved {
                producer,
                consumer: node_id,
            });
        }
    }

    /// Invalidate `root` and everything reachable from it.
    ///
    /// Idempotent: invalidating an already invalidated node does nothing.
    pub fn invalidate(&mut self, root: NodeId) -> Invalidation {
        let mut report = Invalidation::default();
        let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();
        stack.push(root);

        while let Some(node_id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };

            if node.kind() == NodeKind::Value {
                // Values originate invalidation but are never invalidated.
                stack.extend(node.dependents().iter().copied());
                continue;
            }
            if node.state() == NodeState::Invalidated {
                continue;
            }
            if let Some(meta) = node.observer_meta_mut() {
                if meta.suspended {
                    if !meta.pending {
                        meta.pending = true;
                        report.deferred.push(node_id);
                    }
                    continue;
                }
            }

            node.set_state(NodeState::Invalidated);
            let is_observer = node.is_observer();
            let priority = node.priority();
            let dependents: SmallVec<[NodeId; 8]> = node.dependents().iter().copied().collect();

            self.erase_edges(node_id);
            self.journal.push(GraphEvent::Invalidated { node: node_id });

            report.invalidated.push(node_id);
            if is_observer {
                report.observers.push((node_id, priority));
            }
            stack.extend(dependents);
        }

        report
    }

    /// Move an invalidated consumer into [`NodeState::Running`].
    pub(crate) fn begin_run(&mut self, node_id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            debug_assert_eq!(node.state(), NodeState::Invalidated);
            node.set_state(NodeState::Running);
            self.journal.push(GraphEvent::ExecutionStarted { node: node_id });
        }
    }

    /// Finish a run started with [`Graph::begin_run`].
    ///
    /// Returns `true` if the node is now valid, `false` if it was
    /// invalidated while running (or no longer exists) and must run again.
    pub(crate) fn finish_run(&mut self, node_id: NodeId, outcome: RunOutcome) -> bool {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return false;
        };
        let valid = match (node.state(), outcome) {
            (NodeState::Running, RunOutcome::Abandoned) => {
                node.set_state(NodeState::Invalidated);
                false
            }
            (NodeState::Running, _) => {
                node.set_state(NodeState::Valid);
                true
            }
            _ => false,
        };
        if !valid {
            self.erase_edges(node_id);
        }
        self.journal.push(GraphEvent::ExecutionFinished {
            node: node_id,
            outcome,
        });
        valid
    }

    pub(crate) fn record(&mut self, event: GraphEvent) {
        self.journal.push(event);
    }

    /// Take the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.journal)
    }

    /// Producers `node_id` currently depends on.
    pub fn dependencies_of(&self, node_id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node_id)
            .map(|node| node.dependencies().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Consumers currently depending on `node_id`.
    pub fn dependents_of(&self, node_id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node_id)
            .map(|node| node.dependents().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|node| node.dependencies().len()).sum()
    }
}
