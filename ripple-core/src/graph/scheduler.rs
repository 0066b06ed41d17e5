//! Flush Queue
//!
//! The flush queue holds the observers waiting to be re-executed. Observers
//! are popped highest priority first; among equal priorities they come out
//! in the order they were queued, although callers must not rely on that.
//!
//! An observer is queued at most once until it is popped again, which makes
//! repeated invalidation before a flush harmless.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use indexmap::IndexMap;

use super::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    priority: i32,
    seq: u64,
    node: NodeId,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            // Earlier entries first within a priority.
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of observers awaiting execution.
#[derive(Debug, Default)]
pub struct FlushQueue {
    heap: BinaryHeap<Entry>,
    /// Queued nodes and the sequence number of their live heap entry.
    queued: IndexMap<NodeId, u64>,
    next_seq: u64,
}

impl FlushQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `node`. Returns `false` if it was already queued.
    pub fn push(&mut self, node: NodeId, priority: i32) -> bool {
        if self.queued.contains_key(&node) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queued.insert(node, seq);
        self.heap.push(Entry {
            priority,
            seq,
            node,
        });
        true
    }

    /// Pop the highest-priority observer.
    pub fn pop(&mut self) -> Option<NodeId> {
        while let Some(entry) = self.heap.pop() {
            // Entries of removed nodes stay in the heap until they surface.
            if self.queued.get(&entry.node) == Some(&entry.seq) {
                self.queued.swap_remove(&entry.node);
                return Some(entry.node);
            }
        }
        None
    }

    /// Drop `node` from the queue, if present.
    pub fn remove(&mut self, node: NodeId) -> bool {
        self.queued.swap_remove(&node).is_some()
    }

    /// Whether `node` is waiting to be popped.
    pub fn contains(&self, node: NodeId) -> bool {
        self.queued.contains_key(&node)
    }

    /// Number of queued observers.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Whether no observer is waiting.
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Queued observers in the order they will be popped.
    pub fn pending(&self) -> Vec<NodeId> {
        let mut live: Vec<&Entry> = self
            .heap
            .iter()
            .filter(|entry| self.queued.get(&entry.node) == Some(&entry.seq))
            .collect();
        live.sort_unstable_by(|a, b| b.cmp(a));
        live.into_iter().map(|entry| entry.node).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> NodeId {
        NodeId::from_raw(raw)
    }

    #[test]
    fn pops_highest_priority_first() {
        let mut queue = FlushQueue::new();
        queue.push(id(1), 0);
        queue.push(id(2), 10);
        queue.push(id(3), -5);

        assert_eq!(queue.pop(), Some(id(2)));
        assert_eq!(queue.pop(), Some(id(1)));
        assert_eq!(queue.pop(), Some(id(3)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn pending_lists_pop_order() {
        let mut queue = FlushQueue::new();
        queue.push(id(1), 0);
        queue.push(id(2), 10);
        queue.push(id(3), 0);
        queue.push(id(4), 5);
        queue.remove(id(4));

        assert_eq!(queue.pending(), vec![id(2), id(1), id(3)]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn push_is_idempotent() {
        let mut queue = FlushQueue::new();
        assert!(queue.push(id(1), 0));
        assert!(!queue.push(id(1), 0));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.pop(), Some(id(1)));
        assert!(queue.is_empty());

        // Popped observers may be queued again.
        assert!(queue.push(id(1), 0));
    }

    #[test]
    fn removed_entries_are_skipped() {
        let mut queue = FlushQueue::new();
        queue.push(id(1), 1);
        queue.push(id(2), 0);

        assert!(queue.remove(id(1)));
        assert!(!queue.contains(id(1)));
        assert_eq!(queue.pop(), Some(id(2)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn requeue_after_remove_uses_new_priority() {
        let mut queue = FlushQueue::new();
        queue.push(id(1), 0);
        queue.remove(id(1));
        queue.push(id(2), 5);
        queue.push(id(1), 9);

        assert_eq!(queue.pop(), Some(id(1)));
        assert_eq!(queue.pop(), Some(id(2)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn stale_entry_does_not_jump_the_queue() {
        let mut queue = FlushQueue::new();
        queue.push(id(1), 9);
        queue.remove(id(1));
        queue.push(id(2), 5);
        queue.push(id(1), 0);

        assert_eq!(queue.pop(), Some(id(2)));
        assert_eq!(queue.pop(), Some(id(1)));
        assert_eq!(queue.pop(), None);
    }
}
