//! Reactive Context
//!
//! The reactive context tracks which consumer is currently running. This
//! enables automatic dependency tracking: when a producer is read, the
//! consumer on top of the stack becomes one of its dependents.
//!
//! # Implementation
//!
//! Each runtime owns one stack. Running a computed or an observer pushes a
//! [`Frame::Consumer`]; [`isolate`](super::Runtime::isolate) pushes
//! [`Frame::Isolated`], under which reads record nothing. Frames are popped
//! by a guard, so the stack is restored on every exit path, including a
//! panic unwinding through user code.
//!
//! Nesting is plain stack discipline: a computed evaluated inside an
//! isolated block pushes its own consumer frame and tracks its own reads.

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::graph::NodeId;

/// An entry in the reactive context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Reads are recorded as dependencies of this consumer.
    Consumer(NodeId),
    /// Reads are not recorded.
    Isolated,
}

/// The stack of running consumers for one runtime.
#[derive(Debug, Default)]
pub struct ContextStack {
    frames: SmallVec<[Frame; 8]>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// The innermost frame.
    pub fn current(&self) -> Option<Frame> {
        self.frames.last().copied()
    }

    /// The consumer that should record a read right now, if any.
    pub fn tracking(&self) -> Option<NodeId> {
        match self.current() {
            Some(Frame::Consumer(id)) => Some(id),
            _ => None,
        }
    }

    /// Whether no consumer is running and nothing is isolated.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Guard that pops the frame it pushed when dropped.
pub(crate) struct ContextGuard<'a> {
    stack: &'a RefCell<ContextStack>,
    frame: Frame,
}

impl<'a> ContextGuard<'a> {
    pub(crate) fn enter(stack: &'a RefCell<ContextStack>, frame: Frame) -> Self {
        stack.borrow_mut().push(frame);
        Self { stack, frame }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.stack.borrow_mut().pop();

        // Verify we're popping the right frame.
        debug_assert_eq!(
            popped,
            Some(self.frame),
            "context stack mismatch: expected {:?}, got {:?}",
            self.frame,
            popped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> NodeId {
        NodeId::from_raw(raw)
    }

    #[test]
    fn context_tracks_consumer() {
        let stack = RefCell::new(ContextStack::new());
        assert!(stack.borrow().tracking().is_none());

        {
            let _ctx = ContextGuard::enter(&stack, Frame::Consumer(id(1)));
            assert_eq!(stack.borrow().tracking(), Some(id(1)));
        }

        // Context should be cleaned up after drop
        assert!(stack.borrow().is_empty());
        assert!(stack.borrow().tracking().is_none());
    }

    #[test]
    fn isolated_frame_suppresses_tracking() {
        let stack = RefCell::new(ContextStack::new());
        let _outer = ContextGuard::enter(&stack, Frame::Consumer(id(1)));

        {
            let _isolated = ContextGuard::enter(&stack, Frame::Isolated);
            assert_eq!(stack.borrow().tracking(), None);

            {
                let _inner = ContextGuard::enter(&stack, Frame::Consumer(id(2)));
                assert_eq!(stack.borrow().tracking(), Some(id(2)));
            }

            assert_eq!(stack.borrow().current(), Some(Frame::Isolated));
        }

        assert_eq!(stack.borrow().current(), Some(Frame::Consumer(id(1))));
    }

    #[test]
    fn guard_pops_during_unwind() {
        let stack = RefCell::new(ContextStack::new());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ctx = ContextGuard::enter(&stack, Frame::Consumer(id(3)));
            panic!("user code failed");
        }));

        assert!(result.is_err());
        assert!(stack.borrow().is_empty());
    }
}
