//! Values
//!
//! A value is a readable, writable cell. It is the only place invalidation
//! originates: setting a value invalidates everything that read it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::runtime::{RuntimeHandle, RuntimeInner};
use crate::graph::{NodeId, Role};

/// A reactive value.
///
/// Cloning a `Value` creates another handle to the same cell.
pub struct Value<T> {
    id: NodeId,
    rt: RuntimeHandle,
    cell: Rc<RefCell<T>>,
}

impl<T: 'static> Value<T> {
    pub(crate) fn new(inner: &RuntimeInner, rt: RuntimeHandle, initial: T) -> Self {
        let id = inner.add_node(Role::Value, None);
        Self {
            id,
            rt,
            cell: Rc::new(RefCell::new(initial)),
        }
    }

    /// Id of the value node.
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

    /// Read the value, recording a dependency if a consumer is running.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Read the value by reference, recording a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.cell.borrow())
    }

    /// Read the value without recording a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.cell.borrow().clone()
    }

    /// Replace the value and invalidate its dependents.
    ///
    /// Dependents are invalidated even if the new value equals the old one.
    /// See [`set_if_changed`](Self::set_if_changed).
    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
        self.notify();
    }

    /// Modify the value in place and invalidate its dependents.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.cell.borrow_mut());
        self.notify();
    }

    /// Replace the value only if it differs. Returns whether it changed.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        if *self.cell.borrow() == value {
            return false;
        }
        self.set(value);
        true
    }

    fn track(&self) {
        if let Some(rt) = self.rt.upgrade() {
            rt.record_read(self.id);
        }
    }

    fn notify(&self) {
        if let Some(rt) = self.rt.upgrade() {
            rt.value_changed(self.id);
        }
    }
}

impl<T> Clone for Value<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            rt: self.rt.clone(),
            cell: self.cell.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("id", &self.id)
            .field("value", &*self.cell.borrow())
            .finish()
    }
}
