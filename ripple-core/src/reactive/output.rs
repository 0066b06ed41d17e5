//! Outputs
//!
//! An output is an observer that publishes its result to a sink (a UI
//! binding, a network push, a test recorder). Unlike a plain observer it
//! renders ordinary errors instead of failing the runtime:
//!
//! | run result                   | rendered                |
//! |------------------------------|-------------------------|
//! | `Ok(value)`                  | [`Rendered::Value`]     |
//! | `Err(Interrupt::Error(e))`   | [`Rendered::Error`]     |
//! | silent stop                  | [`Rendered::Blank`]     |
//! | silent stop, preserving      | unchanged, sink skipped |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::observer::{Observer, ObserverOptions};
use super::runtime::{Boundary, Runner, RuntimeHandle, RuntimeInner};
use crate::error::{ComputeError, Interrupt, Outcome};
use crate::graph::NodeId;

/// What an output currently shows.
#[derive(Debug, Clone)]
pub enum Rendered<T> {
    /// Nothing yet, or cleared by a silent stop.
    Blank,
    Value(T),
    Error(ComputeError),
}

impl<T> Rendered<T> {
    /// Whether nothing is shown.
    pub fn is_blank(&self) -> bool {
        matches!(self, Rendered::Blank)
    }

    /// The shown value, if the last run succeeded.
    pub fn value(&self) -> Option<&T> {
        match self {
            Rendered::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The shown error, if the last run failed.
    pub fn error(&self) -> Option<&ComputeError> {
        match self {
            Rendered::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// Handle to an output.
pub struct Output<T> {
    observer: Observer,
    rendered: Rc<RefCell<Rendered<T>>>,
}

impl<T: 'static> Output<T> {
    pub(crate) fn new(
        inner: &RuntimeInner,
        rt: RuntimeHandle,
        options: ObserverOptions,
        render: Box<dyn Fn() -> Outcome<T>>,
        sink: Box<dyn Fn(&Rendered<T>)>,
    ) -> Self {
        let rendered = Rc::new(RefCell::new(Rendered::Blank));

        let body = {
            let rendered = rendered.clone();
            let rt = rt.clone();
            move || {
                let (next, result) = match render() {
                    Ok(value) => (Rendered::Value(value), Ok(())),
                    Err(Interrupt::Error(error)) => {
                        (Rendered::Error(error.clone()), Err(Interrupt::Error(error)))
                    }
                    Err(Interrupt::Stop { preserve: false }) => {
                        (Rendered::Blank, Err(Interrupt::stop()))
                    }
                    Err(Interrupt::Stop { preserve: true }) => {
                        return Err(Interrupt::stop_preserving());
                    }
                };
                *rendered.borrow_mut() = next;
                // The sink is a transport, not a consumer.
                rt.isolate(|| sink(&rendered.borrow()));
                result
            }
        };

        let id = inner.add_observer(options, Runner::new(Box::new(body), Boundary::Output));
        Self {
            observer: Observer::new(id, rt),
            rendered,
        }
    }

    /// Id of the underlying observer node.
    pub fn id(&self) -> NodeId {
        self.observer.id()
    }

    /// The underlying observer.
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// A copy of what is currently shown.
    pub fn rendered(&self) -> Rendered<T>
    where
        T: Clone,
    {
        self.rendered.borrow().clone()
    }

    /// Hidden outputs are suspended and catch up when shown again.
    pub fn set_visible(&self, visible: bool) {
        self.observer.set_suspended(!visible);
    }

    /// Whether the output is currently shown (not suspended).
    pub fn is_visible(&self) -> bool {
        !self.observer.is_suspended()
    }

    /// Remove the output. The sink is not called again.
    pub fn dispose(&self) {
        self.observer.dispose();
    }
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            observer: self.observer.clone(),
            rendered: self.rendered.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("id", &self.observer.id())
            .field("rendered", &*self.rendered.borrow())
            .finish()
    }
}
