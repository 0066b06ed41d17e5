//! Errors and Interrupts
//!
//! Three things can come out of a consumer's function:
//!
//! - a value (`Ok`),
//! - an ordinary error ([`Interrupt::Error`] carrying a [`ComputeError`]),
//! - a silent stop ([`Interrupt::Stop`]), meaning "nothing to show right now".
//!
//! They travel through `get()` calls like values, so `?` forwards them, and
//! are only interpreted at a boundary: a computed caches them, an observer
//! treats an error as fatal to the runtime, an output renders it.
//!
//! [`ReactiveError`] is what the runtime itself reports to its host.

use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::graph::NodeId;

/// Result of evaluating a computed or observer body.
pub type Outcome<T> = std::result::Result<T, Interrupt>;

/// Result type for runtime operations.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

/// Errors reported by the runtime to its host.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// An observer returned an ordinary error. The runtime is terminated.
    #[error("observer {label} ({node}) failed: {error}")]
    ObserverFailed {
        node: NodeId,
        label: String,
        error: ComputeError,
    },

    /// A previous observer failure terminated the runtime.
    #[error("reactive runtime was terminated by an earlier observer failure")]
    Terminated,

    /// A single flush executed more observers than the configured limit.
    #[error("flush exceeded the limit of {limit} observer executions")]
    FlushLimitExceeded { limit: usize },

    /// The runtime owning a handle has been dropped.
    #[error("reactive runtime has been torn down")]
    TornDown,

    /// A configuration document could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// An ordinary error raised by user code.
///
/// Cloning is cheap and clones share the same underlying error, so a cached
/// error re-raised on later reads is the identical object
/// (see [`ComputeError::ptr_eq`]).
#[derive(Clone)]
pub struct ComputeError {
    inner: Rc<dyn StdError + 'static>,
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

impl ComputeError {
    /// Wrap any error.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + 'static,
    {
        Self {
            inner: Rc::new(error),
        }
    }

    /// An error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Attempt to downcast to the concrete error type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Whether both handles refer to the same error object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The wrapped error.
    pub fn as_error(&self) -> &(dyn StdError + 'static) {
        &*self.inner
    }
}

impl<E> From<E> for ComputeError
where
    E: StdError + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Debug for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

/// Anything that stops a consumer's function before it produces a value.
#[derive(Debug, Clone)]
pub enum Interrupt {
    /// An ordinary error.
    Error(ComputeError),

    /// A silent stop. With `preserve`, an output keeps what it showed
    /// before; without it, the output is cleared.
    Stop { preserve: bool },
}

impl Interrupt {
    /// A silent stop that clears the consumer's visible state.
    pub fn stop() -> Self {
        Interrupt::Stop { preserve: false }
    }

    /// A silent stop that leaves the consumer's visible state untouched.
    pub fn stop_preserving() -> Self {
        Interrupt::Stop { preserve: true }
    }

    /// An ordinary error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Interrupt::Error(ComputeError::msg(message))
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Interrupt::Stop { .. })
    }

    /// The ordinary error, if this is one.
    pub fn as_error(&self) -> Option<&ComputeError> {
        match self {
            Interrupt::Error(error) => Some(error),
            Interrupt::Stop { .. } => None,
        }
    }
}

impl From<ComputeError> for Interrupt {
    fn from(error: ComputeError) -> Self {
        Interrupt::Error(error)
    }
}

impl<E> From<E> for Interrupt
where
    E: StdError + 'static,
{
    fn from(error: E) -> Self {
        Interrupt::Error(ComputeError::new(error))
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Error(error) => fmt::Display::fmt(error, f),
            Interrupt::Stop { preserve: false } => f.write_str("silent stop"),
            Interrupt::Stop { preserve: true } => f.write_str("silent stop (preserving output)"),
        }
    }
}

/// Silently stop unless `condition` holds.
///
/// ```rust,ignore
/// let name = rt.computed(move || {
///     require(!input.get().is_empty())?;
///     Ok(input.get().to_uppercase())
/// });
/// ```
pub fn require(condition: bool) -> Outcome<()> {
    if condition {
        Ok(())
    } else {
        Err(Interrupt::stop())
    }
}
