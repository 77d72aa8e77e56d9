//! Error types for the formwright threading substrate.

use std::fmt;

/// Errors raised when marshalling work onto the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The UI queue has been closed; no further invocations are accepted.
    QueueClosed,
    /// The invocation was dropped before it produced a reply.
    ///
    /// This happens when the UI queue is cleared or dropped while a worker
    /// is still waiting on it.
    ReplyDropped,
    /// A blocking call was issued from the UI thread itself.
    ///
    /// The UI thread drains the queue, so waiting on it from there can never
    /// complete.
    WouldDeadlock,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueClosed => write!(f, "UI dispatch queue is closed"),
            Self::ReplyDropped => {
                write!(f, "UI invocation was dropped before producing a reply")
            }
            Self::WouldDeadlock => write!(
                f,
                "blocking UI call issued from the UI thread would deadlock"
            ),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Errors raised by the dedicated worker thread.
#[derive(Debug)]
pub enum WorkerError {
    /// The worker has been stopped and no longer accepts tasks.
    Stopped,
    /// The task queue is full.
    QueueFull,
    /// The operating system refused to spawn the worker thread.
    Spawn(std::io::Error),
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "worker has been stopped"),
            Self::QueueFull => write!(f, "worker task queue is full"),
            Self::Spawn(err) => write!(f, "failed to spawn worker thread: {err}"),
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

/// A specialized Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
