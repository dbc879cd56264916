//! Error types for floodring-stream operations.

use floodring::FloodError;
use thiserror::Error;

/// Errors from the async producer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The underlying buffer rejected the operation.
    #[error(transparent)]
    Flood(#[from] FloodError),

    /// The blocking task running the operation panicked or was cancelled.
    #[error("blocking buffer task did not complete")]
    TaskFailed,
}

impl StreamError {
    /// Returns `true` if the buffer is permanently unusable.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Flood(e) => e.is_terminal(),
            Self::TaskFailed => true,
        }
    }
}
