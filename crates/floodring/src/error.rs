//! Error types for floodring operations.

use thiserror::Error;

/// Errors returned by [`FloodRing`](crate::FloodRing) operations.
///
/// A live buffer never fails a push: capacity is a soft threshold that
/// triggers eviction, not a limit that rejects input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FloodError {
    /// The buffer has been closed.
    #[error("buffer is closed")]
    Closed,

    /// Queue delivery was requested before any consumer attached.
    #[error("no consumer has attached to the output queue")]
    NotAttached,

    /// The activity clock thread could not be started.
    #[error("failed to start activity clock: {0:?}")]
    ClockSpawn(std::io::ErrorKind),
}

impl FloodError {
    /// Returns `true` if the buffer is permanently unusable.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::ClockSpawn(_))
    }
}

/// Error returned by [`OutputReceiver::try_recv`](crate::OutputReceiver::try_recv).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryRecvError {
    /// The queue is currently empty.
    #[error("output queue is empty")]
    Empty,

    /// The queue is closed and fully drained.
    #[error("output queue is closed")]
    Closed,
}

/// Error returned by [`OutputReceiver::recv_timeout`](crate::OutputReceiver::recv_timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvTimeoutError {
    /// No element arrived before the deadline.
    #[error("timed out waiting on output queue")]
    Timeout,

    /// The queue is closed and fully drained.
    #[error("output queue is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(FloodError::Closed.is_terminal());
        assert!(!FloodError::NotAttached.is_terminal());
        assert!(FloodError::ClockSpawn(std::io::ErrorKind::WouldBlock).is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(FloodError::Closed.to_string(), "buffer is closed");
        assert_eq!(TryRecvError::Empty.to_string(), "output queue is empty");
        assert_eq!(
            RecvTimeoutError::Timeout.to_string(),
            "timed out waiting on output queue"
        );
    }
}
