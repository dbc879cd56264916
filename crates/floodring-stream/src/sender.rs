//! Async producer handle.
//!
//! Buffer operations block while the output queue is full. `AsyncPusher`
//! moves them onto Tokio's blocking pool so a stalled consumer never parks
//! a runtime worker.

use crate::error::StreamError;
use floodring::{FloodError, FloodRing, GatePolicy};
use std::fmt;
use std::sync::Arc;

/// Cloneable async handle over a shared [`FloodRing`].
pub struct AsyncPusher<T> {
    ring: Arc<FloodRing<T>>,
}

impl<T> Clone for AsyncPusher<T> {
    fn clone(&self) -> Self {
        Self {
            ring: Arc::clone(&self.ring),
        }
    }
}

impl<T> fmt::Debug for AsyncPusher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncPusher").field("ring", &self.ring).finish()
    }
}

impl<T: Send + fmt::Debug + 'static> AsyncPusher<T> {
    /// Creates a handle over `ring`.
    pub fn new(ring: Arc<FloodRing<T>>) -> Self {
        Self { ring }
    }

    /// The underlying buffer.
    pub fn ring(&self) -> &Arc<FloodRing<T>> {
        &self.ring
    }

    /// Appends elements at the tail.
    pub async fn push(&self, items: Vec<T>) -> Result<(), StreamError> {
        self.run(move |ring| ring.push(items)).await
    }

    /// Inserts elements at the head.
    pub async fn unshift(&self, items: Vec<T>) -> Result<(), StreamError> {
        self.run(move |ring| ring.unshift(items)).await
    }

    /// Delivers up to `n` of the oldest elements to the output queue.
    pub async fn get_on_queue(&self, n: usize) -> Result<(), StreamError> {
        self.run(move |ring| ring.get_on_queue(n)).await
    }

    /// Delivers the buffer to the output queue under `policy`.
    pub async fn drain_to_queue(&self, policy: GatePolicy) -> Result<(), StreamError> {
        self.run(move |ring| ring.drain_to_queue(policy)).await
    }

    async fn run<R, F>(&self, op: F) -> Result<R, StreamError>
    where
        F: FnOnce(&FloodRing<T>) -> Result<R, FloodError> + Send + 'static,
        R: Send + 'static,
    {
        let ring = Arc::clone(&self.ring);
        let result = tokio::task::spawn_blocking(move || op(&ring))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "blocking buffer task failed");
                StreamError::TaskFailed
            })?;
        Ok(result?)
    }
}
