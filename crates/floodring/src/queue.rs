//! Bounded output queue between the drain engine and the consumer.

use crate::error::{RecvTimeoutError, TryRecvError};
use crate::invariants::debug_assert_queue_bounded;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// BLOCKING PROTOCOL
// =============================================================================
//
// One mutex guards the deque and the closed flag. Two condvars carry the
// wakeups:
//
// - `not_full`: signaled by a receiver after it pops. The drain engine waits
//   on it while the queue is at capacity. That wait happens while the engine
//   lock is held, which is how a stalled consumer backpressures producers.
// - `not_empty`: signaled by the sender after it pushes. Receivers wait on it.
//
// `close()` flips the flag and wakes everyone. A closed queue rejects new
// elements but keeps yielding what it already holds.
//
// =============================================================================

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

struct QueueInner<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

/// Producer side of the output queue, owned by the drain engine.
pub(crate) struct OutputQueue<T> {
    inner: Arc<QueueInner<T>>,
}

impl<T> OutputQueue<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    items: VecDeque::with_capacity(capacity.min(4096)),
                    closed: false,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                capacity,
            }),
        }
    }

    /// Returns a consumer handle sharing this queue.
    pub(crate) fn receiver(&self) -> OutputReceiver<T> {
        OutputReceiver {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Enqueues one element, blocking while the queue is full.
    ///
    /// Returns the element back if the queue has been closed.
    pub(crate) fn send(&self, item: T) -> Result<(), T> {
        let mut state = self.inner.state.lock();
        while state.items.len() >= self.inner.capacity && !state.closed {
            self.inner.not_full.wait(&mut state);
        }
        if state.closed {
            return Err(item);
        }

        state.items.push_back(item);
        debug_assert_queue_bounded!(state.items.len(), self.inner.capacity);
        drop(state);

        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Closes the queue and wakes every waiter.
    pub(crate) fn close(&self) {
        self.inner.state.lock().closed = true;
        self.inner.not_empty.notify_all();
        self.inner.not_full.notify_all();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }
}

/// Consumer handle for the output queue.
///
/// Obtained from [`FloodRing::output`](crate::FloodRing::output). Cloning
/// yields another handle onto the same queue.
pub struct OutputReceiver<T> {
    inner: Arc<QueueInner<T>>,
}

impl<T> OutputReceiver<T> {
    /// Blocks until an element is available.
    ///
    /// Returns `None` once the queue is closed and empty.
    pub fn recv(&self) -> Option<T> {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.inner.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.inner.not_empty.wait(&mut state);
        }
    }

    /// Takes an element if one is ready.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        let mut state = self.inner.state.lock();
        match state.items.pop_front() {
            Some(item) => {
                drop(state);
                self.inner.not_full.notify_one();
                Ok(item)
            }
            None if state.closed => Err(TryRecvError::Closed),
            None => Err(TryRecvError::Empty),
        }
    }

    /// Blocks for at most `timeout` waiting for an element.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.inner.not_full.notify_one();
                return Ok(item);
            }
            if state.closed {
                return Err(RecvTimeoutError::Closed);
            }
            if self
                .inner
                .not_empty
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return match state.items.pop_front() {
                    Some(item) => {
                        drop(state);
                        self.inner.not_full.notify_one();
                        Ok(item)
                    }
                    None => Err(RecvTimeoutError::Timeout),
                };
            }
        }
    }

    /// Number of elements waiting in the queue.
    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    /// Returns `true` if nothing is waiting in the queue.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of elements the queue holds before delivery blocks.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns `true` once the owning buffer has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Blocking iterator; ends when the queue is closed and drained.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { rx: self }
    }

    /// Non-blocking iterator over what is queued right now.
    pub fn try_iter(&self) -> TryIter<'_, T> {
        TryIter { rx: self }
    }
}

impl<T> Clone for OutputReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for OutputReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputReceiver")
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

/// Blocking iterator returned by [`OutputReceiver::iter`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    rx: &'a OutputReceiver<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rx.recv()
    }
}

/// Non-blocking iterator returned by [`OutputReceiver::try_iter`].
#[derive(Debug)]
pub struct TryIter<'a, T> {
    rx: &'a OutputReceiver<T>,
}

impl<T> Iterator for TryIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

/// Owning blocking iterator.
#[derive(Debug)]
pub struct IntoIter<T> {
    rx: OutputReceiver<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rx.recv()
    }
}

impl<T> IntoIterator for OutputReceiver<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter { rx: self }
    }
}

impl<'a, T> IntoIterator for &'a OutputReceiver<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
