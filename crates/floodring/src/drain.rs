//! Drain engine: the only place batches meet the pipeline and the output queue.

use crate::latch::AttachLatch;
use crate::metrics::Counters;
use crate::pipeline::{BatchContext, BatchOrigin, Pipeline};
use crate::queue::OutputQueue;
use crate::ring::{GatePolicy, PendingBuffer};
use std::fmt;

/// Everything guarded by the buffer lock.
pub(crate) struct BufferState<T> {
    pub(crate) pending: PendingBuffer<T>,
    pub(crate) pipeline: Pipeline<T>,
    pub(crate) closed: bool,
}

/// Borrowed view over the collaborators a delivery needs.
///
/// Built per call while the buffer lock is held.
pub(crate) struct DrainEngine<'a, T> {
    pub(crate) queue: &'a OutputQueue<T>,
    pub(crate) latch: &'a AttachLatch,
    pub(crate) counters: &'a Counters,
    pub(crate) debug: bool,
}

impl<T: fmt::Debug> DrainEngine<'_, T> {
    /// Runs the pipeline over a batch that has already left the buffer.
    pub(crate) fn transform(
        &self,
        state: &mut BufferState<T>,
        batch: Vec<T>,
        origin: BatchOrigin,
    ) -> Vec<T> {
        let ctx = BatchContext::new(
            origin,
            state.pending.len(),
            state.pending.capacity(),
            state.pending.gate(),
            self.debug,
        );
        state.pipeline.apply(batch, &ctx)
    }

    /// Delivers a detached batch (an eviction or a `get_on_queue`).
    ///
    /// Without an attached consumer the batch is dropped: that is the ring
    /// buffer's overwrite semantics. Returns the number of elements queued.
    pub(crate) fn deliver(
        &self,
        state: &mut BufferState<T>,
        batch: Vec<T>,
        origin: BatchOrigin,
    ) -> usize {
        if batch.is_empty() {
            return 0;
        }
        if !self.latch.is_attached() {
            tracing::trace!(
                origin = %origin,
                discarded = batch.len(),
                "no consumer attached, discarding batch"
            );
            self.counters.record_discarded(batch.len());
            return 0;
        }

        let out = self.transform(state, batch, origin);
        self.send_all(out)
    }

    /// Delivers from the pending buffer itself, one gate-sized batch at a
    /// time until the policy allows no more.
    ///
    /// A no-op without an attached consumer: the buffer is left intact.
    /// Stops once the output queue closes, leaving the rest buffered.
    pub(crate) fn flush_buffer(
        &self,
        state: &mut BufferState<T>,
        policy: GatePolicy,
        origin: BatchOrigin,
    ) -> usize {
        if !self.latch.is_attached() {
            return 0;
        }

        let mut queued = 0;
        while !self.queue.is_closed() {
            let Some(batch) = state.pending.next_batch(policy) else {
                break;
            };
            let out = self.transform(state, batch, origin);
            queued += self.send_all(out);
        }
        queued
    }

    /// Pushes a transformed batch onto the queue in order.
    ///
    /// Blocks while the queue is full; the caller holds the buffer lock, so
    /// producers and the clock wait too.
    fn send_all(&self, out: Vec<T>) -> usize {
        let total = out.len();
        let mut sent = 0;

        for item in out {
            if self.queue.send(item).is_err() {
                tracing::warn!(
                    dropped = total - sent,
                    "output queue closed during delivery, dropping remainder"
                );
                self.counters.record_discarded(total - sent);
                break;
            }
            sent += 1;
        }

        if sent > 0 {
            self.counters.record_delivered(sent);
        }
        sent
    }
}
