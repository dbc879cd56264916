use crate::invariants::{
    debug_assert_conserved, debug_assert_gate_batch, debug_assert_within_capacity,
};
use std::collections::VecDeque;

/// How a buffer-sourced flush treats a trailing partial batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatePolicy {
    /// Deliver only whole gate-sized batches; a partial remainder stays buffered.
    Respect,
    /// Deliver everything, including a final batch smaller than the gate.
    Ignore,
}

/// Ordered pending elements plus the eviction policy that runs after every
/// mutation.
///
/// Plain data: no locking, no clock. The owner serializes access.
#[derive(Debug)]
pub(crate) struct PendingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
    gate: usize,
}

impl<T> PendingBuffer<T> {
    pub(crate) fn new(capacity: usize, gate: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            gate: gate.max(1),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn gate(&self) -> usize {
        self.gate
    }

    /// Appends at the tail. Returns the number of elements added.
    pub(crate) fn push_back<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let before = self.items.len();
        self.items.extend(items);
        self.items.len() - before
    }

    /// Inserts at the head, keeping the argument order: pushing `[a, b]`
    /// then unshifting `[x, y]` yields `[x, y, a, b]`.
    pub(crate) fn push_front<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let incoming: Vec<T> = items.into_iter().collect();
        let added = incoming.len();
        self.items.reserve(added);
        for item in incoming.into_iter().rev() {
            self.items.push_front(item);
        }
        added
    }

    /// Runs the eviction policy once.
    ///
    /// - gate 1: every element over capacity leaves.
    /// - gate > 1: exactly one gate leaves, and only once the overflow has
    ///   reached a full gate. Further overflow waits for the next mutation.
    pub(crate) fn evict(&mut self) -> Option<Vec<T>> {
        let overflow = self.items.len().saturating_sub(self.capacity);
        if overflow == 0 {
            return None;
        }

        if self.gate == 1 {
            let evicted = self.take(overflow);
            debug_assert_within_capacity!(self.items.len(), self.capacity);
            Some(evicted)
        } else if overflow >= self.gate {
            let evicted = self.take(self.gate);
            debug_assert_gate_batch!(evicted.len(), self.gate);
            Some(evicted)
        } else {
            None
        }
    }

    /// Peels the next batch for a buffer-sourced flush.
    ///
    /// A full gate is taken while one is available. Below that, the whole
    /// remainder is taken unless the policy asks to respect the gate. A gate
    /// of 1 divides every length, so it always takes everything.
    pub(crate) fn next_batch(&mut self, policy: GatePolicy) -> Option<Vec<T>> {
        if self.items.is_empty() {
            return None;
        }

        if self.gate > 1 && self.items.len() >= self.gate {
            Some(self.take(self.gate))
        } else if self.gate == 1 || policy == GatePolicy::Ignore {
            Some(self.take_all())
        } else {
            None
        }
    }

    /// Removes up to `n` of the oldest elements.
    pub(crate) fn take(&mut self, n: usize) -> Vec<T> {
        let before = self.items.len();
        let n = n.min(before);
        let taken: Vec<T> = self.items.drain(..n).collect();
        debug_assert_conserved!(before, taken.len(), self.items.len());
        taken
    }

    /// Removes every element.
    pub(crate) fn take_all(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items).into()
    }

    /// Discards every element. Returns how many were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }
}
