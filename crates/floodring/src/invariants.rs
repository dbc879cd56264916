//! Debug assertion macros for buffer invariants.
//!
//! Only active in debug builds (`debug_assert!`), so release builds pay nothing.

// =============================================================================
// Element conservation
// =============================================================================

/// Assert that taking a batch neither created nor lost elements.
///
/// **Invariant**: `before == taken + after`
///
/// Used in: every `PendingBuffer` removal path
macro_rules! debug_assert_conserved {
    ($before:expr, $taken:expr, $after:expr) => {
        debug_assert!(
            $before == $taken + $after,
            "element conservation violated: {} before, {} taken, {} left",
            $before,
            $taken,
            $after
        )
    };
}

// =============================================================================
// Eviction shape
// =============================================================================

/// Assert that a gated eviction released exactly one gate.
///
/// **Invariant**: `gate > 1 ⇒ evicted.len() == gate`
///
/// Used in: `PendingBuffer::evict()`
macro_rules! debug_assert_gate_batch {
    ($len:expr, $gate:expr) => {
        debug_assert!(
            $len == $gate,
            "gated eviction released {} elements, gate is {}",
            $len,
            $gate
        )
    };
}

/// Assert that un-gated eviction brought the buffer back to capacity.
///
/// **Invariant**: `gate == 1 ⇒ len ≤ capacity` after eviction
///
/// Used in: `PendingBuffer::evict()`
macro_rules! debug_assert_within_capacity {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len <= $capacity,
            "trickle eviction left {} elements, capacity is {}",
            $len,
            $capacity
        )
    };
}

// =============================================================================
// Output queue bound
// =============================================================================

/// Assert that the output queue never holds more than its capacity.
///
/// **Invariant**: `0 ≤ queued ≤ capacity`
///
/// Used in: `OutputQueue::send()` after enqueueing
macro_rules! debug_assert_queue_bounded {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len <= $capacity,
            "output queue holds {} elements, capacity is {}",
            $len,
            $capacity
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_conserved;
pub(crate) use debug_assert_gate_batch;
pub(crate) use debug_assert_queue_bounded;
pub(crate) use debug_assert_within_capacity;
