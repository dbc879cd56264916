//! One-shot consumer-attachment latch.

use crossbeam_utils::CachePadded;

use std::sync::atomic::{AtomicBool, Ordering};

// The latch is written at most once (false -> true) and read on every
// producer and clock path. A Release store paired with Acquire loads is
// enough: readers that observe `true` also observe every write the
// attaching thread made before handing out the receiver. It never resets.

/// Records whether a consumer has ever requested the output queue.
///
/// Independent of the engine lock, so attaching never waits behind a
/// delivery that is blocked on a full queue.
#[derive(Debug)]
pub struct AttachLatch {
    attached: CachePadded<AtomicBool>,
}

impl AttachLatch {
    /// Creates an unset latch.
    pub fn new() -> Self {
        Self {
            attached: CachePadded::new(AtomicBool::new(false)),
        }
    }

    /// Sets the latch. Returns `true` only for the call that flipped it.
    #[inline]
    pub fn attach(&self) -> bool {
        !self.attached.swap(true, Ordering::AcqRel)
    }

    /// Returns `true` once any consumer has attached.
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

impl Default for AttachLatch {
    fn default() -> Self {
        Self::new()
    }
}
