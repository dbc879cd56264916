//! Ordered batch transforms applied before a batch leaves the buffer.

use std::fmt;

/// Which path emitted a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchOrigin {
    /// Overflow eviction after a push or unshift.
    Evicted,
    /// An explicit `get` or `get_on_queue`.
    Get,
    /// An explicit `drain` or `drain_to_queue`.
    Drain,
    /// The activity clock after the idle timeout elapsed.
    IdleFlush,
    /// The activity clock's gate-respecting periodic flush.
    PeriodicFlush,
}

impl BatchOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evicted => "evicted",
            Self::Get => "get",
            Self::Drain => "drain",
            Self::IdleFlush => "idle_flush",
            Self::PeriodicFlush => "periodic_flush",
        }
    }
}

impl fmt::Display for BatchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the buffer handed to every transform.
///
/// Transforms run while the buffer lock is held, so they get a snapshot
/// instead of the buffer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchContext {
    origin: BatchOrigin,
    pending: usize,
    capacity: usize,
    gate_size: usize,
    debug: bool,
}

impl BatchContext {
    pub(crate) fn new(
        origin: BatchOrigin,
        pending: usize,
        capacity: usize,
        gate_size: usize,
        debug: bool,
    ) -> Self {
        Self {
            origin,
            pending,
            capacity,
            gate_size,
            debug,
        }
    }

    /// The path that emitted this batch.
    pub fn origin(&self) -> BatchOrigin {
        self.origin
    }

    /// Elements still buffered after this batch was taken.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Soft capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Gate size of the buffer.
    pub fn gate_size(&self) -> usize {
        self.gate_size
    }

    /// Whether debug logging of batches is on.
    pub fn debug(&self) -> bool {
        self.debug
    }
}

/// A batch-rewriting stage.
///
/// Implemented for every `FnMut(Vec<T>, &BatchContext) -> Vec<T> + Send`.
///
/// # Reentrancy
///
/// A transform must never call back into the buffer that owns it. It runs
/// under the buffer lock, possibly while delivery is blocked on a full
/// output queue, and re-entering deadlocks.
pub trait Transform<T>: Send {
    /// Rewrites one batch.
    fn apply(&mut self, batch: Vec<T>, ctx: &BatchContext) -> Vec<T>;
}

impl<T, F> Transform<T> for F
where
    F: FnMut(Vec<T>, &BatchContext) -> Vec<T> + Send,
{
    #[inline]
    fn apply(&mut self, batch: Vec<T>, ctx: &BatchContext) -> Vec<T> {
        self(batch, ctx)
    }
}

/// User stages in registration order followed by the fixed debug stage.
///
/// The debug stage is not stored in the list, so stages added later still
/// run before it.
pub(crate) struct Pipeline<T> {
    stages: Vec<Box<dyn Transform<T>>>,
}

impl<T: fmt::Debug> Pipeline<T> {
    pub(crate) fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub(crate) fn push(&mut self, stage: Box<dyn Transform<T>>) {
        self.stages.push(stage);
    }

    pub(crate) fn len(&self) -> usize {
        self.stages.len()
    }

    pub(crate) fn apply(&mut self, batch: Vec<T>, ctx: &BatchContext) -> Vec<T> {
        let batch = self
            .stages
            .iter_mut()
            .fold(batch, |batch, stage| stage.apply(batch, ctx));
        debug_stage(&batch, ctx);
        batch
    }
}

fn debug_stage<T: fmt::Debug>(batch: &[T], ctx: &BatchContext) {
    if ctx.debug() {
        tracing::debug!(
            origin = %ctx.origin(),
            len = batch.len(),
            pending = ctx.pending(),
            batch = ?batch,
            "batch emitted"
        );
    }
}
