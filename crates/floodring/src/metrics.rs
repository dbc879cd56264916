use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of buffer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    /// Elements accepted by `push` and `unshift`.
    pub pushed: u64,
    /// Elements removed by overflow eviction.
    pub evicted: u64,
    /// Evicted elements dropped because no consumer had attached.
    pub discarded: u64,
    /// Elements handed to the output queue (after transforms).
    pub delivered: u64,
    /// Batches handed to the output queue.
    pub batches_delivered: u64,
    /// Flushes forced by the idle timeout.
    pub idle_flushes: u64,
    /// Flushes forced by the periodic flush interval.
    pub periodic_flushes: u64,
}

/// Shared counters behind [`Metrics`]. Relaxed: they order nothing.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pushed: AtomicU64,
    evicted: AtomicU64,
    discarded: AtomicU64,
    delivered: AtomicU64,
    batches_delivered: AtomicU64,
    idle_flushes: AtomicU64,
    periodic_flushes: AtomicU64,
}

impl Counters {
    pub(crate) fn record_pushed(&self, n: usize) {
        self.pushed.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self, n: usize) {
        self.evicted.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self, n: usize) {
        self.discarded.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self, n: usize) {
        self.delivered.fetch_add(n as u64, Ordering::Relaxed);
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_idle_flush(&self) {
        self.idle_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_periodic_flush(&self) {
        self.periodic_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> Metrics {
        Metrics {
            pushed: self.pushed.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            idle_flushes: self.idle_flushes.load(Ordering::Relaxed),
            periodic_flushes: self.periodic_flushes.load(Ordering::Relaxed),
        }
    }
}
