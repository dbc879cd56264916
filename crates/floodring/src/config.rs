//! Configuration for a [`FloodRing`](crate::FloodRing).

use std::time::Duration;

/// Default soft capacity of the pending buffer.
pub const DEFAULT_CAPACITY: usize = 256;
/// Default capacity of the output queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;
/// Default idle time before the buffer is flushed regardless of thresholds.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(100);
/// Default interval at which the activity clock wakes up.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Default interval between gate-respecting periodic flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
/// Default gate size (un-batched eviction).
pub const DEFAULT_GATE_SIZE: usize = 1;

/// Options record for a buffer.
///
/// Zero-valued sizes and durations are replaced with their defaults when the
/// buffer is constructed (see [`Config::normalized`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Soft threshold of the pending buffer. Exceeding it triggers eviction.
    ///
    /// Default: 256
    pub capacity: usize,

    /// Batching granularity for eviction and gate-respecting flushes.
    ///
    /// With a gate of 1 overflow trickles out element by element. With a
    /// larger gate, eviction waits until the overflow reaches a full gate
    /// and then releases exactly one gate-sized batch.
    ///
    /// Default: 1
    pub gate_size: usize,

    /// Capacity of the bounded output queue.
    ///
    /// Default: 4096
    pub queue_capacity: usize,

    /// Maximum time pending elements may wait with no producer activity
    /// before the whole buffer is flushed to the output queue.
    ///
    /// Default: 100ms
    pub idle_timeout: Duration,

    /// How often the activity clock checks for idleness.
    ///
    /// Default: 10ms
    pub poll_interval: Duration,

    /// Enables gate-respecting periodic flushes.
    ///
    /// Default: false
    pub flush_enabled: bool,

    /// Interval between periodic flushes (only when `flush_enabled`).
    ///
    /// Default: 1s
    pub flush_interval: Duration,

    /// Logs every emitted batch from the terminal pipeline stage.
    ///
    /// Default: false
    pub debug: bool,

    /// Skips eviction until a consumer attaches to the output queue.
    ///
    /// The pending buffer grows without bound until then, but nothing is
    /// lost before a reader exists.
    ///
    /// Default: false
    pub hold_until_attached: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            gate_size: DEFAULT_GATE_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            flush_enabled: false,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            debug: false,
            hold_until_attached: false,
        }
    }
}

impl Config {
    /// Creates a low-latency configuration: small buffer, short idle timeout.
    pub fn low_latency() -> Self {
        Self {
            capacity: 64,
            idle_timeout: Duration::from_millis(10),
            poll_interval: Duration::from_millis(1),
            ..Self::default()
        }
    }

    /// Creates a configuration that releases fixed-size batches of `gate`
    /// elements and periodically flushes complete batches.
    pub fn batched(gate: usize) -> Self {
        Self {
            gate_size: gate,
            flush_enabled: true,
            ..Self::default()
        }
    }

    /// Returns a copy with every zero size or duration replaced by its default.
    pub fn normalized(mut self) -> Self {
        if self.capacity == 0 {
            self.capacity = DEFAULT_CAPACITY;
        }
        if self.gate_size == 0 {
            self.gate_size = DEFAULT_GATE_SIZE;
        }
        if self.queue_capacity == 0 {
            self.queue_capacity = DEFAULT_QUEUE_CAPACITY;
        }
        if self.idle_timeout.is_zero() {
            self.idle_timeout = DEFAULT_IDLE_TIMEOUT;
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if self.flush_interval.is_zero() {
            self.flush_interval = DEFAULT_FLUSH_INTERVAL;
        }
        self
    }

    /// Sets the soft capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the gate size.
    pub fn with_gate_size(mut self, gate_size: usize) -> Self {
        self.gate_size = gate_size;
        self
    }

    /// Sets the output queue capacity.
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Sets the idle timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the activity clock poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enables periodic flushing at the given interval.
    pub fn with_periodic_flush(mut self, interval: Duration) -> Self {
        self.flush_enabled = true;
        self.flush_interval = interval;
        self
    }

    /// Enables or disables debug logging of emitted batches.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enables or disables holding elements until a consumer attaches.
    pub fn with_hold_until_attached(mut self, hold: bool) -> Self {
        self.hold_until_attached = hold;
        self
    }
}
