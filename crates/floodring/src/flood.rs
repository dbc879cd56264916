use crate::clock::{ActivityClock, ActivityStamps, ClockSettings, ClockTarget};
use crate::config::Config;
use crate::drain::{BufferState, DrainEngine};
use crate::error::FloodError;
use crate::latch::AttachLatch;
use crate::metrics::{Counters, Metrics};
use crate::pipeline::{BatchContext, BatchOrigin, Pipeline, Transform};
use crate::queue::{OutputQueue, OutputReceiver};
use crate::ring::{GatePolicy, PendingBuffer};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// State shared between the public handle and the activity clock thread.
struct Shared<T> {
    config: Config,
    state: Mutex<BufferState<T>>,
    queue: OutputQueue<T>,
    latch: AttachLatch,
    stamps: ActivityStamps,
    counters: Counters,
    debug: AtomicBool,
}

impl<T> Shared<T> {
    fn engine(&self) -> DrainEngine<'_, T> {
        DrainEngine {
            queue: &self.queue,
            latch: &self.latch,
            counters: &self.counters,
            debug: self.debug.load(Ordering::Relaxed),
        }
    }
}

impl<T: Send + fmt::Debug + 'static> Shared<T> {
    /// Runs the eviction policy after a mutation and delivers what it releases.
    ///
    /// Nothing is released once the output queue has closed; the overflow
    /// stays buffered until [`FloodRing::close`] accounts for it.
    fn evict(&self, state: &mut BufferState<T>) {
        if self.config.hold_until_attached && !self.latch.is_attached() {
            return;
        }
        if self.queue.is_closed() {
            return;
        }
        if let Some(batch) = state.pending.evict() {
            self.counters.record_evicted(batch.len());
            self.engine().deliver(state, batch, BatchOrigin::Evicted);
        }
    }

    fn flush_to_queue(&self, policy: GatePolicy, origin: BatchOrigin) -> Result<usize, FloodError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(FloodError::Closed);
        }
        self.stamps.touch_flush();
        Ok(self.engine().flush_buffer(&mut state, policy, origin))
    }
}

impl<T: Send + fmt::Debug + 'static> ClockTarget for Shared<T> {
    fn stamps(&self) -> &ActivityStamps {
        &self.stamps
    }

    fn on_idle(&self) {
        if let Ok(delivered) = self.flush_to_queue(GatePolicy::Ignore, BatchOrigin::IdleFlush) {
            if delivered > 0 {
                self.counters.record_idle_flush();
                tracing::trace!(delivered, "idle timeout flush");
            }
        }
    }

    fn on_periodic(&self) {
        if let Ok(delivered) = self.flush_to_queue(GatePolicy::Respect, BatchOrigin::PeriodicFlush)
        {
            if delivered > 0 {
                self.counters.record_periodic_flush();
                tracing::trace!(delivered, "periodic flush");
            }
        }
    }
}

/// A bounded ring buffer that overflows into a bounded output queue.
///
/// Producers call [`push`](Self::push) / [`unshift`](Self::unshift). Once
/// the buffer exceeds its capacity the oldest elements are evicted: onto the
/// output queue if a consumer has called [`output`](Self::output), otherwise
/// they are dropped. A background clock flushes the buffer to the queue when
/// producers go quiet for `idle_timeout`, and optionally flushes whole gate
/// batches every `flush_interval`.
///
/// # Backpressure
///
/// Delivery to a full output queue blocks while the buffer lock is held.
/// A stalled consumer therefore stalls every producer and the clock. A
/// transform that calls back into its own buffer deadlocks.
///
/// # Example
///
/// ```
/// use floodring::{Config, FloodRing};
///
/// let ring = FloodRing::<u32>::new(Config::default().with_capacity(3)).unwrap();
/// let rx = ring.output();
///
/// ring.push([1, 2, 3, 4, 5]).unwrap();
///
/// // the two oldest overflowed onto the queue
/// assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2]);
/// assert_eq!(ring.count(), 3);
///
/// ring.close();
/// ```
pub struct FloodRing<T> {
    shared: Arc<Shared<T>>,
    clock: Mutex<Option<ActivityClock>>,
}

impl<T: Send + fmt::Debug + 'static> FloodRing<T> {
    /// Creates a buffer and starts its activity clock.
    ///
    /// Zero sizes and durations in `config` fall back to their defaults.
    pub fn new(config: Config) -> Result<Self, FloodError> {
        let config = config.normalized();

        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(BufferState {
                pending: PendingBuffer::new(config.capacity, config.gate_size),
                pipeline: Pipeline::new(),
                closed: false,
            }),
            queue: OutputQueue::new(config.queue_capacity),
            latch: AttachLatch::new(),
            stamps: ActivityStamps::new(),
            counters: Counters::default(),
            debug: AtomicBool::new(config.debug),
        });

        let settings = ClockSettings {
            poll_interval: config.poll_interval,
            idle_timeout: config.idle_timeout,
            flush_interval: config.flush_enabled.then_some(config.flush_interval),
        };
        let target: Arc<dyn ClockTarget> = Arc::clone(&shared) as Arc<dyn ClockTarget>;
        let clock = ActivityClock::spawn(target, settings)
            .map_err(|e| FloodError::ClockSpawn(e.kind()))?;

        Ok(Self {
            shared,
            clock: Mutex::new(Some(clock)),
        })
    }

    /// Creates a buffer with the default configuration.
    pub fn with_defaults() -> Result<Self, FloodError> {
        Self::new(Config::default())
    }

    /// Appends elements at the tail, then runs eviction.
    pub fn push<I>(&self, items: I) -> Result<(), FloodError>
    where
        I: IntoIterator<Item = T>,
    {
        let items: Vec<T> = items.into_iter().collect();
        let shared = &*self.shared;

        let mut state = shared.state.lock();
        if state.closed {
            return Err(FloodError::Closed);
        }
        let added = state.pending.push_back(items);
        shared.counters.record_pushed(added);
        shared.evict(&mut state);
        drop(state);

        shared.stamps.touch_activity();
        Ok(())
    }

    /// Inserts elements at the head, ahead of everything already buffered,
    /// then runs eviction. The elements keep their argument order.
    pub fn unshift<I>(&self, items: I) -> Result<(), FloodError>
    where
        I: IntoIterator<Item = T>,
    {
        let items: Vec<T> = items.into_iter().collect();
        let shared = &*self.shared;

        let mut state = shared.state.lock();
        if state.closed {
            return Err(FloodError::Closed);
        }
        let added = state.pending.push_front(items);
        shared.counters.record_pushed(added);
        shared.evict(&mut state);
        drop(state);

        shared.stamps.touch_activity();
        Ok(())
    }

    /// Removes up to `n` of the oldest elements and returns them transformed.
    ///
    /// Returns `Ok(None)` when the buffer is empty or `n` is zero.
    pub fn get(&self, n: usize) -> Result<Option<Vec<T>>, FloodError> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        if state.closed {
            return Err(FloodError::Closed);
        }
        if n == 0 || state.pending.is_empty() {
            return Ok(None);
        }

        let batch = state.pending.take(n);
        Ok(Some(shared.engine().transform(&mut state, batch, BatchOrigin::Get)))
    }

    /// Removes up to `n` of the oldest elements and delivers them, transformed,
    /// to the output queue.
    ///
    /// Fails with [`FloodError::NotAttached`] (leaving the buffer untouched)
    /// if no consumer has attached yet.
    pub fn get_on_queue(&self, n: usize) -> Result<(), FloodError> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        if state.closed || shared.queue.is_closed() {
            return Err(FloodError::Closed);
        }
        if !shared.latch.is_attached() {
            return Err(FloodError::NotAttached);
        }
        if n == 0 || state.pending.is_empty() {
            return Ok(());
        }

        let batch = state.pending.take(n);
        shared.engine().deliver(&mut state, batch, BatchOrigin::Get);
        Ok(())
    }

    /// Removes the whole buffer and returns it transformed.
    ///
    /// Returns `Ok(None)` when the buffer is empty.
    pub fn drain(&self) -> Result<Option<Vec<T>>, FloodError> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        if state.closed {
            return Err(FloodError::Closed);
        }
        shared.stamps.touch_flush();
        if state.pending.is_empty() {
            return Ok(None);
        }

        let batch = state.pending.take_all();
        Ok(Some(shared.engine().transform(&mut state, batch, BatchOrigin::Drain)))
    }

    /// Delivers the buffer to the output queue in gate-sized batches.
    ///
    /// With [`GatePolicy::Respect`] a trailing partial batch stays buffered;
    /// with [`GatePolicy::Ignore`] it is delivered too. Without an attached
    /// consumer nothing moves.
    pub fn drain_to_queue(&self, policy: GatePolicy) -> Result<(), FloodError> {
        self.shared
            .flush_to_queue(policy, BatchOrigin::Drain)
            .map(|_| ())
    }

    /// Discards everything buffered.
    pub fn purge(&self) -> Result<(), FloodError> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        if state.closed {
            return Err(FloodError::Closed);
        }
        let dropped = state.pending.clear();
        drop(state);

        if dropped > 0 {
            tracing::trace!(dropped, "buffer purged");
        }
        shared.stamps.touch_activity();
        Ok(())
    }

    /// Registers a transform closure. It runs after every transform added
    /// before it and before the debug stage.
    pub fn add_transform<F>(&self, f: F)
    where
        F: FnMut(Vec<T>, &BatchContext) -> Vec<T> + Send + 'static,
    {
        self.add_stage(f);
    }

    /// Registers a [`Transform`] implementation.
    pub fn add_stage<S>(&self, stage: S)
    where
        S: Transform<T> + 'static,
    {
        self.shared.state.lock().pipeline.push(Box::new(stage));
    }

    /// Number of registered transforms, not counting the debug stage.
    pub fn transform_count(&self) -> usize {
        self.shared.state.lock().pipeline.len()
    }
}

impl<T> FloodRing<T> {
    /// Returns a handle to the output queue and marks a consumer as attached.
    ///
    /// From the first call on, evicted elements go to the queue instead of
    /// being dropped. Further calls return handles onto the same queue.
    pub fn output(&self) -> OutputReceiver<T> {
        if self.shared.latch.attach() {
            tracing::debug!("consumer attached to output queue");
        }
        self.shared.queue.receiver()
    }

    /// Number of elements currently buffered.
    pub fn count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Returns `true` once [`output`](Self::output) has been called.
    pub fn is_attached(&self) -> bool {
        self.shared.latch.is_attached()
    }

    /// The normalized configuration in effect.
    pub fn config(&self) -> Config {
        self.shared.config
    }

    /// Snapshot of the buffer counters.
    pub fn metrics(&self) -> Metrics {
        self.shared.counters.snapshot()
    }

    /// Marks producer activity, postponing the idle flush.
    pub fn ping(&self) {
        self.shared.stamps.touch_activity();
    }

    /// Turns logging of every emitted batch on or off.
    pub fn set_debug(&self, debug: bool) {
        self.shared.debug.store(debug, Ordering::Relaxed);
    }

    /// Returns `true` if batch logging is on.
    pub fn is_debug(&self) -> bool {
        self.shared.debug.load(Ordering::Relaxed)
    }

    /// Returns `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Closes the output queue, stops the activity clock and waits for it to
    /// exit, then releases the buffer.
    ///
    /// The queue is closed first so a delivery blocked on a full queue (in a
    /// producer or in the clock) returns and the join cannot hang. That
    /// delivery drops the rest of its batch (counted as discarded) and any
    /// flush in progress stops there. Elements still buffered are dropped
    /// with a warning; elements already queued stay readable. Idempotent;
    /// also runs on drop.
    pub fn close(&self) {
        self.shared.queue.close();

        let clock = self.clock.lock().take();
        if let Some(mut clock) = clock {
            clock.stop();
        }

        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let remaining = state.pending.clear();
        drop(state);

        if remaining > 0 {
            tracing::warn!(remaining, "closing buffer with undelivered elements");
        }
    }
}

impl<T> Drop for FloodRing<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T> fmt::Debug for FloodRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FloodRing")
            .field("config", &self.shared.config)
            .field("attached", &self.is_attached())
            .field("debug", &self.is_debug())
            .field(
                "clock_running",
                &self.clock.lock().as_ref().is_some_and(ActivityClock::is_running),
            )
            .finish_non_exhaustive()
    }
}
