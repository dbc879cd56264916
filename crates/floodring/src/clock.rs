//! Background activity clock: idle-timeout and periodic flushes.

use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Last-activity and last-flush timestamps, readable without the buffer lock.
///
/// Stored as nanoseconds since `base` so they fit in an atomic.
#[derive(Debug)]
pub(crate) struct ActivityStamps {
    base: Instant,
    last_activity: CachePadded<AtomicU64>,
    last_flush: CachePadded<AtomicU64>,
}

impl ActivityStamps {
    pub(crate) fn new() -> Self {
        Self {
            base: Instant::now(),
            last_activity: CachePadded::new(AtomicU64::new(0)),
            last_flush: CachePadded::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    fn now_nanos(&self) -> u64 {
        self.base.elapsed().as_nanos() as u64
    }

    #[inline]
    fn since(&self, stamp: &AtomicU64) -> Duration {
        let then = stamp.load(Ordering::Acquire);
        Duration::from_nanos(self.now_nanos().saturating_sub(then))
    }

    pub(crate) fn touch_activity(&self) {
        self.last_activity.store(self.now_nanos(), Ordering::Release);
    }

    pub(crate) fn touch_flush(&self) {
        self.last_flush.store(self.now_nanos(), Ordering::Release);
    }

    pub(crate) fn since_activity(&self) -> Duration {
        self.since(&self.last_activity)
    }

    pub(crate) fn since_flush(&self) -> Duration {
        self.since(&self.last_flush)
    }
}

/// What the clock drives. Implemented by the buffer's shared state.
pub(crate) trait ClockTarget: Send + Sync + 'static {
    fn stamps(&self) -> &ActivityStamps;

    /// Flush everything, partial batch included.
    fn on_idle(&self);

    /// Flush whole gate-sized batches only.
    fn on_periodic(&self);
}

/// Timing parameters for the clock loop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClockSettings {
    pub(crate) poll_interval: Duration,
    pub(crate) idle_timeout: Duration,
    /// `None` disables the periodic flush.
    pub(crate) flush_interval: Option<Duration>,
}

/// Cancellation signal the clock thread sleeps on between ticks.
#[derive(Debug, Default)]
pub(crate) struct ClockSignal {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl ClockSignal {
    pub(crate) fn cancel(&self) {
        *self.cancelled.lock() = true;
        self.cond.notify_all();
    }

    /// Sleeps until `deadline` or cancellation. Returns `true` if cancelled.
    pub(crate) fn wait_until(&self, deadline: Instant) -> bool {
        let mut cancelled = self.cancelled.lock();
        while !*cancelled {
            if self.cond.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }
}

/// Owned handle to the clock thread. Stopping cancels and joins it.
#[derive(Debug)]
pub(crate) struct ActivityClock {
    signal: Arc<ClockSignal>,
    handle: Option<JoinHandle<()>>,
}

impl ActivityClock {
    /// Spawns the clock thread.
    pub(crate) fn spawn(target: Arc<dyn ClockTarget>, settings: ClockSettings) -> io::Result<Self> {
        let signal = Arc::new(ClockSignal::default());
        let thread_signal = Arc::clone(&signal);

        let handle = thread::Builder::new()
            .name("floodring-clock".to_string())
            .spawn(move || run(target.as_ref(), &thread_signal, settings))?;

        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    /// Cancels the clock and waits for the thread to exit.
    pub(crate) fn stop(&mut self) {
        self.signal.cancel();

        if let Some(handle) = self.handle.take() {
            // a clock thread cannot join itself
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("activity clock thread panicked");
            }
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for ActivityClock {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(target: &dyn ClockTarget, signal: &ClockSignal, settings: ClockSettings) {
    tracing::debug!(
        poll_ms = settings.poll_interval.as_millis() as u64,
        idle_ms = settings.idle_timeout.as_millis() as u64,
        periodic = settings.flush_interval.is_some(),
        "activity clock started"
    );

    let mut next_tick = Instant::now() + settings.poll_interval;
    loop {
        if signal.wait_until(next_tick) {
            break;
        }

        // ticks that fell behind are skipped, not replayed
        let now = Instant::now();
        next_tick += settings.poll_interval;
        if next_tick <= now {
            next_tick = now + settings.poll_interval;
        }

        let stamps = target.stamps();
        if stamps.since_activity() > settings.idle_timeout {
            target.on_idle();
        } else if let Some(flush_interval) = settings.flush_interval {
            if stamps.since_flush() > flush_interval {
                target.on_periodic();
            }
        }
    }

    tracing::debug!("activity clock stopped");
}
