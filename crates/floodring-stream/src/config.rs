//! Polling settings for [`QueueStream`](crate::QueueStream).

use floodring::Config;
use std::time::Duration;

/// Smallest batch hint derived from a ring's configuration.
const MIN_BATCH_HINT: usize = 64;

/// How a [`QueueStream`](crate::QueueStream) polls the blocking output queue.
///
/// Usually derived from the ring it reads with [`StreamConfig::from_ring`]:
/// the queue only fills on the ring's clock ticks and evictions, so polling
/// faster than the ring's own poll interval only burns wakeups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Sleep between checks of an empty, still-open queue.
    pub poll_interval: Duration,

    /// Most elements moved from the queue into the stream per poll.
    pub batch_hint: usize,
}

impl StreamConfig {
    /// Matches the stream to a ring's configuration.
    ///
    /// The poll interval follows the ring's clock. The batch hint covers at
    /// least one gate-sized batch and never exceeds the queue capacity.
    pub fn from_ring(config: &Config) -> Self {
        let config = config.normalized();
        Self {
            poll_interval: config.poll_interval,
            batch_hint: config
                .gate_size
                .max(MIN_BATCH_HINT)
                .min(config.queue_capacity),
        }
    }

    /// Sets the poll interval. Zero is treated as 1ms.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Sets the batch hint. Zero is treated as 1.
    pub fn with_batch_hint(mut self, hint: usize) -> Self {
        self.batch_hint = hint.max(1);
        self
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::from_ring(&Config::default())
    }
}
