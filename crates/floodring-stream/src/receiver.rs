//! Async receiver implementing `futures_core::Stream` over the output queue.

use crate::config::StreamConfig;
use floodring::{FloodRing, OutputReceiver, TryRecvError};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::time::{interval, Interval, MissedTickBehavior};

use futures_core::Stream;
use pin_project_lite::pin_project;

pin_project! {
    /// Async stream over a buffer's output queue.
    ///
    /// Yields elements in queue order and ends once the buffer has been
    /// closed and every queued element has been yielded.
    ///
    /// The queue has no async wakeups, so an empty stream re-checks it every
    /// `poll_interval`. Up to `batch_hint` elements are moved into a local
    /// buffer per check, which frees queue slots for blocked producers.
    pub struct QueueStream<T> {
        receiver: OutputReceiver<T>,
        config: StreamConfig,
        #[pin]
        poll_timer: Interval,
        buffer: VecDeque<T>,
        finished: bool,
    }
}

impl<T: Send + 'static> QueueStream<T> {
    /// Wraps a receiver. Must be called from within a Tokio runtime.
    pub fn new(receiver: OutputReceiver<T>, config: StreamConfig) -> Self {
        let mut poll_timer = interval(config.poll_interval);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            receiver,
            buffer: VecDeque::with_capacity(config.batch_hint),
            config,
            poll_timer,
            finished: false,
        }
    }

    /// Returns the polling settings this stream runs with.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Returns the number of elements held locally, not yet yielded.
    pub fn buffered_count(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` once the queue has closed and drained.
    pub fn is_finished(&self) -> bool {
        self.finished && self.buffer.is_empty()
    }

    /// Unwraps the stream. Locally buffered elements are dropped.
    pub fn into_inner(self) -> OutputReceiver<T> {
        self.receiver
    }
}

impl<T: Send + 'static> Stream for QueueStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(item) = this.buffer.pop_front() {
                return Poll::Ready(Some(item));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            let limit = this.config.batch_hint.max(1);
            while this.buffer.len() < limit {
                match this.receiver.try_recv() {
                    Ok(item) => this.buffer.push_back(item),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Closed) => {
                        *this.finished = true;
                        break;
                    }
                }
            }
            if !this.buffer.is_empty() || *this.finished {
                continue;
            }

            // nothing queued: wait for the next tick, registering the waker
            match this.poll_timer.as_mut().poll_tick(cx) {
                Poll::Ready(_) => continue,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Converts an [`OutputReceiver`] into a [`QueueStream`].
pub trait OutputReceiverExt<T> {
    /// Wraps the receiver with the default [`StreamConfig`].
    fn into_stream(self) -> QueueStream<T>;

    /// Wraps the receiver with an explicit [`StreamConfig`].
    fn into_stream_with_config(self, config: StreamConfig) -> QueueStream<T>;
}

impl<T: Send + 'static> OutputReceiverExt<T> for OutputReceiver<T> {
    fn into_stream(self) -> QueueStream<T> {
        QueueStream::new(self, StreamConfig::default())
    }

    fn into_stream_with_config(self, config: StreamConfig) -> QueueStream<T> {
        QueueStream::new(self, config)
    }
}

/// Attaches to a [`FloodRing`] as an async consumer.
pub trait FloodRingStreamExt<T> {
    /// Attaches a consumer and returns its output as a stream polled at
    /// the ring's own poll interval (see [`StreamConfig::from_ring`]).
    fn stream(&self) -> QueueStream<T>;

    /// Like [`stream`](Self::stream), with an explicit [`StreamConfig`].
    fn stream_with_config(&self, config: StreamConfig) -> QueueStream<T>;
}

impl<T: Send + 'static> FloodRingStreamExt<T> for FloodRing<T> {
    fn stream(&self) -> QueueStream<T> {
        self.stream_with_config(StreamConfig::from_ring(&self.config()))
    }

    fn stream_with_config(&self, config: StreamConfig) -> QueueStream<T> {
        self.output().into_stream_with_config(config)
    }
}
