//! Async Adapters for floodring
//!
//! This crate exposes a [`floodring::FloodRing`] to async code: the output
//! queue as a [`futures_core::Stream`], and producer operations that run on
//! the blocking pool so backpressure never parks a runtime worker.
//!
//! # Example
//!
//! ```ignore
//! use floodring::{Config, FloodRing};
//! use floodring_stream::{AsyncPusher, FloodRingStreamExt, StreamExt};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ring = Arc::new(FloodRing::<u64>::new(Config::default().with_capacity(2)).unwrap());
//!     let mut rx = ring.stream();
//!
//!     let tx = AsyncPusher::new(Arc::clone(&ring));
//!     tx.push(vec![1, 2, 3, 4]).await.unwrap();
//!
//!     // 1 and 2 overflowed onto the queue
//!     assert_eq!(rx.next().await, Some(1));
//!     assert_eq!(rx.next().await, Some(2));
//! }
//! ```

mod config;
mod error;
mod receiver;
mod sender;

pub use config::StreamConfig;
pub use error::StreamError;
pub use receiver::{FloodRingStreamExt, OutputReceiverExt, QueueStream};
pub use sender::AsyncPusher;

// Re-export useful stream combinators
pub use tokio_stream::StreamExt;
