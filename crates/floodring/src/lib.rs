//! floodring - Bounded Ring Buffer with Overflow Delivery
//!
//! A generic in-process buffer that keeps the most recent elements and
//! overflows the oldest ones onto a bounded output queue. It is built for
//! streams that need batching with backpressure and that drop data rather
//! than grow without bound when nobody is listening.
//!
//! # Key Features
//!
//! - Soft capacity: pushes never fail, overflow is evicted
//! - Gated eviction: overflow leaves in whole batches of `gate_size`
//! - Attachment latch: overflow is dropped until a consumer asks for the queue
//! - Idle-timeout flush and optional periodic flush from a background clock
//! - Ordered transform pipeline applied to every emitted batch
//! - Blocking backpressure from a full output queue
//!
//! # Example
//!
//! ```
//! use floodring::{transforms, Config, FloodRing};
//! use std::time::Duration;
//!
//! let ring = FloodRing::<Vec<u8>>::new(
//!     Config::default()
//!         .with_capacity(4)
//!         .with_gate_size(2)
//!         .with_idle_timeout(Duration::from_secs(60)),
//! )
//! .unwrap();
//! ring.add_transform(transforms::merge_bytes);
//!
//! let rx = ring.output();
//! for chunk in [b"a", b"b", b"c", b"d", b"e", b"f"] {
//!     ring.push([chunk.to_vec()]).unwrap();
//! }
//!
//! // one gate of two evicted, merged into a single element
//! assert_eq!(rx.try_recv(), Ok(b"ab".to_vec()));
//! assert_eq!(ring.count(), 4);
//! ```

mod clock;
mod config;
mod drain;
mod error;
mod flood;
mod invariants;
mod latch;
mod metrics;
mod pipeline;
mod queue;
mod ring;
pub mod transforms;

pub use config::{
    Config, DEFAULT_CAPACITY, DEFAULT_FLUSH_INTERVAL, DEFAULT_GATE_SIZE, DEFAULT_IDLE_TIMEOUT,
    DEFAULT_POLL_INTERVAL, DEFAULT_QUEUE_CAPACITY,
};
pub use error::{FloodError, RecvTimeoutError, TryRecvError};
pub use flood::FloodRing;
pub use latch::AttachLatch;
pub use metrics::Metrics;
pub use pipeline::{BatchContext, BatchOrigin, Transform};
pub use queue::{IntoIter, Iter, OutputReceiver, TryIter};
pub use ring::GatePolicy;
