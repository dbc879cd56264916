//! # floodring Demo
//!
//! Bursty producers feed a gated buffer; one consumer reads merged batches
//! from the output queue.
//!
//! ## Features Demonstrated
//!
//! - Gated eviction with the `merge_bytes` transform
//! - Idle-timeout flush of the partial tail after the last burst
//! - Periodic flush while producers stay busy
//! - Metrics snapshot and graceful close
//!
//! ## Running
//!
//! ```bash
//! # Quick mode (2 producers, 5 bursts each)
//! cargo run -p floodring --features demo --bin floodring-demo -- --quick
//!
//! # Log every emitted batch
//! RUST_LOG=floodring=debug cargo run -p floodring --features demo --bin floodring-demo -- --verbose
//! ```

use floodring::{transforms, Config, FloodRing};
use rand::Rng;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct DemoArgs {
    producers: usize,
    bursts: usize,
    verbose: bool,
}

impl DemoArgs {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let quick = args.iter().any(|a| a == "--quick");
        Self {
            producers: if quick { 2 } else { 4 },
            bursts: if quick { 5 } else { 20 },
            verbose: args.iter().any(|a| a == "--verbose"),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floodring=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = DemoArgs::parse();

    let config = Config::batched(8)
        .with_capacity(32)
        .with_idle_timeout(Duration::from_millis(200))
        .with_periodic_flush(Duration::from_millis(500))
        .with_debug(args.verbose);
    let ring = Arc::new(FloodRing::<Vec<u8>>::new(config)?);
    ring.add_transform(transforms::merge_bytes);

    println!("=== floodring demo ===\n");
    println!("  capacity:       {}", config.capacity);
    println!("  gate size:      {}", config.gate_size);
    println!("  idle timeout:   {:?}", config.idle_timeout);
    println!("  periodic flush: {:?}\n", config.flush_interval);

    let rx = ring.output();
    let consumer = thread::spawn(move || {
        let mut batches = 0usize;
        let mut bytes = 0usize;
        for chunk in rx {
            batches += 1;
            bytes += chunk.len();
        }
        (batches, bytes)
    });

    let start = Instant::now();
    let producers: Vec<_> = (0..args.producers)
        .map(|id| {
            let ring = Arc::clone(&ring);
            let bursts = args.bursts;
            thread::spawn(move || -> Result<usize, floodring::FloodError> {
                let mut rng = rand::thread_rng();
                let mut sent = 0;
                for _ in 0..bursts {
                    let burst = rng.gen_range(1..40);
                    for _ in 0..burst {
                        let len = rng.gen_range(1..16);
                        let chunk: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
                        sent += chunk.len();
                        ring.push([chunk])?;
                    }
                    thread::sleep(Duration::from_millis(rng.gen_range(5..120)));
                }
                tracing::info!(producer = id, bytes = sent, "producer finished");
                Ok(sent)
            })
        })
        .collect();

    let mut produced = 0;
    for handle in producers {
        produced += handle.join().map_err(|_| "producer panicked")??;
    }

    // let the idle timeout pick up the tail
    thread::sleep(config.idle_timeout * 3);
    let metrics = ring.metrics();
    ring.close();
    let (batches, consumed) = consumer.join().map_err(|_| "consumer panicked")?;

    println!("\n=== results ===\n");
    println!("  elapsed:          {:?}", start.elapsed());
    println!("  bytes produced:   {}", produced);
    println!("  bytes consumed:   {}", consumed);
    println!("  batches consumed: {}", batches);
    println!("  pushed:           {}", metrics.pushed);
    println!("  evicted:          {}", metrics.evicted);
    println!("  idle flushes:     {}", metrics.idle_flushes);
    println!("  periodic flushes: {}", metrics.periodic_flushes);

    Ok(())
}
