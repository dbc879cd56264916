use floodring::{transforms, Config, FloodError, FloodRing, GatePolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_test::traced_test;

/// Config with an idle timeout long enough that the clock never fires
/// during a test.
fn quiet(capacity: usize, gate: usize) -> Config {
    Config::default()
        .with_capacity(capacity)
        .with_gate_size(gate)
        .with_idle_timeout(Duration::from_secs(60))
}

#[test]
fn test_fifo_ordering_through_get() {
    let ring = FloodRing::<u64>::new(quiet(10_000, 1)).unwrap();

    const N: u64 = 5_000;
    for i in 0..N {
        ring.push([i]).unwrap();
    }

    let mut expected = 0;
    while let Some(batch) = ring.get(97).unwrap() {
        for item in batch {
            assert_eq!(item, expected, "FIFO violation: expected {}, got {}", expected, item);
            expected += 1;
        }
    }
    assert_eq!(expected, N);
}

#[test]
fn test_fifo_ordering_through_queue() {
    let ring = FloodRing::<u64>::new(quiet(16, 1)).unwrap();
    let rx = ring.output();

    const N: u64 = 1_000;
    for i in 0..N {
        ring.push([i]).unwrap();
    }
    ring.drain_to_queue(GatePolicy::Ignore).unwrap();

    let received: Vec<u64> = rx.try_iter().collect();
    assert_eq!(received, (0..N).collect::<Vec<_>>());
}

#[test]
fn test_unshift_goes_ahead_of_buffered() {
    let ring = FloodRing::<&str>::new(quiet(10, 1)).unwrap();
    ring.push(["a", "b", "c"]).unwrap();
    ring.unshift(["d"]).unwrap();
    ring.unshift(["e"]).unwrap();

    assert_eq!(ring.drain().unwrap(), Some(vec!["e", "d", "a", "b", "c"]));
}

#[test]
fn test_unshift_keeps_argument_order() {
    let ring = FloodRing::<u32>::new(quiet(10, 1)).unwrap();
    ring.push([3]).unwrap();
    ring.unshift([1, 2]).unwrap();

    assert_eq!(ring.drain().unwrap(), Some(vec![1, 2, 3]));
}

#[test]
fn test_ungated_eviction_takes_all_overflow() {
    let ring = FloodRing::<&str>::new(quiet(3, 1)).unwrap();
    let rx = ring.output();

    ring.push(["k1", "k2", "k3", "k4", "k5"]).unwrap();

    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["k1", "k2"]);
    assert_eq!(ring.count(), 3);
    assert_eq!(ring.drain().unwrap(), Some(vec!["k3", "k4", "k5"]));
}

#[test]
fn test_gated_eviction_releases_whole_gates() {
    let ring = FloodRing::<Vec<u8>>::new(quiet(4, 2)).unwrap();
    ring.add_transform(transforms::merge_bytes);
    let rx = ring.output();

    for b in b'a'..=b'e' {
        ring.push([vec![b]]).unwrap();
    }
    // overflow of one is below the gate
    assert!(rx.is_empty());
    assert_eq!(ring.count(), 5);

    ring.push([vec![b'f']]).unwrap();
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![b"ab".to_vec()]);
    assert_eq!(ring.count(), 4);

    let m = ring.metrics();
    assert_eq!(m.pushed, 6);
    assert_eq!(m.evicted, 2);
    assert_eq!(m.delivered, 1);
}

#[test]
fn test_gated_eviction_one_gate_per_call() {
    let ring = FloodRing::<u32>::new(quiet(2, 2)).unwrap();
    let rx = ring.output();

    ring.push(0..8).unwrap();

    // one mutating call evicts a single gate even with more overflow
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(ring.count(), 6);
}

#[test]
fn test_idle_timeout_flushes_partial_batch() {
    let ring = FloodRing::<u32>::new(
        Config::default()
            .with_capacity(4)
            .with_gate_size(3)
            .with_idle_timeout(Duration::from_millis(250)),
    )
    .unwrap();
    let rx = ring.output();

    ring.push([1, 2]).unwrap();
    assert!(rx.is_empty());

    let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    let second = rx.recv_timeout(Duration::from_millis(100)).unwrap();
    assert_eq!((first, second), (1, 2));
    assert_eq!(ring.count(), 0);
    assert!(ring.metrics().idle_flushes >= 1);
}

#[test]
fn test_ping_postpones_idle_flush() {
    let ring = FloodRing::<u32>::new(
        Config::default()
            .with_capacity(4)
            .with_idle_timeout(Duration::from_millis(150))
            .with_poll_interval(Duration::from_millis(5)),
    )
    .unwrap();
    let rx = ring.output();

    ring.push([1]).unwrap();
    for _ in 0..6 {
        thread::sleep(Duration::from_millis(40));
        ring.ping();
    }
    assert!(rx.is_empty());
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(1));
}

#[test]
fn test_periodic_flush_respects_gate() {
    let ring = FloodRing::<u32>::new(
        Config::default()
            .with_capacity(4)
            .with_gate_size(2)
            .with_idle_timeout(Duration::from_secs(5))
            .with_poll_interval(Duration::from_millis(5))
            .with_periodic_flush(Duration::from_millis(50)),
    )
    .unwrap();
    let rx = ring.output();

    ring.push([1, 2]).unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(1));
    assert_eq!(rx.recv_timeout(Duration::from_millis(100)), Ok(2));

    ring.push([3, 4, 5]).unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(3));
    assert_eq!(rx.recv_timeout(Duration::from_millis(100)), Ok(4));

    // the partial remainder waits for the idle timeout
    thread::sleep(Duration::from_millis(150));
    assert!(rx.is_empty());
    assert_eq!(ring.count(), 1);
    assert!(ring.metrics().periodic_flushes >= 2);
}

#[test]
fn test_drain_to_queue_respecting_gate_keeps_remainder() {
    let ring = FloodRing::<u32>::new(quiet(10, 3)).unwrap();
    let rx = ring.output();
    ring.push(1..=7).unwrap();

    ring.drain_to_queue(GatePolicy::Respect).unwrap();
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(ring.count(), 1);

    ring.drain_to_queue(GatePolicy::Ignore).unwrap();
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![7]);
    assert_eq!(ring.count(), 0);
}

#[test]
fn test_drain_to_queue_without_consumer_keeps_buffer() {
    let ring = FloodRing::<u32>::new(quiet(10, 1)).unwrap();
    ring.push([1, 2, 3]).unwrap();
    ring.drain_to_queue(GatePolicy::Ignore).unwrap();
    assert_eq!(ring.count(), 3);
}

#[test]
fn test_eviction_without_consumer_discards() {
    let ring = FloodRing::<u32>::new(quiet(2, 1)).unwrap();
    ring.push([1, 2, 3, 4]).unwrap();

    assert_eq!(ring.count(), 2);
    assert_eq!(ring.metrics().discarded, 2);

    let rx = ring.output();
    ring.push([5]).unwrap();
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![3]);
}

#[test]
fn test_hold_until_attached_retains_everything() {
    let ring = FloodRing::<u32>::new(quiet(2, 1).with_hold_until_attached(true)).unwrap();
    ring.push(1..=10).unwrap();
    assert_eq!(ring.count(), 10);
    assert_eq!(ring.metrics().discarded, 0);

    let rx = ring.output();
    let _again = ring.output();
    assert!(ring.is_attached());

    ring.push([11]).unwrap();
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), (1..=9).collect::<Vec<_>>());
    assert_eq!(ring.count(), 2);
}

#[test]
fn test_second_output_shares_queue() {
    let ring = FloodRing::<u32>::new(quiet(1, 1)).unwrap();
    let rx1 = ring.output();
    ring.push([1, 2]).unwrap();

    let rx2 = ring.output();
    ring.push([3]).unwrap();

    assert_eq!(rx2.try_recv(), Ok(1));
    assert_eq!(rx1.try_recv(), Ok(2));
}

#[test]
fn test_pipeline_applies_in_registration_order() {
    let ring = FloodRing::<u32>::new(quiet(2, 1)).unwrap();
    ring.add_transform(|batch, _| batch.into_iter().map(|x| x + 1).collect());
    ring.add_transform(|batch, _| batch.into_iter().map(|x| x * 10).collect());
    assert_eq!(ring.transform_count(), 2);

    ring.push([1, 2]).unwrap();
    assert_eq!(ring.get(1).unwrap(), Some(vec![20]));
    assert_eq!(ring.drain().unwrap(), Some(vec![30]));

    let rx = ring.output();
    ring.push([3, 4, 5]).unwrap();
    assert_eq!(rx.try_recv(), Ok(40));
}

#[test]
fn test_pipeline_sees_batch_context() {
    let ring = FloodRing::<u32>::new(quiet(2, 1)).unwrap();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        ring.add_transform(move |batch, ctx| {
            seen.lock().push((ctx.origin(), ctx.pending(), ctx.capacity()));
            batch
        });
    }

    let _rx = ring.output();
    ring.push([1, 2, 3]).unwrap();
    ring.drain().unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], (floodring::BatchOrigin::Evicted, 2, 2));
    assert_eq!(seen[1], (floodring::BatchOrigin::Drain, 0, 2));
}

#[test]
#[traced_test]
fn test_debug_stage_runs_after_late_transforms() {
    let ring = FloodRing::<u32>::new(quiet(8, 1)).unwrap();
    ring.add_transform(|batch, _| batch.into_iter().map(|x| x + 100).collect());
    ring.set_debug(true);

    ring.push([1, 2]).unwrap();
    ring.get(2).unwrap();

    assert!(logs_contain("batch emitted"));
    assert!(logs_contain("[101, 102]"));
}

#[test]
fn test_purge_then_count_is_zero() {
    let ring = FloodRing::<u32>::new(quiet(4, 1)).unwrap();
    ring.purge().unwrap();
    assert_eq!(ring.count(), 0);

    ring.push(0..3).unwrap();
    ring.purge().unwrap();
    assert_eq!(ring.count(), 0);
    assert_eq!(ring.get(1).unwrap(), None);
}

#[test]
fn test_get_on_queue_delivers_transformed_once() {
    let ring = FloodRing::<u32>::new(quiet(10, 1)).unwrap();
    ring.add_transform(|batch, _| batch.into_iter().map(|x| x * 2).collect());
    ring.push([1, 2, 3]).unwrap();

    assert_eq!(ring.get_on_queue(2), Err(FloodError::NotAttached));
    assert_eq!(ring.count(), 3);

    let rx = ring.output();
    ring.get_on_queue(2).unwrap();
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![2, 4]);
    assert_eq!(ring.count(), 1);
}

#[test]
fn test_full_queue_blocks_producer() {
    let ring = Arc::new(FloodRing::<u32>::new(quiet(1, 1).with_queue_capacity(1)).unwrap());
    let rx = ring.output();

    // fills the queue
    ring.push([1, 2]).unwrap();
    assert_eq!(rx.len(), 1);

    let done = Arc::new(AtomicBool::new(false));
    let producer = {
        let ring = Arc::clone(&ring);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            ring.push([3]).unwrap();
            done.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(!done.load(Ordering::SeqCst), "push should block on a full queue");

    assert_eq!(rx.recv(), Some(1));
    producer.join().unwrap();
    assert!(done.load(Ordering::SeqCst));
    assert_eq!(rx.try_recv(), Ok(2));
}

#[test]
fn test_close_releases_blocked_producer() {
    let ring = Arc::new(FloodRing::<u32>::new(quiet(1, 1).with_queue_capacity(1)).unwrap());
    let rx = ring.output();
    ring.push([1, 2]).unwrap();

    let producer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || ring.push([3]))
    };
    thread::sleep(Duration::from_millis(50));

    ring.close();
    // a push that got in first is accepted and its delivery cut short
    let result = producer.join().unwrap();
    assert!(matches!(result, Ok(()) | Err(FloodError::Closed)), "{:?}", result);
    assert_eq!(rx.iter().collect::<Vec<_>>(), vec![1]);
}

#[test]
#[traced_test]
fn test_close_interrupts_flush_and_keeps_remainder_buffered() {
    let ring = Arc::new(FloodRing::<u32>::new(quiet(10, 2).with_queue_capacity(1)).unwrap());
    let rx = ring.output();
    ring.push(1..=6).unwrap();

    // queues 1, then blocks sending 2
    let flusher = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || ring.drain_to_queue(GatePolicy::Ignore))
    };
    thread::sleep(Duration::from_millis(100));

    ring.close();
    assert_eq!(flusher.join().unwrap(), Ok(()));

    assert_eq!(rx.iter().collect::<Vec<_>>(), vec![1]);
    let m = ring.metrics();
    assert_eq!(m.delivered, 1);
    assert_eq!(m.discarded, 1);
    assert!(logs_contain("closing buffer with undelivered elements"));
    assert!(logs_contain("remaining=4"));
}

#[test]
#[traced_test]
fn test_close_warns_about_undelivered() {
    let ring = FloodRing::<u32>::new(quiet(8, 1)).unwrap();
    ring.push([1, 2, 3]).unwrap();
    ring.close();

    assert!(logs_contain("closing buffer with undelivered elements"));
}

#[test]
fn test_close_keeps_queued_elements_readable() {
    let ring = FloodRing::<u32>::new(quiet(1, 1)).unwrap();
    let rx = ring.output();
    ring.push([1, 2, 3]).unwrap();
    ring.close();

    assert!(rx.is_closed());
    assert_eq!(rx.iter().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(rx.recv(), None);
    assert_eq!(ring.push([4]), Err(FloodError::Closed));
}

#[test]
fn test_drop_closes_queue() {
    let ring = FloodRing::<u32>::new(quiet(4, 1)).unwrap();
    let rx = ring.output();
    drop(ring);
    assert!(rx.is_closed());
    assert_eq!(rx.recv(), None);
}

#[test]
fn test_concurrent_producers_conserve_elements() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 2_000;

    let ring = Arc::new(FloodRing::<(u32, u32)>::new(quiet(64, 4)).unwrap());
    let rx = ring.output();

    let consumer = thread::spawn(move || rx.into_iter().collect::<Vec<_>>());

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    ring.push([(id, i)]).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    ring.drain_to_queue(GatePolicy::Ignore).unwrap();
    ring.close();
    let received = consumer.join().unwrap();

    assert_eq!(received.len(), (PRODUCERS * PER_PRODUCER) as usize);

    // per-producer order survives interleaving
    let mut last_seen = vec![None; PRODUCERS as usize];
    for (id, i) in received {
        if let Some(prev) = last_seen[id as usize] {
            assert!(i > prev, "producer {} out of order: {} after {}", id, i, prev);
        }
        last_seen[id as usize] = Some(i);
    }
}
