//! Property and concurrency tests for the bounded hand-off queue
//!
//! Uses proptest to check the queue against a `VecDeque` model, plus
//! threaded tests for blocking, wake-up and shutdown behavior.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kuba_congestion::error::TryPopError;
use kuba_congestion::BoundedQueue;
use proptest::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

/// Poll until `cond` holds, failing the test after a generous timeout
fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}

// =============================================================================
// Model-based properties
// =============================================================================

mod model {
    use super::*;

    #[derive(Debug, Clone)]
    enum Op {
        Push,
        Pop,
        Close,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            5 => Just(Op::Push),
            4 => Just(Op::Pop),
            1 => Just(Op::Close),
        ]
    }

    proptest! {
        /// Single-threaded op sequences behave like a capped FIFO
        #[test]
        fn matches_vecdeque_model(
            capacity in 1usize..16,
            ops in prop::collection::vec(op(), 0..200)
        ) {
            let queue = BoundedQueue::new(capacity).unwrap();
            let mut model = VecDeque::new();
            let mut closed = false;
            let mut next = 0u32;

            for op in ops {
                match op {
                    // Pushing into a full open queue would block this thread
                    Op::Push if !closed && model.len() == capacity => {},
                    Op::Push => {
                        let result = queue.push(next);
                        if closed {
                            prop_assert_eq!(result.unwrap_err().into_inner(), next);
                        } else {
                            prop_assert!(result.is_ok());
                            model.push_back(next);
                        }
                        next += 1;
                    },
                    Op::Pop => match (queue.try_pop(), model.pop_front()) {
                        (Ok(got), Some(want)) => prop_assert_eq!(got, want),
                        (Err(TryPopError::Empty), None) => prop_assert!(!closed),
                        (Err(TryPopError::Closed), None) => prop_assert!(closed),
                        (got, want) => prop_assert!(false, "queue {:?} vs model {:?}", got, want),
                    },
                    Op::Close => {
                        queue.close();
                        closed = true;
                    },
                }

                prop_assert!(queue.len() <= capacity);
                prop_assert_eq!(queue.len(), model.len());
            }
        }

        /// A concurrent producer/consumer pair preserves order and loses nothing
        #[test]
        fn concurrent_fifo_preserves_order(
            capacity in 1usize..8,
            count in 0u32..500
        ) {
            let queue = Arc::new(BoundedQueue::new(capacity).unwrap());

            let producer = {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..count {
                        queue.push(i).unwrap();
                    }
                    queue.close();
                })
            };

            let mut received = Vec::with_capacity(count as usize);
            while let Ok(item) = queue.pop() {
                received.push(item);
            }
            producer.join().unwrap();

            prop_assert_eq!(received, (0..count).collect::<Vec<_>>());
            let stats = queue.stats();
            prop_assert!(stats.peak_len <= capacity);
            prop_assert_eq!(stats.total_pushed, count as u64);
            prop_assert_eq!(stats.total_popped, count as u64);
        }
    }
}

// =============================================================================
// Blocking behavior
// =============================================================================

#[test]
fn test_one_pop_releases_exactly_one_blocked_producer() {
    let queue = Arc::new(BoundedQueue::new(1).unwrap());
    queue.push(0u32).unwrap();

    let completed = Arc::new(AtomicUsize::new(0));
    let producers: Vec<_> = (1..=2u32)
        .map(|i| {
            let queue = Arc::clone(&queue);
            let completed = Arc::clone(&completed);
            thread::spawn(move || {
                if queue.push(i).is_ok() {
                    completed.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    wait_until("both producers to block", || queue.stats().blocked_pushes == 2);
    assert_eq!(completed.load(Ordering::SeqCst), 0);

    assert_eq!(queue.pop().unwrap(), 0);
    wait_until("one producer to finish", || completed.load(Ordering::SeqCst) == 1);

    // The other producer stays parked: the queue is full again
    thread::sleep(Duration::from_millis(50));
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(queue.len(), 1);

    // Closing releases the remaining producer with an error
    queue.close();
    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(completed.load(Ordering::SeqCst), 1);

    // The item that made it in is still delivered after close
    assert!(queue.pop().is_ok());
    assert!(queue.pop().is_err());
}

#[test]
fn test_close_releases_every_blocked_consumer() {
    let queue = Arc::new(BoundedQueue::<u32>::new(4).unwrap());

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        })
        .collect();

    wait_until("consumers to block", || queue.stats().blocked_pops == 3);
    queue.close();

    for consumer in consumers {
        assert!(consumer.join().unwrap().is_err());
    }
}

#[test]
fn test_many_producers_one_consumer_no_loss() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 1_000;

    let queue = Arc::new(BoundedQueue::new(3).unwrap());

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.push((p, i)).unwrap();
                }
            })
        })
        .collect();

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut last = vec![None; PRODUCERS as usize];
            let mut total = 0u32;
            while let Ok((p, i)) = queue.pop() {
                // Per-producer order is preserved
                if let Some(prev) = last[p as usize] {
                    assert!(i > prev);
                }
                last[p as usize] = Some(i);
                total += 1;
            }
            total
        })
    };

    for producer in producers {
        producer.join().unwrap();
    }
    queue.close();

    assert_eq!(consumer.join().unwrap(), PRODUCERS * PER_PRODUCER);
    assert!(queue.stats().peak_len <= 3);
}
