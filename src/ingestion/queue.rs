//! Bounded blocking queue for the ingestion → analysis hand-off
//!
//! A monitor-style FIFO: one `parking_lot::Mutex` guards the buffered items
//! and counters, two condition variables park producers (queue full) and
//! consumers (queue empty). The lock is never held while parked.
//!
//! # Flow control
//!
//! ```text
//!   push ──► [ full? wait on not_full ] ──► append ──► notify_one(not_empty)
//!   pop  ──► [ empty? wait on not_empty ] ─► remove ──► notify_one(not_full)
//!   close ─► closed = true ──► notify_all(both)
//! ```
//!
//! A slow consumer throttles the producer instead of dropping data.
//! Each push or pop wakes at most one waiter; only `close` wakes everyone.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::error::{Error, PushError, QueueClosed, Result, TryPopError};

/// Maximum allowed capacity to prevent absurd configurations
pub const MAX_QUEUE_CAPACITY: usize = 10_000_000;

/// Point-in-time queue statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct QueueStats {
    /// Items currently buffered
    pub len: usize,
    /// Fixed capacity
    pub capacity: usize,
    /// Highest number of items ever buffered at once
    pub peak_len: usize,
    /// Pushes that had to wait for space (backpressure events)
    pub blocked_pushes: u64,
    /// Pops that had to wait for an item
    pub blocked_pops: u64,
    /// Items accepted by push
    pub total_pushed: u64,
    /// Items handed out by pop / try_pop
    pub total_popped: u64,
    /// Whether close() has been called
    pub closed: bool,
}

/// State guarded by the queue mutex
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    peak_len: usize,
    blocked_pushes: u64,
    blocked_pops: u64,
    total_pushed: u64,
    total_popped: u64,
}

/// Fixed-capacity, thread-safe FIFO with blocking push and pop
///
/// # Example
///
/// ```rust
/// use kuba_congestion::ingestion::BoundedQueue;
/// use kuba_congestion::error::TryPopError;
///
/// let queue = BoundedQueue::new(2).unwrap();
/// queue.push(1).unwrap();
/// queue.push(2).unwrap();
/// assert_eq!(queue.pop(), Ok(1));
///
/// queue.close();
/// assert!(queue.push(3).is_err());
/// assert_eq!(queue.try_pop(), Ok(2));
/// assert_eq!(queue.try_pop(), Err(TryPopError::Closed));
/// ```
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    /// Signalled when an item becomes available (or on close)
    not_empty: Condvar,
    /// Signalled when a slot becomes free (or on close)
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `capacity` is zero or exceeds
    /// [`MAX_QUEUE_CAPACITY`].
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Configuration(
                "queue capacity must be > 0".to_string(),
            ));
        }
        if capacity > MAX_QUEUE_CAPACITY {
            return Err(Error::Configuration(format!(
                "queue capacity {} exceeds maximum allowed {}",
                capacity, MAX_QUEUE_CAPACITY
            )));
        }

        Ok(Self {
            state: Mutex::new(QueueState {
                // Large capacities grow on demand
                items: VecDeque::with_capacity(capacity.min(4096)),
                closed: false,
                peak_len: 0,
                blocked_pushes: 0,
                blocked_pops: 0,
                total_pushed: 0,
                total_popped: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        })
    }

    /// Append an item, blocking while the queue is full
    ///
    /// Wakes one waiting consumer once the item is queued.
    ///
    /// # Errors
    ///
    /// Returns the item inside `PushError` if the queue is closed, either
    /// before the call or while waiting for space.
    pub fn push(&self, item: T) -> std::result::Result<(), PushError<T>> {
        let mut state = self.state.lock();

        if !state.closed && state.items.len() >= self.capacity {
            state.blocked_pushes += 1;
            while !state.closed && state.items.len() >= self.capacity {
                self.not_full.wait(&mut state);
            }
        }

        if state.closed {
            return Err(PushError(item));
        }

        state.items.push_back(item);
        state.total_pushed += 1;
        if state.items.len() > state.peak_len {
            state.peak_len = state.items.len();
        }
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest item, blocking while the queue is empty
    ///
    /// Wakes one waiting producer once a slot is freed.
    ///
    /// # Errors
    ///
    /// Returns `QueueClosed` once the queue is closed and every buffered
    /// item has been handed out.
    pub fn pop(&self) -> std::result::Result<T, QueueClosed> {
        let mut state = self.state.lock();

        if !state.closed && state.items.is_empty() {
            state.blocked_pops += 1;
            while !state.closed && state.items.is_empty() {
                self.not_empty.wait(&mut state);
            }
        }

        match state.items.pop_front() {
            Some(item) => {
                state.total_popped += 1;
                drop(state);
                self.not_full.notify_one();
                Ok(item)
            },
            // Only reachable when closed and drained
            None => Err(QueueClosed),
        }
    }

    /// Remove the oldest item without blocking
    ///
    /// # Errors
    ///
    /// - `TryPopError::Empty` if the queue is open and holds nothing
    /// - `TryPopError::Closed` if the queue is closed and drained
    pub fn try_pop(&self) -> std::result::Result<T, TryPopError> {
        let mut state = self.state.lock();

        match state.items.pop_front() {
            Some(item) => {
                state.total_popped += 1;
                drop(state);
                self.not_full.notify_one();
                Ok(item)
            },
            None if state.closed => Err(TryPopError::Closed),
            None => Err(TryPopError::Empty),
        }
    }

    /// Mark the queue as finished
    ///
    /// Further pushes fail; buffered items remain poppable. Every parked
    /// producer and consumer is woken so none stays blocked. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let remaining = state.items.len();
        drop(state);

        debug!(remaining, "Queue closed");
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Number of buffered items
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Check if no items are buffered
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if close() has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Snapshot of the queue counters
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            len: state.items.len(),
            capacity: self.capacity,
            peak_len: state.peak_len,
            blocked_pushes: state.blocked_pushes,
            blocked_pops: state.blocked_pops,
            total_pushed: state.total_pushed,
            total_popped: state.total_popped,
            closed: state.closed,
        }
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("BoundedQueue")
            .field("len", &stats.len)
            .field("capacity", &stats.capacity)
            .field("closed", &stats.closed)
            .finish()
    }
}
