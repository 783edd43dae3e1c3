use crate::error::{PipelineError, Result};
use crate::monitor::Monitor;
use parking_lot::{Mutex, MutexGuard};

/// Ring state guarded by the queue lock
#[derive(Debug)]
struct RingState<T> {
    slots: Vec<Option<T>>,
    capacity: usize,
    count: usize,
    head: usize,
    tail: usize,
    closed: bool,
}

/// A fixed-capacity blocking FIFO of owned items.
///
/// Buffer, indices, count and the closed flag are protected by a single
/// lock. Three monitors each track one predicate: room available, item
/// available, and drained (closed and empty).
///
/// A waiter resets its monitor only while holding the queue lock and after
/// seeing its predicate false. Every transition that makes a predicate true
/// happens under the same lock and signals afterwards, so no wakeup is lost.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    state: Mutex<RingState<T>>,
    not_full: Monitor,
    not_empty: Monitor,
    drained: Monitor,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::InvalidCapacity(0));
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| PipelineError::OutOfMemory(capacity))?;
        slots.resize_with(capacity, || None);

        Ok(Self {
            state: Mutex::new(RingState {
                slots,
                capacity,
                count: 0,
                head: 0,
                tail: 0,
                closed: false,
            }),
            not_full: Monitor::new(),
            not_empty: Monitor::new(),
            drained: Monitor::new(),
        })
    }

    /// Insert an item at the tail, blocking while the queue is full.
    ///
    /// Fails with [`PipelineError::QueueClosed`] if the queue is closed
    /// before or while waiting for room; the item is dropped in that case.
    pub fn put(&self, item: T) -> Result<()> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(PipelineError::QueueClosed);
            }
            if state.count < state.capacity {
                break;
            }
            self.not_full.reset();
            MutexGuard::unlocked(&mut state, || self.not_full.wait());
        }

        let tail = state.tail;
        state.slots[tail] = Some(item);
        state.tail = (tail + 1) % state.capacity;
        state.count += 1;

        self.not_empty.signal();
        Ok(())
    }

    /// Remove the head item, blocking while the queue is empty and open.
    ///
    /// Returns `None` once the queue is closed and empty (end of stream).
    pub fn get(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if state.count > 0 {
                break;
            }
            if state.closed {
                return None;
            }
            self.not_empty.reset();
            MutexGuard::unlocked(&mut state, || self.not_empty.wait());
        }

        let head = state.head;
        let item = state.slots[head].take();
        state.head = (head + 1) % state.capacity;
        state.count -= 1;

        self.not_full.signal();
        if state.count == 0 && state.closed {
            self.drained.signal();
        }
        item
    }

    /// Close the queue. Idempotent.
    ///
    /// Wakes blocked producers and consumers and signals drained at once if
    /// nothing is left to consume.
    pub fn signal_finished(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;

        self.not_empty.signal();
        self.not_full.signal();
        if state.count == 0 {
            self.drained.signal();
        }
    }

    /// Block until the queue has been closed and emptied
    pub fn wait_drained(&self) {
        self.drained.wait();
    }

    /// Whether the drained signal has fired
    pub fn is_drained(&self) -> bool {
        self.drained.is_signaled()
    }

    /// Whether the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Get the current number of queued items
    pub fn len(&self) -> usize {
        self.state.lock().count
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the capacity of the queue
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }
}
