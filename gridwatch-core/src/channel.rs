//! Blocking FIFO channel with shutdown semantics.
//!
//! Couples one pipeline stage to the next: the sniffer feeds the analyzer
//! with raw frames, the analyzer feeds the executor with actions. Producers
//! never block; consumers block until an item arrives or the channel is
//! drained after shutdown.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

struct Inner<T> {
    queue: VecDeque<T>,
    shutdown: bool,
}

/// Thread-safe FIFO queue connecting two pipeline stages.
///
/// FIFO order is guaranteed from the viewpoint of any single producer. After
/// [`Channel::shutdown`], pushes are dropped silently and pops drain the
/// remaining items before returning `None`.
pub struct Channel<T> {
    inner: Mutex<Inner<T>>,
    available: Condvar,
}

/// Outcome of a bounded wait on a channel.
pub enum PopTimeout<T> {
    /// An item was dequeued.
    Item(T),
    /// The wait expired with the queue still empty.
    TimedOut,
    /// The channel is shut down and fully drained.
    Closed,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Appends an item unless the channel is shut down, in which case the
    /// item is dropped silently. Wakes one waiting consumer.
    pub fn push(&self, item: T) {
        {
            let mut inner = self.inner.lock();
            if inner.shutdown {
                return;
            }
            inner.queue.push_back(item);
        }
        self.available.notify_one();
    }

    /// Blocks until an item is available or the channel is drained after
    /// shutdown. Returns `None` only in the latter case.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.queue.pop_front() {
                return Some(item);
            }
            if inner.shutdown {
                return None;
            }
            self.available.wait(&mut inner);
        }
    }

    /// Like [`Channel::pop`], but waits at most `timeout` for an item.
    ///
    /// The executor uses this to refresh the dashboard on a fixed cadence
    /// even when no actions arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> PopTimeout<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.queue.pop_front() {
                return PopTimeout::Item(item);
            }
            if inner.shutdown {
                return PopTimeout::Closed;
            }
            if self.available.wait_for(&mut inner, timeout).timed_out() {
                return match inner.queue.pop_front() {
                    Some(item) => PopTimeout::Item(item),
                    None if inner.shutdown => PopTimeout::Closed,
                    None => PopTimeout::TimedOut,
                };
            }
        }
    }

    /// Marks the channel closed and wakes all waiters. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock();
            inner.shutdown = true;
        }
        self.available.notify_all();
    }

    /// Advisory queue depth.
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}
