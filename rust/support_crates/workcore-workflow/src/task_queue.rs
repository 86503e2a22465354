//! A blocking, multi-producer, multi-consumer FIFO task queue with cooperative
//! shutdown.
//!
//! [`TaskQueue`] is the primitive that feeds a [`WorkerPool`](crate::worker_pool::WorkerPool):
//! any number of producers [`submit`](TaskQueue::submit) items and any number of
//! consumers [`take`](TaskQueue::take) them in submission order. Calling
//! [`shutdown`](TaskQueue::shutdown) does not discard anything: consumers keep
//! draining the queue and only observe the end of the stream (`None`) once it is
//! both shut down and empty.
//!
//! Items submitted after shutdown has begun are rejected with
//! [`ErrorKind::QueueClosed`](workcore_common::error::ErrorKind::QueueClosed) and
//! are never handed to a consumer.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use workcore_common::{Result, error::Error};

/// A deferred unit of work with no return value.
pub type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// An error returned from [`TaskQueue::try_take`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryTakeError {
    /// The queue is empty but still accepting items.
    Empty,
    /// The queue is empty and shutting down, so no more items will ever be
    /// handed out.
    Closed,
}

impl std::fmt::Display for TryTakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TryTakeError::Empty => write!(f, "queue is empty"),
            TryTakeError::Closed => write!(f, "queue is empty and shutting down"),
        }
    }
}

impl std::error::Error for TryTakeError {}

/// A shared handle to a FIFO task queue.
///
/// Cloning the handle does not create a new queue: every clone refers to the
/// same pending items and the same shutdown flag. Each worker pool owns its own
/// queue instance; there is no process-wide queue.
pub struct TaskQueue<T = WorkItem> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        TaskQueue {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    /// Creates an empty queue that accepts submissions.
    pub fn new() -> Self {
        let inner = Inner {
            state: Mutex::new(InnerState {
                pending: VecDeque::new(),
                shutting_down: false,
            }),
            not_empty: Condvar::new(),
        };
        TaskQueue {
            inner: Arc::new(inner),
        }
    }

    /// Appends an item to the back of the queue and wakes one waiting consumer.
    ///
    /// Never blocks beyond acquiring the queue lock. Returns
    /// `ErrorKind::QueueClosed` if [`shutdown`](Self::shutdown) has already been
    /// called; the rejected item is dropped without running.
    pub fn submit(&self, item: T) -> Result<()> {
        let mut state = self.inner.state.lock().unwrap();
        if state.shutting_down {
            return Err(Error::queue_closed());
        }
        state.pending.push_back(item);

        // Drop the lock before notifying to potentially reduce contention.
        drop(state);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Removes and returns the earliest-submitted item, blocking while the
    /// queue is empty and not shutting down.
    ///
    /// Returns `None` once the queue is shutting down and every pending item has
    /// been handed out, which tells a consumer loop to exit.
    pub fn take(&self) -> Option<T> {
        let mut state = self.inner.state.lock().unwrap();
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some(item);
            }
            if state.shutting_down {
                return None;
            }
            state = self.inner.not_empty.wait(state).unwrap();
        }
    }

    /// Attempts to take an item without blocking.
    pub fn try_take(&self) -> std::result::Result<T, TryTakeError> {
        let mut state = self.inner.state.lock().unwrap();
        if let Some(item) = state.pending.pop_front() {
            return Ok(item);
        }
        if state.shutting_down {
            Err(TryTakeError::Closed)
        } else {
            Err(TryTakeError::Empty)
        }
    }

    /// Begins shutdown: new submissions are rejected and every blocked consumer
    /// is woken so it can drain the remaining items or exit.
    ///
    /// Calling this more than once has no further effect.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.shutting_down = true;
        drop(state);
        self.inner.not_empty.notify_all();
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.inner.state.lock().unwrap().shutting_down
    }

    /// Number of items waiting to be taken.
    pub fn len(&self) -> usize {
        self.inner.state.lock().unwrap().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The state of the queue that is protected by the Mutex.
struct InnerState<T> {
    pending: VecDeque<T>,
    shutting_down: bool,
}

/// The shared core of the queue, containing the state and condition variable.
struct Inner<T> {
    state: Mutex<InnerState<T>>,
    not_empty: Condvar, // Signaled on submit (one waiter) and on shutdown (all waiters).
}
