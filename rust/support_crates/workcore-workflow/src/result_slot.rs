//! Single-assignment result slots for handing one value from a producer thread
//! to the thread that joins it.
//!
//! A slot is created as a [`SlotWriter`] / [`SlotReader`] pair. The writer is
//! consumed by [`SlotWriter::set`], so a slot can be written at most once; the
//! reader is consumed by [`SlotReader::wait`], so it is read at most once.
//!
//! ## Slot Lifecycle
//!
//! 1. Pending: waiting for the producer
//! 2. Ready: the producer stored its value
//! 3. Closed: the value was taken, or the writer was dropped without writing
//!
//! A writer dropped while the slot is still pending closes it, so a reader
//! never waits on a producer that no longer exists. This is how a pooled task
//! that was discarded before running surfaces as "abandoned" instead of a hang.

use std::sync::{Arc, Condvar, Mutex};

/// Creates a new pending slot, returning its writer and reader halves.
pub fn slot<T>() -> (SlotWriter<T>, SlotReader<T>) {
    let cell = Arc::new(SlotCell::new(State::Pending));
    (SlotWriter(cell.clone()), SlotReader(cell))
}

/// The producing half of a result slot.
pub struct SlotWriter<T>(Arc<SlotCell<T>>);

impl<T> SlotWriter<T> {
    /// Stores the value and wakes the reader.
    pub fn set(self, value: T) {
        // The writer is consumed here; its drop afterwards finds the slot ready
        // and leaves it alone.
        self.0.set(value);
    }
}

impl<T> Drop for SlotWriter<T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// The consuming half of a result slot.
pub struct SlotReader<T>(Arc<SlotCell<T>>);

impl<T> SlotReader<T> {
    /// Blocks until the slot is resolved.
    ///
    /// Returns `Some(value)` if the producer wrote a value, or `None` if the
    /// writer was dropped without writing.
    pub fn wait(self) -> Option<T> {
        self.0.wait()
    }
}

struct SlotCell<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
}

impl<T> SlotCell<T> {
    fn new(state: State<T>) -> SlotCell<T> {
        SlotCell {
            state: Mutex::new(state),
            condvar: Condvar::new(),
        }
    }

    fn set(&self, value: T) {
        self.state.lock().unwrap().set(value);
        self.condvar.notify_all();
    }

    fn close(&self) {
        self.state.lock().unwrap().close();
        self.condvar.notify_all();
    }

    fn wait(&self) -> Option<T> {
        let guard = self.state.lock().unwrap();
        self.condvar
            .wait_while(guard, |state| state.is_pending())
            .unwrap()
            .take()
    }
}

/// The state transitions are:
/// - `Pending` -> `Ready(T)` when the writer stores a value
/// - `Pending` -> `Closed` when the writer is dropped unwritten
/// - `Ready(T)` -> `Closed` when the reader takes the value
enum State<T> {
    Pending,
    Ready(T),
    Closed,
}

impl<T> State<T> {
    fn is_pending(&self) -> bool {
        matches!(self, State::Pending)
    }

    fn set(&mut self, value: T) {
        debug_assert!(self.is_pending(), "result slot written twice");
        if self.is_pending() {
            *self = State::Ready(value);
        }
    }

    fn close(&mut self) {
        if self.is_pending() {
            *self = State::Closed;
        }
    }

    fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, State::Closed) {
            State::Pending => {
                *self = State::Pending;
                None
            }
            State::Ready(value) => Some(value),
            State::Closed => None,
        }
    }
}
