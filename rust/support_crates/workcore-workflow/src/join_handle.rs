//! Join handle for results of tasks spawned on a [`WorkerPool`](crate::worker_pool::WorkerPool).

use workcore_common::{Result, error::Error};

use crate::result_slot::SlotReader;

/// A handle for waiting on the result of a pooled task.
///
/// ## Lifecycle
///
/// 1. **Created**: When a task is spawned, a `JoinHandle` is returned
/// 2. **Pending**: The task is queued or running
/// 3. **Resolved**: The task has completed, or was discarded without running
/// 4. **Consumed**: The result has been retrieved via [`join()`](Self::join)
pub struct JoinHandle<R>(SlotReader<R>);

impl<R> JoinHandle<R> {
    pub(crate) fn new(rx: SlotReader<R>) -> JoinHandle<R> {
        JoinHandle(rx)
    }

    /// Waits for the task to complete and returns its result.
    ///
    /// Returns `ErrorKind::TaskAbandoned` if the task was dropped before it
    /// produced a value: it panicked, or its queue was torn down before a
    /// worker picked it up.
    pub fn join(self) -> Result<R> {
        self.0.wait().ok_or_else(Error::task_abandoned)
    }

    /// Waits for every handle, returning the outcomes in the same order as
    /// the input handles.
    ///
    /// All handles are joined even if some of them report an error.
    pub fn join_all(handles: impl IntoIterator<Item = JoinHandle<R>>) -> Vec<Result<R>> {
        handles.into_iter().map(|h| h.join()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result_slot;
    use workcore_common::error::ErrorKind;

    fn finished<R>(value: R) -> JoinHandle<R> {
        let (tx, rx) = result_slot::slot();
        tx.set(value);
        JoinHandle::new(rx)
    }

    #[test]
    fn test_finished_handle() {
        assert_eq!(finished(5).join().unwrap(), 5);
    }

    #[test]
    fn test_abandoned_handle() {
        let (tx, rx) = result_slot::slot::<u32>();
        let handle = JoinHandle::new(rx);
        drop(tx);
        let err = handle.join().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TaskAbandoned));
    }

    #[test]
    fn test_join_all_keeps_order() {
        let handles = (0..5).map(finished);
        let results: Vec<_> = JoinHandle::join_all(handles)
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(results, vec![0, 1, 2, 3, 4]);
    }
}
