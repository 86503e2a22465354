//! Fixed-size worker pool draining a [`TaskQueue`].
//!
//! Workers repeatedly [`take`](TaskQueue::take) a work item and run it on their
//! own thread until the queue is shut down and drained. A work item that panics
//! is caught by the worker loop: the failure is logged, counted in
//! [`PoolStats`], and passed to the pool's failure hook, and the worker moves
//! on to the next item.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use log::{debug, error, info, warn};
use workcore_common::{Result, error::Error};

use crate::{
    config::PoolConfig,
    join_handle::JoinHandle,
    result_slot,
    task_queue::{TaskQueue, WorkItem},
};

/// Callback invoked with a `WorkItemFailure` error whenever a work item panics.
pub type FailureHook = Arc<dyn Fn(&Error) + Send + Sync + 'static>;

/// Counters describing the work done by a pool so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Items that ran to completion.
    pub completed: usize,
    /// Items that panicked.
    pub failed: usize,
}

/// A fixed set of worker threads bound to one [`TaskQueue`].
///
/// Workers are interchangeable; their index is only used for thread names and
/// log messages. The pool size never changes after construction.
///
/// Dropping a pool that was not joined shuts its queue down and waits for the
/// workers to drain it.
pub struct WorkerPool {
    queue: TaskQueue<WorkItem>,
    workers: Vec<thread::JoinHandle<()>>,
    shared: Arc<Shared>,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool with its own queue and `size` workers.
    pub fn new(size: usize) -> Result<WorkerPool> {
        Self::start(size, TaskQueue::new())
    }

    /// Spawns `size` workers bound to `queue`.
    ///
    /// Fails with `InvalidArgument` if `size` is 0.
    pub fn start(size: usize, queue: TaskQueue<WorkItem>) -> Result<WorkerPool> {
        Self::with_config(&PoolConfig::new(size), queue)
    }

    /// Spawns workers as described by `config`, bound to `queue`.
    pub fn with_config(config: &PoolConfig, queue: TaskQueue<WorkItem>) -> Result<WorkerPool> {
        Self::spawn_workers(config, queue, None)
    }

    /// Like [`with_config`](Self::with_config), additionally reporting every
    /// failed work item to `hook`.
    ///
    /// The hook runs on the worker thread that caught the failure.
    pub fn with_failure_hook(
        config: &PoolConfig,
        queue: TaskQueue<WorkItem>,
        hook: FailureHook,
    ) -> Result<WorkerPool> {
        Self::spawn_workers(config, queue, Some(hook))
    }

    fn spawn_workers(
        config: &PoolConfig,
        queue: TaskQueue<WorkItem>,
        on_failure: Option<FailureHook>,
    ) -> Result<WorkerPool> {
        config.validate()?;

        let shared = Arc::new(Shared {
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            on_failure,
        });

        let mut pool = WorkerPool {
            queue,
            workers: Vec::with_capacity(config.size),
            shared,
            size: config.size,
        };

        for index in 0..config.size {
            let mut builder = thread::Builder::new();
            if let Some(name) = config.thread_name(index) {
                builder = builder.name(name);
            }
            let queue = pool.queue.clone();
            let shared = pool.shared.clone();
            match builder.spawn(move || Self::thread_fn(index, queue, shared)) {
                Ok(handle) => pool.workers.push(handle),
                // Dropping the partially built pool shuts down and joins the
                // workers that did start.
                Err(e) => return Err(Error::io("spawn worker thread", e)),
            }
        }

        info!("started worker pool with {} workers", config.size);
        Ok(pool)
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The queue this pool drains. Clone it to hand it to other producers.
    pub fn queue(&self) -> &TaskQueue<WorkItem> {
        &self.queue
    }

    /// Submits a fire-and-forget work item.
    ///
    /// Returns `QueueClosed` once the pool's queue is shutting down.
    pub fn submit<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.submit(Box::new(f)).inspect_err(|_| {
            warn!("work item rejected: queue is shutting down");
        })
    }

    /// Submits a function and returns a handle to its result.
    ///
    /// If `f` panics, the failure is handled like any other failed work item
    /// and the handle reports `TaskAbandoned`.
    pub fn spawn<F, R>(&self, f: F) -> Result<JoinHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = result_slot::slot::<R>();
        self.submit(move || tx.set(f()))?;
        Ok(JoinHandle::new(rx))
    }

    /// Shuts the queue down. Pending items are still executed; new submissions
    /// are rejected.
    pub fn shutdown(&self) {
        if !self.queue.is_shutting_down() {
            info!(
                "shutting down worker pool ({} pending items)",
                self.queue.len()
            );
        }
        self.queue.shutdown();
    }

    /// Blocks until every worker thread has exited and returns the final stats.
    ///
    /// Workers only exit once the queue is shut down and drained, so call
    /// [`shutdown`](Self::shutdown) first (or use
    /// [`shutdown_and_join`](Self::shutdown_and_join)); otherwise this waits for
    /// another handle to the queue to shut it down.
    pub fn join_all(mut self) -> PoolStats {
        self.join_workers();
        self.stats()
    }

    /// Shuts the queue down, drains it and joins every worker.
    pub fn shutdown_and_join(self) -> PoolStats {
        self.shutdown();
        self.join_all()
    }

    /// Returns a snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            completed: self.shared.completed.load(Ordering::Acquire),
            failed: self.shared.failed.load(Ordering::Acquire),
        }
    }

    fn join_workers(&mut self) {
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }
        debug!("all workers joined");
    }

    fn thread_fn(index: usize, queue: TaskQueue<WorkItem>, shared: Arc<Shared>) {
        debug!("worker {index} started");
        while let Some(item) = queue.take() {
            debug!("worker {index} executing work item");
            match panic::catch_unwind(AssertUnwindSafe(item)) {
                Ok(()) => {
                    shared.completed.fetch_add(1, Ordering::AcqRel);
                }
                Err(payload) => {
                    shared.failed.fetch_add(1, Ordering::AcqRel);
                    let err = Error::work_item_failure(index, panic_message(payload.as_ref()));
                    error!("{err}");
                    if let Some(hook) = &shared.on_failure {
                        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(&err))) {
                            error!(
                                "worker {index} failure hook panicked: {}",
                                panic_message(payload.as_ref())
                            );
                        }
                    }
                }
            }
        }
        debug!("worker {index} exiting");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.queue.shutdown();
            self.join_workers();
        }
    }
}

struct Shared {
    completed: AtomicUsize,
    failed: AtomicUsize,
    on_failure: Option<FailureHook>,
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
