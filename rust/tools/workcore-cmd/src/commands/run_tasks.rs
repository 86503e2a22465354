//! Run-tasks command implementation: submits a batch of labelled tasks to a
//! worker pool, shuts the queue down and waits for the workers.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use anyhow::{Context, Result};
use log::info;
use workcore_workflow::{PoolConfig, PoolStats, TaskQueue, WorkerPool};

use crate::config::CmdConfig;

const DEFAULT_WORKERS: usize = 3;

/// Run the run-tasks command
pub fn run(workers: Option<usize>, tasks: usize, config_path: Option<String>) -> Result<()> {
    let mut pool_config = match config_path.as_deref() {
        Some(path) => CmdConfig::load(Some(path))?.pool,
        None => PoolConfig::new(DEFAULT_WORKERS).with_thread_name_prefix("worker"),
    };
    if let Some(workers) = workers {
        pool_config.size = workers;
    }

    let executed = Arc::new(AtomicUsize::new(0));
    let stats = run_batch(&pool_config, tasks, executed.clone())?;

    println!(
        "Executed {} of {tasks} tasks on {} workers ({} failed)",
        executed.load(Ordering::SeqCst),
        pool_config.size,
        stats.failed
    );
    Ok(())
}

fn run_batch(config: &PoolConfig, tasks: usize, executed: Arc<AtomicUsize>) -> Result<PoolStats> {
    let queue = TaskQueue::new();
    let pool = WorkerPool::with_config(config, queue.clone())
        .with_context(|| "Failed to start worker pool")?;

    for index in 0..tasks {
        let label = task_label(index);
        let executed = executed.clone();
        queue
            .submit(Box::new(move || {
                let current = thread::current();
                println!(
                    "{} executing task {label}",
                    current.name().unwrap_or("worker")
                );
                executed.fetch_add(1, Ordering::SeqCst);
            }))
            .with_context(|| format!("Failed to submit task {}", task_label(index)))?;
    }
    queue.shutdown();
    info!("submitted {tasks} tasks, waiting for workers");

    Ok(pool.join_all())
}

/// `A`..`Z` for the first 26 tasks, `T26`, `T27`, ... after that.
fn task_label(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'A' + i).to_string(),
        _ => format!("T{index}"),
    }
}
