//! Concurrent task execution core: a blocking task queue feeding a fixed worker
//! pool, and a fork-join pipeline that processes independent chunks in parallel
//! and reassembles their results in order.
//!
//! # Key Components
//!
//! ## Task Execution
//!
//! - [`task_queue::TaskQueue`] - FIFO multi-producer, multi-consumer queue with
//!   cooperative (draining) shutdown
//! - [`worker_pool::WorkerPool`] - a fixed set of worker threads bound to one
//!   queue, isolating failing work items
//!
//! ## Fork-Join
//!
//! - [`fork_join::ForkJoinPipeline`] - one concurrent unit per chunk, results
//!   joined in index order, first error by index reported
//!
//! ## Building Blocks
//!
//! - [`result_slot`] - single-assignment slots carrying one result between threads
//! - [`join_handle`] - handles for waiting on pooled task results
//! - [`config`] - pool configuration

pub mod config;
pub mod fork_join;
pub mod join_handle;
pub mod result_slot;
pub mod task_queue;
pub mod worker_pool;

pub use config::PoolConfig;
pub use fork_join::{Chunk, ForkJoinPipeline};
pub use join_handle::JoinHandle;
pub use task_queue::{TaskQueue, WorkItem};
pub use worker_pool::{FailureHook, PoolStats, WorkerPool};
