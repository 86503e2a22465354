//! Worker pool configuration.

use serde::Deserialize;
use workcore_common::{Result, verify_arg};

/// Settings for a [`WorkerPool`](crate::worker_pool::WorkerPool).
///
/// Can be built in code or deserialized as part of a larger configuration
/// file; missing fields take their [`Default`] values.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads. Fixed for the lifetime of the pool.
    pub size: usize,
    /// Worker threads are named `{prefix}-{index}`. No name is set when `None`.
    pub thread_name_prefix: Option<String>,
}

impl PoolConfig {
    pub fn new(size: usize) -> PoolConfig {
        PoolConfig {
            size,
            thread_name_prefix: None,
        }
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> PoolConfig {
        self.thread_name_prefix = Some(prefix.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(size, self.size != 0);
        Ok(())
    }

    pub(crate) fn thread_name(&self, index: usize) -> Option<String> {
        self.thread_name_prefix
            .as_ref()
            .filter(|prefix| !prefix.is_empty())
            .map(|prefix| format!("{prefix}-{index}"))
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            size: default_pool_size(),
            thread_name_prefix: Some("workcore-worker".to_string()),
        }
    }
}

/// Number of logical CPUs, or 8 if it cannot be determined.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(8)
}
