//! Command implementations for the workcore command

use workcore_chunks::CompressOptions;

pub mod compress;
pub mod decompress;
pub mod run_tasks;

/// Applies the pool flags shared by `compress` and `decompress`. A thread
/// count implies a pooled run.
fn apply_pool_flags(options: &mut CompressOptions, threads: Option<usize>, pooled: bool) {
    if let Some(threads) = threads {
        options.threads = Some(threads);
        options.pooled = true;
    }
    if pooled {
        options.pooled = true;
    }
}
