//! Fork-join processing of independent, indexed units of work.
//!
//! [`ForkJoinPipeline`] dispatches one concurrent unit per input item, waits for
//! every unit to finish, and reassembles the outcomes in input order:
//!
//! - [`run`](ForkJoinPipeline::run) - transform byte [`Chunk`]s and concatenate
//!   the outputs in chunk index order
//! - [`run_chunks`](ForkJoinPipeline::run_chunks) - same, keeping per-chunk outputs
//! - [`map_indexed`](ForkJoinPipeline::map_indexed) - the generic form over any
//!   item and result type (e.g. gathering fetched pages)
//!
//! Every unit writes its outcome into its own single-assignment result slot.
//! Failures never cancel sibling units: the orchestrator waits for all of them,
//! then reports the failure with the lowest index as `PipelineFailed`. A unit
//! that panics is recorded as a `ChunkTransform` error for its index.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::Instant,
};

use log::{debug, error};
use workcore_common::{Result, error::Error};

use crate::{result_slot, worker_pool::WorkerPool, worker_pool::panic_message};

/// An indexed, independent slice of a larger input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Output position of this chunk's result.
    pub index: usize,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(index: usize, data: impl Into<Vec<u8>>) -> Chunk {
        Chunk {
            index,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// How a pipeline runs its units.
#[derive(Clone, Copy)]
enum Dispatch<'p> {
    /// One dedicated OS thread per unit.
    ThreadPerChunk,
    /// One task per unit on an existing pool.
    ///
    /// The calling thread blocks until every task finishes, so running a pooled
    /// pipeline from inside one of the same pool's work items can starve the
    /// pool.
    Pool(&'p WorkerPool),
}

/// Splits work into concurrent units and joins their results in input order.
///
/// A pipeline holds no state between runs. Both dispatch modes produce
/// identical results.
#[derive(Clone, Copy)]
pub struct ForkJoinPipeline<'p> {
    dispatch: Dispatch<'p>,
}

impl ForkJoinPipeline<'static> {
    /// Creates a pipeline that runs each unit on its own thread.
    pub fn new() -> Self {
        ForkJoinPipeline {
            dispatch: Dispatch::ThreadPerChunk,
        }
    }
}

impl Default for ForkJoinPipeline<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> ForkJoinPipeline<'p> {
    /// Creates a pipeline that runs each unit as a task on `pool`.
    pub fn with_pool(pool: &'p WorkerPool) -> Self {
        ForkJoinPipeline {
            dispatch: Dispatch::Pool(pool),
        }
    }

    /// Transforms every chunk concurrently and returns the outputs concatenated
    /// in chunk index order.
    ///
    /// Chunk indices must be exactly `0..chunks.len()`, in any order. Zero
    /// chunks produce an empty output.
    pub fn run<F>(&self, chunks: Vec<Chunk>, worker: F) -> Result<Vec<u8>>
    where
        F: Fn(Chunk) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        Ok(self.run_chunks(chunks, worker)?.concat())
    }

    /// Transforms every chunk concurrently and returns the per-chunk outputs in
    /// chunk index order.
    pub fn run_chunks<F>(&self, chunks: Vec<Chunk>, worker: F) -> Result<Vec<Vec<u8>>>
    where
        F: Fn(Chunk) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        let chunks = order_by_index(chunks)?;
        self.map_indexed(chunks, move |_, chunk| worker(chunk))
    }

    /// Applies `f` to every item concurrently, passing the item's position, and
    /// returns the results in input order.
    ///
    /// Waits for every unit to finish. If any unit fails, the error of the
    /// lowest failing position is returned wrapped in `PipelineFailed` and all
    /// other results are discarded.
    pub fn map_indexed<T, R, F>(&self, items: Vec<T>, f: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(usize, T) -> Result<R> + Send + Sync + 'static,
    {
        let count = items.len();
        if count == 0 {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let outcomes = match self.dispatch {
            Dispatch::ThreadPerChunk => fork_threads(items, &f),
            Dispatch::Pool(pool) => fork_on_pool(pool, items, Arc::new(f)),
        };
        debug!(
            "fork-join of {count} units finished in {:?}",
            started.elapsed()
        );

        join_in_order(outcomes)
    }
}

/// Places each chunk at the position named by its index, rejecting indices that
/// are out of range or repeated.
fn order_by_index(chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
    let count = chunks.len();
    let mut ordered: Vec<Option<Chunk>> = (0..count).map(|_| None).collect();
    for chunk in chunks {
        let index = chunk.index;
        let Some(slot) = ordered.get_mut(index) else {
            return Err(Error::invalid_arg(
                "chunks",
                format!("chunk index {index} is out of range for {count} chunks"),
            ));
        };
        if slot.is_some() {
            return Err(Error::invalid_arg(
                "chunks",
                format!("duplicate chunk index {index}"),
            ));
        }
        *slot = Some(chunk);
    }
    // `count` distinct indices below `count` fill every position.
    Ok(ordered.into_iter().flatten().collect())
}

fn run_unit<T, R, F>(index: usize, item: T, f: &F) -> Result<R>
where
    F: Fn(usize, T) -> Result<R>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| f(index, item))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(Error::chunk_transform(
            index,
            panic_message(payload.as_ref()),
        )),
    }
}

fn fork_threads<T, R, F>(items: Vec<T>, f: &F) -> Vec<Result<R>>
where
    T: Send,
    R: Send,
    F: Fn(usize, T) -> Result<R> + Sync,
{
    let count = items.len();
    let (writers, readers): (Vec<_>, Vec<_>) =
        (0..count).map(|_| result_slot::slot::<Result<R>>()).unzip();
    let mut spawn_failures: Vec<Option<Error>> = (0..count).map(|_| None).collect();

    // Leaving the scope joins every spawned thread.
    thread::scope(|scope| {
        for ((index, item), writer) in items.into_iter().enumerate().zip(writers) {
            let spawned = thread::Builder::new()
                .name(format!("fork-join-{index}"))
                .spawn_scoped(scope, move || writer.set(run_unit(index, item, f)));
            if let Err(e) = spawned {
                error!("failed to spawn thread for unit {index}: {e}");
                spawn_failures[index] = Some(Error::io("spawn fork-join thread", e));
            }
        }
    });

    readers
        .into_iter()
        .zip(spawn_failures)
        .map(|(reader, failure)| {
            reader
                .wait()
                .unwrap_or_else(|| Err(failure.unwrap_or_else(Error::task_abandoned)))
        })
        .collect()
}

fn fork_on_pool<T, R, F>(pool: &WorkerPool, items: Vec<T>, f: Arc<F>) -> Vec<Result<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> Result<R> + Send + Sync + 'static,
{
    let handles: Vec<_> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let f = f.clone();
            pool.spawn(move || run_unit(index, item, f.as_ref()))
        })
        .collect();

    handles
        .into_iter()
        .map(|handle| handle.and_then(|h| h.join()).and_then(|outcome| outcome))
        .collect()
}

fn join_in_order<R>(outcomes: Vec<Result<R>>) -> Result<Vec<R>> {
    let mut results = Vec::with_capacity(outcomes.len());
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                error!("unit {index} failed: {e}");
                return Err(Error::pipeline_failed(index, e));
            }
        }
    }
    Ok(results)
}
