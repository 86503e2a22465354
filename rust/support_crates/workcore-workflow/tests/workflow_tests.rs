use std::sync::{
    Arc, Barrier, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::thread;
use std::time::Duration;

use workcore_common::Result;
use workcore_common::error::ErrorKind;
use workcore_workflow::{Chunk, ForkJoinPipeline, PoolConfig, TaskQueue, WorkerPool};

/// Three workers, four counting tasks, shutdown after submission, then join.
#[test]
fn test_three_workers_four_tasks() {
    let queue = TaskQueue::new();
    let pool = WorkerPool::start(3, queue.clone()).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..4 {
        let counter = counter.clone();
        queue
            .submit(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
    }
    queue.shutdown();

    let stats = pool.join_all();
    assert_eq!(counter.load(Ordering::SeqCst), 4);
    assert_eq!(stats.completed, 4);
    // Every worker has exited: nothing is left to take and no one is waiting.
    assert!(queue.is_empty());
    assert_eq!(queue.take().map(|_| ()), None);
}

/// Each of N items submitted by several producers runs exactly once.
#[test]
fn test_items_execute_exactly_once() {
    const PRODUCERS: usize = 4;
    const ITEMS: usize = 250;

    let pool = WorkerPool::with_config(&PoolConfig::new(5), TaskQueue::new()).unwrap();
    let hits: Arc<Vec<AtomicUsize>> =
        Arc::new((0..PRODUCERS * ITEMS).map(|_| AtomicUsize::new(0)).collect());

    thread::scope(|s| {
        for p in 0..PRODUCERS {
            let queue = pool.queue().clone();
            let hits = hits.clone();
            s.spawn(move || {
                for i in 0..ITEMS {
                    let hits = hits.clone();
                    let slot = p * ITEMS + i;
                    queue
                        .submit(Box::new(move || {
                            hits[slot].fetch_add(1, Ordering::SeqCst);
                        }))
                        .unwrap();
                }
            });
        }
    });

    let stats = pool.shutdown_and_join();
    assert_eq!(stats.completed, PRODUCERS * ITEMS);
    assert!(hits.iter().all(|h| h.load(Ordering::SeqCst) == 1));
}

/// Items accepted before shutdown still run, even when shutdown happens while
/// workers are busy; later submissions are rejected and never run.
#[test]
fn test_shutdown_drains_and_rejects() {
    let pool = WorkerPool::new(2).unwrap();
    let ran = Arc::new(AtomicUsize::new(0));

    for _ in 0..20 {
        let ran = ran.clone();
        pool.submit(move || {
            thread::sleep(Duration::from_millis(2));
            ran.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    pool.shutdown();

    let late = ran.clone();
    let err = pool
        .submit(move || {
            late.fetch_add(100, Ordering::SeqCst);
        })
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::QueueClosed));

    pool.join_all();
    assert_eq!(ran.load(Ordering::SeqCst), 20);
}

/// Producers racing a concurrent shutdown: every submission either succeeds
/// and runs exactly once, or is rejected with `QueueClosed` and never runs.
#[test]
fn test_shutdown_racing_producers() {
    const PRODUCERS: usize = 4;
    const ITEMS: usize = 500;

    let pool = WorkerPool::new(3).unwrap();
    let runs: Arc<Vec<AtomicUsize>> =
        Arc::new((0..PRODUCERS * ITEMS).map(|_| AtomicUsize::new(0)).collect());
    let accepted: Vec<AtomicBool> = (0..PRODUCERS * ITEMS)
        .map(|_| AtomicBool::new(false))
        .collect();
    let start = Barrier::new(PRODUCERS + 1);

    thread::scope(|s| {
        for p in 0..PRODUCERS {
            let queue = pool.queue().clone();
            let (runs, accepted, start) = (runs.clone(), &accepted, &start);
            s.spawn(move || {
                start.wait();
                for i in 0..ITEMS {
                    let slot = p * ITEMS + i;
                    let runs = runs.clone();
                    let outcome = queue.submit(Box::new(move || {
                        runs[slot].fetch_add(1, Ordering::SeqCst);
                    }));
                    match outcome {
                        Ok(()) => accepted[slot].store(true, Ordering::SeqCst),
                        Err(e) => assert!(e.is_queue_closed(), "unexpected error: {e}"),
                    }
                }
            });
        }

        let queue = pool.queue().clone();
        let start = &start;
        s.spawn(move || {
            start.wait();
            thread::sleep(Duration::from_micros(200));
            queue.shutdown();
        });
    });

    let stats = pool.join_all();
    let mut accepted_count = 0;
    for (slot, runs) in runs.iter().enumerate() {
        let ran = runs.load(Ordering::SeqCst);
        if accepted[slot].load(Ordering::SeqCst) {
            accepted_count += 1;
            assert_eq!(ran, 1, "accepted item {slot} ran {ran} times");
        } else {
            assert_eq!(ran, 0, "rejected item {slot} ran");
        }
    }
    assert_eq!(stats.completed, accepted_count);
    assert_eq!(stats.failed, 0);
}

/// With no worker yet dequeuing, items come out in submission order.
#[test]
fn test_dequeue_order_is_fifo() {
    let queue: TaskQueue = TaskQueue::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..10 {
        let order = order.clone();
        queue
            .submit(Box::new(move || order.lock().unwrap().push(i)))
            .unwrap();
    }
    queue.shutdown();

    // A single worker executes in dequeue order.
    WorkerPool::start(1, queue).unwrap().join_all();
    assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
}

fn reverse(chunk: Chunk) -> Result<Vec<u8>> {
    let mut data = chunk.data;
    data.reverse();
    Ok(data)
}

/// Five chunks of sizes [10, 10, 10, 10, 2], each reversed.
#[test]
fn test_reverse_five_chunks() {
    let input: Vec<u8> = (0..42).collect();
    let chunks: Vec<Chunk> = input
        .chunks(10)
        .enumerate()
        .map(|(index, data)| Chunk::new(index, data))
        .collect();
    assert_eq!(
        chunks.iter().map(Chunk::len).collect::<Vec<_>>(),
        vec![10, 10, 10, 10, 2]
    );

    let expected: Vec<u8> = input
        .chunks(10)
        .flat_map(|c| c.iter().rev().copied())
        .collect();

    let out = ForkJoinPipeline::new().run(chunks.clone(), reverse).unwrap();
    assert_eq!(out, expected);
    assert_eq!(out.len(), input.len());

    let pool = WorkerPool::new(2).unwrap();
    let pooled = ForkJoinPipeline::with_pool(&pool).run(chunks, reverse).unwrap();
    assert_eq!(pooled, expected);
}

/// Output order never depends on completion order, for random chunk layouts.
#[test]
fn test_random_layouts_keep_order() {
    let mut rng = fastrand::Rng::with_seed(7);
    for _ in 0..10 {
        let count = rng.usize(0..12);
        let chunks: Vec<Chunk> = (0..count)
            .map(|index| {
                let len = rng.usize(0..64);
                Chunk::new(index, (0..len).map(|_| rng.u8(..)).collect::<Vec<_>>())
            })
            .collect();
        let delays: Vec<u64> = (0..count).map(|_| rng.u64(0..5)).collect();

        let expected: Vec<u8> = chunks
            .iter()
            .cloned()
            .flat_map(|c| reverse(c).unwrap())
            .collect();
        let out = ForkJoinPipeline::new()
            .run(chunks, move |chunk| {
                thread::sleep(Duration::from_millis(delays[chunk.index]));
                reverse(chunk)
            })
            .unwrap();
        assert_eq!(out, expected);
    }
}
