//! Parallel chunked compression of files and buffers.
//!
//! The input is split into fixed-size chunks, every chunk is compressed into
//! its own zstd frame concurrently, and the frames are written back to back in
//! chunk order. The result is an ordinary multi-frame zstd stream: any zstd
//! decoder restores the input, and [`decompress_file`] splits it at frame
//! boundaries to decode the frames concurrently as well.

use std::{
    path::Path,
    time::{Duration, Instant},
};

use log::{debug, info};
use serde::Deserialize;
use workcore_common::{Result, error::Error, verify_arg};
use workcore_workflow::{
    Chunk, ForkJoinPipeline, PoolConfig, TaskQueue, WorkerPool, config::default_pool_size,
};

use crate::{
    sink,
    source::{self, DEFAULT_CHUNK_SIZE},
    transform::{self, ChunkTransform, DEFAULT_LEVEL, ZstdTransform, chunk_worker},
};

/// Settings for [`compress_file`] and [`compress_bytes`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompressOptions {
    /// Size of each independently compressed chunk, in bytes.
    pub chunk_size: usize,
    /// zstd compression level.
    pub level: i32,
    /// Run the chunks on a fixed worker pool instead of one thread per chunk.
    pub pooled: bool,
    /// Worker count for pooled runs. Defaults to the number of logical CPUs.
    pub threads: Option<usize>,
}

impl Default for CompressOptions {
    fn default() -> Self {
        CompressOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            level: DEFAULT_LEVEL,
            pooled: false,
            threads: None,
        }
    }
}

impl CompressOptions {
    pub fn validate(&self) -> Result<()> {
        verify_arg!(chunk_size, self.chunk_size != 0);
        if let Some(threads) = self.threads {
            verify_arg!(threads, threads != 0);
        }
        ZstdTransform::new(self.level)?;
        Ok(())
    }

    fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.threads.unwrap_or_else(default_pool_size))
            .with_thread_name_prefix("compress")
    }
}

/// Outcome of a compression run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressionSummary {
    pub chunks: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub elapsed: Duration,
}

impl CompressionSummary {
    /// Input size divided by output size. `0.0` for empty output.
    pub fn ratio(&self) -> f64 {
        if self.output_bytes == 0 {
            return 0.0;
        }
        self.input_bytes as f64 / self.output_bytes as f64
    }

    /// Space saved relative to the input, in percent. Negative when the output
    /// grew.
    pub fn savings_percent(&self) -> f64 {
        if self.input_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.output_bytes as f64 / self.input_bytes as f64) * 100.0
    }
}

/// Compresses the file at `input` into `output`.
pub fn compress_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &CompressOptions,
) -> Result<CompressionSummary> {
    let (input, output) = (input.as_ref(), output.as_ref());
    options.validate()?;
    let started = Instant::now();

    let chunks = source::read_file_chunks(input, options.chunk_size)?;
    let count = chunks.len();
    let input_bytes = chunks.iter().map(|c| c.len() as u64).sum();
    debug!(
        "compressing {} ({input_bytes} bytes) as {count} chunks",
        input.display()
    );

    let frames = transform_chunks(chunks, ZstdTransform::new(options.level)?, options)?;
    let output_bytes = sink::write_chunks(output, &frames)?;

    let summary = CompressionSummary {
        chunks: count,
        input_bytes,
        output_bytes,
        elapsed: started.elapsed(),
    };
    info!(
        "compressed {} -> {}: {} chunks, {} -> {} bytes (ratio {:.2}) in {:?}",
        input.display(),
        output.display(),
        summary.chunks,
        summary.input_bytes,
        summary.output_bytes,
        summary.ratio(),
        summary.elapsed
    );
    Ok(summary)
}

/// Compresses an in-memory buffer into a multi-frame zstd stream.
pub fn compress_bytes(data: &[u8], options: &CompressOptions) -> Result<Vec<u8>> {
    options.validate()?;
    let chunks = source::split_bytes(data, options.chunk_size)?;
    let frames = transform_chunks(chunks, ZstdTransform::new(options.level)?, options)?;
    Ok(frames.concat())
}

/// Decompresses the zstd stream at `input` into `output`, decoding frames
/// concurrently. Returns the number of bytes written.
pub fn decompress_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &CompressOptions,
) -> Result<u64> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let started = Instant::now();

    let data =
        std::fs::read(input).map_err(|e| Error::io(format!("read {}", input.display()), e))?;
    let frames = split_frames(&data)?;
    let count = frames.len();

    let parts = transform_chunks(frames, FrameDecoder, options)?;
    let written = sink::write_chunks(output, &parts)?;
    info!(
        "decompressed {} -> {}: {count} frames, {} -> {written} bytes in {:?}",
        input.display(),
        output.display(),
        data.len(),
        started.elapsed()
    );
    Ok(written)
}

/// Splits a multi-frame zstd stream into one chunk per frame.
pub fn split_frames(data: &[u8]) -> Result<Vec<Chunk>> {
    let mut frames = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let len = zstd::zstd_safe::find_frame_compressed_size(rest).map_err(|code| {
            Error::compression(
                format!("zstd frame {}", frames.len()),
                std::io::Error::other(zstd::zstd_safe::get_error_name(code)),
            )
        })?;
        let (frame, tail) = rest.split_at(len);
        frames.push(Chunk::new(frames.len(), frame));
        rest = tail;
    }
    Ok(frames)
}

struct FrameDecoder;

impl ChunkTransform for FrameDecoder {
    fn name(&self) -> &str {
        "unzstd"
    }

    fn apply(&self, data: &[u8]) -> Result<Vec<u8>> {
        transform::decompress(data)
    }
}

fn transform_chunks<T: ChunkTransform>(
    chunks: Vec<Chunk>,
    transform: T,
    options: &CompressOptions,
) -> Result<Vec<Vec<u8>>> {
    let worker = chunk_worker(transform);
    if !options.pooled {
        return ForkJoinPipeline::new().run_chunks(chunks, worker);
    }

    let pool = WorkerPool::with_config(&options.pool_config(), TaskQueue::new())?;
    let result = ForkJoinPipeline::with_pool(&pool).run_chunks(chunks, worker);
    let stats = pool.shutdown_and_join();
    debug!(
        "compression pool finished: {} tasks completed, {} failed",
        stats.completed, stats.failed
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use workcore_common::error::ErrorKind;

    fn sample(len: usize) -> Vec<u8> {
        let mut rng = fastrand::Rng::with_seed(42);
        // Compressible: a small alphabet with runs.
        (0..len).map(|_| b"aaaabbc"[rng.usize(0..7)]).collect()
    }

    #[test]
    fn test_compress_bytes_round_trip() {
        let data = sample(10_000);
        let options = CompressOptions {
            chunk_size: 1000,
            ..Default::default()
        };
        let stream = compress_bytes(&data, &options).unwrap();
        assert!(stream.len() < data.len());
        assert_eq!(transform::decompress(&stream).unwrap(), data);
        assert_eq!(split_frames(&stream).unwrap().len(), 10);
    }

    #[test]
    fn test_pooled_and_threaded_streams_match() {
        let data = sample(5_000);
        let threaded = CompressOptions {
            chunk_size: 512,
            ..Default::default()
        };
        let pooled = CompressOptions {
            pooled: true,
            threads: Some(3),
            ..threaded.clone()
        };
        assert_eq!(
            compress_bytes(&data, &threaded).unwrap(),
            compress_bytes(&data, &pooled).unwrap()
        );
    }

    #[test]
    fn test_empty_input() {
        let stream = compress_bytes(&[], &CompressOptions::default()).unwrap();
        assert!(stream.is_empty());
        assert!(split_frames(&stream).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_options() {
        let options = CompressOptions {
            chunk_size: 0,
            ..Default::default()
        };
        let err = compress_bytes(b"abc", &options).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));

        let options = CompressOptions {
            level: ZstdTransform::level_range().end() + 1,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = CompressOptions {
            pooled: true,
            threads: Some(0),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_truncated_stream_is_rejected() {
        let stream = compress_bytes(&sample(3_000), &CompressOptions::default()).unwrap();
        let err = split_frames(&stream[..stream.len() - 3]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Compression { .. }));
    }

    #[test]
    fn test_summary_figures() {
        let summary = CompressionSummary {
            chunks: 4,
            input_bytes: 1000,
            output_bytes: 250,
            elapsed: Duration::ZERO,
        };
        assert_eq!(summary.ratio(), 4.0);
        assert_eq!(summary.savings_percent(), 75.0);

        let empty = CompressionSummary {
            chunks: 0,
            input_bytes: 0,
            output_bytes: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(empty.ratio(), 0.0);
        assert_eq!(empty.savings_percent(), 0.0);
    }

    #[test]
    fn test_options_from_json() {
        let options: CompressOptions =
            serde_json::from_str(r#"{ "level": 9, "pooled": true }"#).unwrap();
        assert_eq!(options.level, 9);
        assert!(options.pooled);
        assert_eq!(options.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(options.threads, None);
    }
}
