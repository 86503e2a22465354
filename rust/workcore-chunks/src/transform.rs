//! Chunk transforms: pure byte-to-byte functions applied independently to each
//! chunk of a fork-join run.

use std::{ops::RangeInclusive, sync::Arc};

use log::trace;
use workcore_common::{Result, error::Error};
use workcore_workflow::Chunk;

/// Default zstd compression level.
pub const DEFAULT_LEVEL: i32 = 3;

/// A transform that can be applied to chunks concurrently.
///
/// Implementations must not share mutable state between calls: the pipeline
/// invokes `apply` from many threads at once.
pub trait ChunkTransform: Send + Sync + 'static {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    fn apply(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Wraps a transform into the worker function expected by
/// [`ForkJoinPipeline`](workcore_workflow::ForkJoinPipeline).
pub fn chunk_worker<T>(transform: T) -> impl Fn(Chunk) -> Result<Vec<u8>> + Send + Sync + 'static
where
    T: ChunkTransform,
{
    let transform = Arc::new(transform);
    move |chunk: Chunk| {
        let out = transform.apply(&chunk.data)?;
        trace!(
            "{} chunk {}: {} -> {} bytes",
            transform.name(),
            chunk.index,
            chunk.len(),
            out.len()
        );
        Ok(out)
    }
}

/// Compresses each chunk into an independent zstd frame.
///
/// Frames written back to back form a valid multi-frame zstd stream, so the
/// concatenated pipeline output can be decoded with [`decompress`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZstdTransform {
    level: i32,
}

impl ZstdTransform {
    pub fn new(level: i32) -> Result<ZstdTransform> {
        let range = Self::level_range();
        if !range.contains(&level) {
            return Err(Error::invalid_arg(
                "level",
                format!(
                    "compression level {level} is outside {}..={}",
                    range.start(),
                    range.end()
                ),
            ));
        }
        Ok(ZstdTransform { level })
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn level_range() -> RangeInclusive<i32> {
        zstd::compression_level_range()
    }
}

impl Default for ZstdTransform {
    fn default() -> Self {
        ZstdTransform {
            level: DEFAULT_LEVEL,
        }
    }
}

impl ChunkTransform for ZstdTransform {
    fn name(&self) -> &str {
        "zstd"
    }

    fn apply(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(data, self.level).map_err(|e| Error::compression("zstd compress", e))
    }
}

/// Decodes a (possibly multi-frame) zstd stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    zstd::stream::decode_all(data).map_err(|e| Error::compression("zstd decompress", e))
}

/// Reverses the bytes of each chunk.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReverseTransform;

impl ChunkTransform for ReverseTransform {
    fn name(&self) -> &str {
        "reverse"
    }

    fn apply(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.iter().rev().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workcore_common::error::ErrorKind;

    #[test]
    fn test_zstd_round_trip() {
        let data = b"the quick brown fox jumps over the lazy dog ".repeat(50);
        let compressed = ZstdTransform::default().apply(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_concatenated_frames_decode_as_one_stream() {
        let transform = ZstdTransform::new(1).unwrap();
        let mut stream = transform.apply(b"hello ").unwrap();
        stream.extend(transform.apply(b"world").unwrap());
        assert_eq!(decompress(&stream).unwrap(), b"hello world");
    }

    #[test]
    fn test_invalid_level() {
        let too_high = ZstdTransform::level_range().end() + 1;
        let err = ZstdTransform::new(too_high).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_corrupt_stream() {
        let err = decompress(b"definitely not zstd").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Compression { .. }));
    }

    #[test]
    fn test_chunk_worker() {
        let worker = chunk_worker(ReverseTransform);
        assert_eq!(worker(Chunk::new(3, b"abc".to_vec())).unwrap(), b"cba");
    }
}
