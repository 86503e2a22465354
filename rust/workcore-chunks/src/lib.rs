//! Chunked byte processing on top of the fork-join pipeline.
//!
//! - [`source`] - splitting readers, files and buffers into indexed chunks
//! - [`transform`] - per-chunk transforms (zstd compression, byte reversal)
//! - [`sink`] - writing ordered outputs to files
//! - [`compress`] - parallel file compression and decompression

pub mod compress;
pub mod sink;
pub mod source;
pub mod transform;

pub use compress::{
    CompressOptions, CompressionSummary, compress_bytes, compress_file, decompress_file,
};
pub use source::{ChunkReader, read_file_chunks, split_bytes};
pub use transform::{ChunkTransform, ReverseTransform, ZstdTransform, chunk_worker, decompress};
