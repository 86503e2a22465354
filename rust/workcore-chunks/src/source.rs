//! Chunk sources: fixed-size windows over a reader, a file or a byte slice.
//!
//! Every source yields chunks with contiguous, zero-based indices that cover
//! the whole input. All windows are exactly `chunk_size` bytes except the last,
//! which may be shorter. An empty input yields no chunks.

use std::{fs::File, io::Read, path::Path};

use workcore_common::{Result, error::Error, try_or_ret_some_err, verify_arg};
use workcore_workflow::Chunk;

/// Default window size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Reads a stream as a sequence of fixed-size [`Chunk`]s.
pub struct ChunkReader<R> {
    reader: R,
    chunk_size: usize,
    next_index: usize,
    done: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(reader: R, chunk_size: usize) -> Result<ChunkReader<R>> {
        verify_arg!(chunk_size, chunk_size != 0);
        Ok(ChunkReader {
            reader,
            chunk_size,
            next_index: 0,
            done: false,
        })
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut data = Vec::with_capacity(self.chunk_size);
        let read = self
            .reader
            .by_ref()
            .take(self.chunk_size as u64)
            .read_to_end(&mut data);
        if read.is_err() {
            self.done = true;
        }
        let len = try_or_ret_some_err!(read.map_err(|e| Error::io("read chunk", e)));

        // A short window means the input is exhausted.
        if len < self.chunk_size {
            self.done = true;
        }
        if len == 0 {
            return None;
        }

        let chunk = Chunk::new(self.next_index, data);
        self.next_index += 1;
        Some(Ok(chunk))
    }
}

/// Reads the whole file at `path` into chunks of `chunk_size` bytes.
pub fn read_file_chunks(path: impl AsRef<Path>, chunk_size: usize) -> Result<Vec<Chunk>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(format!("open {}", path.display()), e))?;
    ChunkReader::new(file, chunk_size)?.collect()
}

/// Splits an in-memory buffer into chunks of `chunk_size` bytes.
pub fn split_bytes(data: &[u8], chunk_size: usize) -> Result<Vec<Chunk>> {
    verify_arg!(chunk_size, chunk_size != 0);
    Ok(data
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, window)| Chunk::new(index, window))
        .collect())
}
