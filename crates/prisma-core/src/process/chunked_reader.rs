//! Chunked memory reading utilities.
//!
//! Large regions are read in fixed-size chunks. Consecutive chunks overlap
//! by a caller-chosen number of bytes so that a pattern straddling a chunk
//! boundary is fully contained in at least one chunk.

use super::ReadMemory;
use crate::error::Result;

/// Default chunk size for pattern scanning (64KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A chunk of memory read from a process.
#[derive(Debug)]
pub struct MemoryChunk {
    /// Starting address of this chunk.
    pub address: u64,
    /// The actual bytes read.
    pub data: Vec<u8>,
}

/// Iterator that reads `[start, end)` in chunks of `chunk_size + overlap`
/// bytes, advancing by `chunk_size` each step.
///
/// # Example
///
/// ```ignore
/// let iter = ChunkedMemoryIterator::new(&reader, start, end, DEFAULT_CHUNK_SIZE, pattern.len());
/// for chunk in iter.flatten() {
///     // Process chunk.data
/// }
/// ```
pub struct ChunkedMemoryIterator<'a, R: ReadMemory + ?Sized> {
    reader: &'a R,
    current: u64,
    end: u64,
    chunk_size: usize,
    overlap: usize,
}

impl<'a, R: ReadMemory + ?Sized> ChunkedMemoryIterator<'a, R> {
    pub fn new(reader: &'a R, start: u64, end: u64, chunk_size: usize, overlap: usize) -> Self {
        Self {
            reader,
            current: start,
            end,
            chunk_size: chunk_size.max(1),
            overlap,
        }
    }
}

impl<R: ReadMemory + ?Sized> Iterator for ChunkedMemoryIterator<'_, R> {
    type Item = Result<MemoryChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }

        let remaining = (self.end - self.current) as usize;
        let read_size = (self.chunk_size + self.overlap).min(remaining);
        let address = self.current;
        self.current += self.chunk_size as u64;

        Some(
            self.reader
                .read_bytes(address, read_size)
                .map(|data| MemoryChunk { address, data }),
        )
    }
}
