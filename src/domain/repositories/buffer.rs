//! Buffered content trait
//!
//! Random access to one candidate file's bytes. A single buffer is shared
//! read-only by every matcher of every phase for that file.

use std::io;
use thiserror::Error;

/// Errors that can occur when reading buffered content
#[derive(Error, Debug)]
pub enum BufferError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Offset {offset} is out of bounds (size: {size})")]
    OutOfBounds { offset: u64, size: u64 },

    #[error("Buffer unavailable: {0}")]
    Unavailable(String),
}

/// Read-only random access over a file's content
///
/// Implementations must allow scanning from either end without pulling the
/// whole file into memory for every caller.
pub trait Buffer: Send + Sync {
    /// Returns the total size in bytes
    fn size(&self) -> u64;

    /// Returns up to `len` bytes starting at `offset`
    ///
    /// The slice is clipped at the end of the content. An `offset` equal to
    /// the size yields an empty slice; anything beyond is out of bounds.
    fn slice(&self, offset: u64, len: usize) -> Result<&[u8], BufferError>;

    /// Returns up to `len` bytes ending `offset` bytes before the end
    fn eof_slice(&self, offset: u64, len: usize) -> Result<&[u8], BufferError> {
        let size = self.size();
        let end = size
            .checked_sub(offset)
            .ok_or(BufferError::OutOfBounds { offset, size })?;
        let start = end.saturating_sub(len as u64);
        self.slice(start, (end - start) as usize)
    }

    /// Returns the entire content
    fn full(&self) -> Result<&[u8], BufferError> {
        self.slice(0, self.size() as usize)
    }
}
