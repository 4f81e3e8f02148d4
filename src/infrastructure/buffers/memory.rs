use crate::domain::repositories::{Buffer, BufferError};
use bytes::Bytes;

/// Buffer over bytes already in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    data: Bytes,
}

impl MemoryBuffer {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

impl Buffer for MemoryBuffer {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn slice(&self, offset: u64, len: usize) -> Result<&[u8], BufferError> {
        let size = self.size();
        if offset > size {
            return Err(BufferError::OutOfBounds { offset, size });
        }
        let start = offset as usize;
        let end = start.saturating_add(len).min(self.data.len());
        Ok(&self.data[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_slice_clips_at_the_start() {
        let buffer = MemoryBuffer::new(&b"abcdef"[..]);
        assert_eq!(buffer.eof_slice(1, 3).unwrap(), b"cde");
        assert_eq!(buffer.eof_slice(0, 100).unwrap(), b"abcdef");
        assert!(buffer.eof_slice(7, 1).is_err());
    }
}
