use crate::domain::repositories::{Buffer, BufferError};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// File-backed buffer over a read-only memory map
///
/// Pages are only faulted in when a matcher touches them, so a scan that
/// looks at both ends of a large file never reads the middle.
pub struct MmapBuffer {
    /// `None` for empty files, which cannot be mapped
    mmap: Option<Mmap>,
}

impl MmapBuffer {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BufferError> {
        let file = File::open(path.as_ref())?;
        let size = file.metadata()?.len();

        if size == 0 {
            return Ok(Self { mmap: None });
        }

        // The map is read-only; concurrent truncation of the file by another
        // process is the caller's problem, as with any mmap reader.
        let mmap = unsafe { Mmap::map(&file) }?;

        #[cfg(target_os = "linux")]
        {
            let _ = mmap.advise(memmap2::Advice::WillNeed);
        }

        Ok(Self { mmap: Some(mmap) })
    }

    fn data(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

impl Buffer for MmapBuffer {
    fn size(&self) -> u64 {
        self.data().len() as u64
    }

    fn slice(&self, offset: u64, len: usize) -> Result<&[u8], BufferError> {
        let data = self.data();
        let size = data.len() as u64;
        if offset > size {
            return Err(BufferError::OutOfBounds { offset, size });
        }
        let start = offset as usize;
        let end = start.saturating_add(len).min(data.len());
        Ok(&data[start..end])
    }
}
