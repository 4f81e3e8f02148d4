//! Buffered content adapters

mod memory;
mod mmap;

pub use memory::MemoryBuffer;
pub use mmap::MmapBuffer;
