//! Repository traits (interfaces)
//!
//! These traits define the contracts for external collaborators: buffered
//! file content, container traversal and result-set readers.

mod buffer;
mod container_reader;
mod result_reader;

pub use buffer::{Buffer, BufferError};
pub use container_reader::ContainerReader;
pub use result_reader::{ResultReader, ResultSetError};
