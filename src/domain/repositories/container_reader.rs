//! Container reader trait
//!
//! Lists the entry names inside a container file. Traversal of a given
//! container format lives behind this port.

use super::{Buffer, BufferError};
use crate::domain::entities::ContainerKind;

/// Lists the member names of one kind of container
pub trait ContainerReader: Send + Sync {
    /// The container kind this reader understands
    fn kind(&self) -> ContainerKind;

    /// Returns true if the content looks like this kind of container
    fn sniff(&self, buffer: &dyn Buffer) -> bool;

    /// Returns the entry names, in container order
    ///
    /// Only called after `sniff` succeeded. Damaged trailing structure ends
    /// the listing early rather than failing it.
    fn entries(&self, buffer: &dyn Buffer) -> Result<Vec<String>, BufferError>;
}
