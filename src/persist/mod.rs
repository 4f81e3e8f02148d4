//! Signature persistence
//!
//! Sticky-error binary cursors, the identifier loader registry, and the
//! framing of a combined signature file.

mod cursor;
mod error;
mod registry;
pub mod signature_file;

pub use cursor::{Loader, Saver};
pub use error::PersistError;
pub use registry::{IdentifierLoader, IdentifierRegistry, MAX_IDENTIFIERS};
pub use signature_file::SignatureFile;
