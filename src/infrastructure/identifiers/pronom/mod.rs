//! PRONOM identifier
//!
//! Recognises formats from a PRONOM-style registry described by JSON
//! signature definitions.

mod definition;
mod identification;
mod identifier;
mod recorder;

pub use definition::{
    AnchorDefinition, ByteDefinition, ContainerDefinition, DefinitionError, FormatDefinition,
    FormatInfo, SegmentDefinition, SignatureDefinition,
};
pub use identification::PronomIdentification;
pub use identifier::Pronom;
pub use recorder::PronomRecorder;

use crate::domain::services::Identifier;
use crate::persist::Loader;

/// Persistence tag of the PRONOM identifier
pub const TAG: u8 = 0;

/// Rebuilds a PRONOM identifier; the tag byte has already been read
pub fn load(loader: &mut Loader) -> Option<Box<dyn Identifier>> {
    let pronom = Pronom::load(loader);
    loader.is_ok().then(|| Box::new(pronom) as Box<dyn Identifier>)
}
