//! Container traversal adapters

mod zip;

pub use zip::ZipReader;

#[cfg(test)]
pub(crate) use zip::build_stored_zip;
