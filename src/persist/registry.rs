//! Identifier loader registry
//!
//! Maps the one-byte tag at the head of each identifier segment to the
//! function that rebuilds that identifier. Build the registry once at
//! startup, before any load: `register` needs `&mut self` and loading only
//! borrows, so a registry cannot change while a load holds it. There is no
//! support for registering concurrently from several threads.

use super::{Loader, PersistError};
use crate::domain::services::Identifier;
use crate::infrastructure::identifiers::pronom;
use std::fmt;

/// Number of identifier slots
pub const MAX_IDENTIFIERS: usize = 8;

/// Rebuilds an identifier from the cursor positioned after its tag byte
pub type IdentifierLoader = fn(&mut Loader) -> Option<Box<dyn Identifier>>;

#[derive(Clone, Copy, Default)]
pub struct IdentifierRegistry {
    loaders: [Option<IdentifierLoader>; MAX_IDENTIFIERS],
}

impl IdentifierRegistry {
    /// Creates a registry with no loaders
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in identifier registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.loaders[pronom::TAG as usize] = Some(pronom::load);
        registry
    }

    /// Registers `loader` for `tag`, replacing any previous loader
    pub fn register(&mut self, tag: u8, loader: IdentifierLoader) -> Result<(), PersistError> {
        let slot = self
            .loaders
            .get_mut(tag as usize)
            .ok_or(PersistError::TagOutOfRange {
                tag,
                max: MAX_IDENTIFIERS,
            })?;
        *slot = Some(loader);
        Ok(())
    }

    pub fn is_registered(&self, tag: u8) -> bool {
        self.loaders.get(tag as usize).is_some_and(Option::is_some)
    }

    /// Reads a tag byte and hands the cursor to the matching loader
    ///
    /// An unknown tag records `BadIdentifierLoader` on the cursor and yields
    /// `None`; nothing is raised until the caller inspects the cursor.
    pub fn load_identifier(&self, loader: &mut Loader) -> Option<Box<dyn Identifier>> {
        let tag = loader.load_byte();
        if !loader.is_ok() {
            return None;
        }
        match self.loaders.get(tag as usize).copied().flatten() {
            Some(load) => load(loader),
            None => {
                loader.fail(PersistError::BadIdentifierLoader(tag));
                None
            }
        }
    }
}

impl fmt::Debug for IdentifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<usize> = self
            .loaders
            .iter()
            .enumerate()
            .filter_map(|(tag, l)| l.map(|_| tag))
            .collect();
        f.debug_struct("IdentifierRegistry")
            .field("registered", &tags)
            .finish()
    }
}
