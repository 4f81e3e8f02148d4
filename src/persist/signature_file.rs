//! Signature file framing
//!
//! ```text
//! "IDFG" | version: u16 | body | crc32(body): u32
//! body = count: u8, { identifier segment (tag byte + state) }*,
//!        count: u8, { matcher type byte + matcher state }*
//! ```
//!
//! Each identifier owns the serialization of its own segment; the registry
//! picks the loader from the segment's leading tag byte.

use super::{IdentifierRegistry, Loader, PersistError, Saver};
use crate::domain::services::{Identifier, Matcher};
use crate::infrastructure::matchers;
use bytes::Bytes;
use tracing::debug;

pub const MAGIC: &[u8; 4] = b"IDFG";
const HEADER_LEN: usize = 6;
const TRAILER_LEN: usize = 4;

/// Decoded contents of a signature file
pub struct SignatureFile {
    pub identifiers: Vec<Box<dyn Identifier>>,
    pub matchers: Vec<Box<dyn Matcher>>,
}

/// Serializes identifiers and matchers into a framed signature file
pub fn encode(
    version: u16,
    identifiers: &[&dyn Identifier],
    matchers: &[&dyn Matcher],
) -> Result<Bytes, PersistError> {
    let mut body = Saver::new();
    save_count(&mut body, identifiers.len(), "identifiers");
    for identifier in identifiers {
        identifier.save(&mut body);
    }
    save_count(&mut body, matchers.len(), "matchers");
    for matcher in matchers {
        body.save_byte(matcher.matcher_type().tag());
        matcher.save(&mut body);
    }
    let body = body.into_bytes()?;

    let mut out = Saver::new();
    out.put_raw(MAGIC);
    out.save_u16(version);
    out.put_raw(&body);
    out.save_u32(crc32fast::hash(&body));
    out.into_bytes()
}

fn save_count(saver: &mut Saver, count: usize, what: &str) {
    match u8::try_from(count) {
        Ok(c) => saver.save_byte(c),
        Err(_) => saver.fail(PersistError::TooLarge(format!("{count} {what}"))),
    }
}

/// Decodes a framed signature file
///
/// A version other than `expected_version` is a hard failure.
pub fn decode(
    data: Bytes,
    registry: &IdentifierRegistry,
    expected_version: u16,
) -> Result<SignatureFile, PersistError> {
    if data.len() < HEADER_LEN + TRAILER_LEN {
        return Err(PersistError::Truncated {
            offset: 0,
            needed: HEADER_LEN + TRAILER_LEN,
            remaining: data.len(),
        });
    }
    if &data[..MAGIC.len()] != MAGIC {
        return Err(PersistError::BadMagic);
    }
    let found = u16::from_le_bytes([data[4], data[5]]);
    if found != expected_version {
        return Err(PersistError::VersionMismatch {
            expected: expected_version,
            found,
        });
    }

    let body = data.slice(HEADER_LEN..data.len() - TRAILER_LEN);
    let trailer = &data[data.len() - TRAILER_LEN..];
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = crc32fast::hash(&body);
    if stored != computed {
        return Err(PersistError::Checksum { stored, computed });
    }

    let mut loader = Loader::new(body);
    let identifier_count = loader.load_byte() as usize;
    let mut identifiers = Vec::with_capacity(identifier_count);
    for _ in 0..identifier_count {
        match registry.load_identifier(&mut loader) {
            Some(identifier) => identifiers.push(identifier),
            None => break,
        }
    }

    let matcher_count = loader.load_byte() as usize;
    let mut loaded = Vec::with_capacity(matcher_count);
    for _ in 0..matcher_count {
        let tag = loader.load_byte();
        match matchers::load_matcher(tag, &mut loader) {
            Some(matcher) => loaded.push(matcher),
            None => break,
        }
    }
    loader.finish_exact()?;

    debug!(
        "Loaded signature file v{}: {} identifiers, {} matchers",
        found,
        identifiers.len(),
        loaded.len()
    );

    Ok(SignatureFile {
        identifiers,
        matchers: loaded,
    })
}
