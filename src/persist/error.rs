use thiserror::Error;

/// Errors raised while loading or saving signature data
///
/// Cursor errors are sticky: the first one is kept, later reads return zero
/// values, and the error only surfaces through `Loader::finish`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("bad identifier loader: no loader registered for tag {0}")]
    BadIdentifierLoader(u8),

    #[error("identifier tag {tag} is out of range (at most {max} slots)")]
    TagOutOfRange { tag: u8, max: usize },

    #[error("unknown matcher type tag {0}")]
    BadMatcherType(u8),

    #[error("truncated signature data: needed {needed} bytes at offset {offset}, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("not a signature file")]
    BadMagic,

    #[error("signature version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u16, found: u16 },

    #[error("signature checksum mismatch: stored {stored:08x}, computed {computed:08x}")]
    Checksum { stored: u32, computed: u32 },

    #[error("invalid UTF-8 string at offset {0}")]
    InvalidString(usize),

    #[error("value too large to persist: {0}")]
    TooLarge(String),

    #[error("invalid signature data: {0}")]
    Invalid(String),

    #[error("{0} trailing bytes after signature data")]
    TrailingData(usize),
}
