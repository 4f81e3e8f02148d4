//! Result file entity
//!
//! One scanned item as read back from a previously written result set.

/// A file entry from a result set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFile {
    /// Path as recorded by the run that produced the set
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Modification timestamp, as recorded (opaque text)
    pub modified: String,
    /// Content hash, hex encoded; empty when the run did not hash
    pub hash: String,
    /// Identity strings of every identification for this file
    pub ids: Vec<String>,
}

impl ResultFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_modified(mut self, modified: impl Into<String>) -> Self {
        self.modified = modified.into();
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the last path component, accepting both separators
    ///
    /// Result sets written on another platform keep their native separator.
    pub fn base_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }
}
