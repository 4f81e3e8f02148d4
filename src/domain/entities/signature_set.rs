//! Signature set entity
//!
//! The payload handed to a matcher at build time. Each variant belongs to
//! exactly one matcher type; position in the set is the signature's local
//! index.

use super::MatcherType;
use std::fmt;

/// Where a byte segment is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Measured from the beginning of the file
    Bof,
    /// Measured from the end of the file
    Eof,
    /// Anywhere after the previous segment
    Var,
}

impl Anchor {
    pub fn tag(self) -> u8 {
        match self {
            Anchor::Bof => 0,
            Anchor::Eof => 1,
            Anchor::Var => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Anchor::Bof),
            1 => Some(Anchor::Eof),
            2 => Some(Anchor::Var),
            _ => None,
        }
    }
}

/// One contiguous byte pattern inside a byte signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    anchor: Anchor,
    /// Minimum distance from the anchor
    offset: u64,
    /// Maximum distance from the anchor (inclusive)
    max_offset: u64,
    pattern: Vec<u8>,
}

impl Segment {
    /// Creates a segment that must sit exactly at `offset` from its anchor
    pub fn new(anchor: Anchor, offset: u64, pattern: Vec<u8>) -> Self {
        Self {
            anchor,
            offset,
            max_offset: offset,
            pattern,
        }
    }

    /// Widens the window so the pattern may start anywhere up to `max_offset`
    pub fn with_max_offset(mut self, max_offset: u64) -> Self {
        self.max_offset = max_offset.max(self.offset);
        self
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn max_offset(&self) -> u64 {
        self.max_offset
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// Returns the byte range of the file this segment may occupy
    ///
    /// For `Eof` segments the distance is measured from the end of the file
    /// to the end of the pattern. `Var` segments have no fixed window.
    pub fn window(&self, file_size: u64) -> Option<(u64, u64)> {
        let len = self.pattern.len() as u64;
        match self.anchor {
            Anchor::Bof => {
                let start = self.offset;
                let end = self.max_offset.saturating_add(len).min(file_size);
                (start.checked_add(len)? <= end).then_some((start, end))
            }
            Anchor::Eof => {
                let end = file_size.checked_sub(self.offset)?;
                let start = file_size.saturating_sub(self.max_offset.saturating_add(len));
                (start.checked_add(len)? <= end).then_some((start, end))
            }
            Anchor::Var => None,
        }
    }
}

/// An ordered list of segments that must all match
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ByteSignature {
    segments: Vec<Segment>,
}

impl ByteSignature {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if the first segment is anchored to the end of file
    pub fn is_eof_led(&self) -> bool {
        self.segments
            .first()
            .is_some_and(|s| s.anchor() == Anchor::Eof)
    }
}

/// Container formats the container matcher understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Zip,
}

impl ContainerKind {
    pub fn tag(self) -> u8 {
        match self {
            ContainerKind::Zip => 0,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ContainerKind::Zip),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Zip => "zip",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A container signature: all named entries must be present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSignature {
    kind: ContainerKind,
    entries: Vec<String>,
}

impl ContainerSignature {
    pub fn new(kind: ContainerKind, entries: Vec<String>) -> Self {
        Self { kind, entries }
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// A batch of signatures for one matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureSet {
    /// One list of extensions per signature
    Extensions(Vec<Vec<String>>),
    Containers(Vec<ContainerSignature>),
    Bytes(Vec<ByteSignature>),
}

impl SignatureSet {
    /// Returns the matcher type this set belongs to
    pub fn matcher_type(&self) -> MatcherType {
        match self {
            SignatureSet::Extensions(_) => MatcherType::Extension,
            SignatureSet::Containers(_) => MatcherType::Container,
            SignatureSet::Bytes(_) => MatcherType::Byte,
        }
    }

    /// Returns the number of signatures in the set
    pub fn len(&self) -> usize {
        match self {
            SignatureSet::Extensions(v) => v.len(),
            SignatureSet::Containers(v) => v.len(),
            SignatureSet::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
