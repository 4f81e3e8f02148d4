//! Byte signature matcher
//!
//! Signatures are tried in priority scan order, superiors first, so a hit
//! can be sent the moment it is found: anything able to suppress it has
//! already been decided. Anchored segments are located with `memchr`
//! inside their window. Floating (`Var`) segments are located once per file
//! with a single Aho-Corasick pass over the content.

use super::{check_priorities, load_priorities, save_priorities};
use crate::domain::entities::{
    Anchor, ByteSignature, MatchResult, MatcherType, PriorityList, Segment, SignatureSet,
};
use crate::domain::repositories::{Buffer, BufferError};
use crate::domain::services::{Matcher, MatcherError, ResultStream};
use crate::persist::{Loader, PersistError, Saver};
use aho_corasick::{AhoCorasick, MatchKind};
use memchr::memmem;
use std::sync::Arc;
use tracing::{debug, trace};

/// (signature, segment) for every floating pattern, by automaton pattern id
type VarIndex = Vec<(usize, usize)>;

#[derive(Clone, Default)]
struct Inner {
    signatures: Vec<ByteSignature>,
    priorities: PriorityList,
    order: Vec<usize>,
    automaton: Option<AhoCorasick>,
    var_index: VarIndex,
}

impl Inner {
    fn rebuild(&mut self) -> Result<(), MatcherError> {
        self.order = self.priorities.scan_order(self.signatures.len());
        let mut patterns = Vec::new();
        let mut var_index = Vec::new();
        for (sig_idx, sig) in self.signatures.iter().enumerate() {
            for (seg_idx, seg) in sig.segments().iter().enumerate() {
                if seg.anchor() == Anchor::Var {
                    patterns.push(seg.pattern().to_vec());
                    var_index.push((sig_idx, seg_idx));
                }
            }
        }
        self.automaton = if patterns.is_empty() {
            None
        } else {
            let automaton = AhoCorasick::builder()
                .match_kind(MatchKind::Standard)
                .build(&patterns)
                .map_err(|e| MatcherError::InvalidSignature(e.to_string()))?;
            Some(automaton)
        };
        self.var_index = var_index;
        Ok(())
    }

    /// Start offsets of every floating segment, ascending, per signature
    fn var_positions(&self, content: &[u8]) -> Vec<Vec<Vec<u64>>> {
        let mut positions: Vec<Vec<Vec<u64>>> = self
            .signatures
            .iter()
            .map(|s| vec![Vec::new(); s.segments().len()])
            .collect();
        if let Some(automaton) = &self.automaton {
            for m in automaton.find_overlapping_iter(content) {
                let (sig, seg) = self.var_index[m.pattern().as_usize()];
                positions[sig][seg].push(m.start() as u64);
            }
        }
        positions
    }

    fn scan(&self, buffer: &dyn Buffer, mut emit: impl FnMut(MatchResult) -> bool) -> Result<(), BufferError> {
        let size = buffer.size();
        let positions = match self.automaton {
            Some(_) => self.var_positions(buffer.full()?),
            None => Vec::new(),
        };

        let mut matched = Vec::new();
        for &idx in &self.order {
            let sig = &self.signatures[idx];
            let Some(first) = match_signature(sig, buffer, positions.get(idx))? else {
                continue;
            };
            if matched.iter().any(|&sup| self.priorities.supersedes(sup, idx)) {
                trace!(signature = idx, "Byte hit superseded");
                matched.push(idx);
                continue;
            }
            matched.push(idx);

            let basis = if sig.is_eof_led() {
                let len = sig.segments()[0].pattern().len() as u64;
                format!("byte signature {idx} at offset {} (EOF)", size - (first + len))
            } else {
                format!("byte signature {idx} at offset {first}")
            };
            if !emit(MatchResult::new(idx, basis)) {
                break;
            }
        }
        Ok(())
    }
}

/// Returns the start of the first segment if every segment matches in order
fn match_signature(
    sig: &ByteSignature,
    buffer: &dyn Buffer,
    var_positions: Option<&Vec<Vec<u64>>>,
) -> Result<Option<u64>, BufferError> {
    let size = buffer.size();
    let mut cursor = 0u64;
    let mut first = None;
    for (seg_idx, seg) in sig.segments().iter().enumerate() {
        let len = seg.pattern().len() as u64;
        let found = match seg.anchor() {
            Anchor::Bof | Anchor::Eof => find_anchored(seg, buffer, cursor)?,
            Anchor::Var => var_positions
                .and_then(|p| p.get(seg_idx))
                .and_then(|starts| find_var(seg, starts, cursor, size)),
        };
        let Some(pos) = found else {
            return Ok(None);
        };
        first.get_or_insert(pos);
        cursor = pos + len;
    }
    Ok(first)
}

fn find_anchored(seg: &Segment, buffer: &dyn Buffer, cursor: u64) -> Result<Option<u64>, BufferError> {
    let Some((start, end)) = seg.window(buffer.size()) else {
        return Ok(None);
    };
    let start = start.max(cursor);
    if start.saturating_add(seg.pattern().len() as u64) > end {
        return Ok(None);
    }
    let window = buffer.slice(start, (end - start) as usize)?;
    let hit = match seg.anchor() {
        // Prefer the occurrence nearest the end it is anchored to.
        Anchor::Eof => memmem::rfind(window, seg.pattern()),
        _ => memmem::find(window, seg.pattern()),
    };
    Ok(hit.map(|at| start + at as u64))
}

/// A floating segment sits at least `offset` bytes after the cursor, and at
/// most `max_offset` bytes when a range was given.
fn find_var(seg: &Segment, starts: &[u64], cursor: u64, size: u64) -> Option<u64> {
    let min = cursor.saturating_add(seg.offset());
    let max = (seg.max_offset() > seg.offset()).then(|| cursor.saturating_add(seg.max_offset()));
    let from = starts.partition_point(|&s| s < min);
    starts[from..]
        .iter()
        .copied()
        .take_while(|&s| max.is_none_or(|max| s <= max))
        .find(|&s| s.saturating_add(seg.pattern().len() as u64) <= size)
}

fn validate(signatures: &[ByteSignature]) -> Result<(), MatcherError> {
    for (idx, sig) in signatures.iter().enumerate() {
        if sig.segments().is_empty() {
            return Err(MatcherError::InvalidSignature(format!(
                "byte signature {idx} has no segments"
            )));
        }
        if sig.segments().iter().any(|s| s.pattern().is_empty()) {
            return Err(MatcherError::InvalidSignature(format!(
                "byte signature {idx} has an empty pattern"
            )));
        }
    }
    Ok(())
}

/// Matches byte patterns anchored to either end of the file or floating
#[derive(Clone, Default)]
pub struct ByteMatcher {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ByteMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteMatcher")
            .field("signatures", &self.inner.signatures.len())
            .field("floating_patterns", &self.inner.var_index.len())
            .finish()
    }
}

impl ByteMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.signatures.is_empty()
    }

    /// Runs the scan on the calling thread
    pub fn scan_now(&self, buffer: &dyn Buffer) -> Result<Vec<MatchResult>, MatcherError> {
        let mut out = Vec::new();
        self.inner.scan(buffer, |r| {
            out.push(r);
            true
        })?;
        Ok(out)
    }

    pub(crate) fn load(loader: &mut Loader) -> Option<Self> {
        let count = loader.load_count();
        let mut signatures = Vec::with_capacity(count);
        for _ in 0..count {
            if !loader.is_ok() {
                break;
            }
            let seg_count = loader.load_count();
            let mut segments = Vec::with_capacity(seg_count);
            for _ in 0..seg_count {
                let tag = loader.load_byte();
                let offset = loader.load_u64();
                let max_offset = loader.load_u64();
                let pattern = loader.load_bytes();
                if !loader.is_ok() {
                    break;
                }
                let Some(anchor) = Anchor::from_tag(tag) else {
                    loader.fail(PersistError::Invalid(format!("unknown segment anchor {tag}")));
                    break;
                };
                segments.push(Segment::new(anchor, offset, pattern).with_max_offset(max_offset));
            }
            signatures.push(ByteSignature::new(segments));
        }
        let priorities = load_priorities(loader);
        if !loader.is_ok() {
            return None;
        }

        let mut inner = Inner {
            signatures,
            priorities,
            ..Inner::default()
        };
        let rebuilt = validate(&inner.signatures).and_then(|_| inner.rebuild());
        match rebuilt {
            Ok(()) => Some(Self {
                inner: Arc::new(inner),
            }),
            Err(err) => {
                loader.fail(PersistError::Invalid(err.to_string()));
                None
            }
        }
    }
}

impl Matcher for ByteMatcher {
    fn matcher_type(&self) -> MatcherType {
        MatcherType::Byte
    }

    fn identify(&self, name: &str, buffer: Arc<dyn Buffer>) -> Result<ResultStream, MatcherError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        if self.inner.signatures.is_empty() {
            return Ok(rx);
        }
        buffer.slice(0, 8)?;

        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        rayon::spawn(move || {
            // A failed send means the caller stopped listening.
            let scanned = inner.scan(buffer.as_ref(), |r| tx.send(r).is_ok());
            if let Err(err) = scanned {
                debug!(file = %name, error = %err, "Byte scan aborted");
            }
        });
        Ok(rx)
    }

    fn add(&mut self, set: SignatureSet, priorities: &PriorityList) -> Result<usize, MatcherError> {
        let SignatureSet::Bytes(signatures) = set else {
            return Err(MatcherError::WrongSet {
                expected: MatcherType::Byte,
                found: set.matcher_type(),
            });
        };
        check_priorities(priorities, signatures.len())?;
        validate(&signatures)?;

        let mut inner = (*self.inner).clone();
        let base = inner.signatures.len();
        inner.signatures.extend(signatures);
        inner.priorities.extend(&priorities.offset(base));
        inner.rebuild()?;
        let total = inner.signatures.len();
        self.inner = Arc::new(inner);
        Ok(total)
    }

    fn save(&self, saver: &mut Saver) {
        saver.save_count(self.inner.signatures.len());
        for sig in &self.inner.signatures {
            saver.save_count(sig.segments().len());
            for seg in sig.segments() {
                saver.save_byte(seg.anchor().tag());
                saver.save_u64(seg.offset());
                saver.save_u64(seg.max_offset());
                saver.save_bytes(seg.pattern());
            }
        }
        save_priorities(saver, &self.inner.priorities);
    }

    fn describe(&self) -> String {
        format!(
            "byte matcher: {} signatures, {} floating patterns, {} priorities",
            self.inner.signatures.len(),
            self.inner.var_index.len(),
            self.inner.priorities.len()
        )
    }
}
