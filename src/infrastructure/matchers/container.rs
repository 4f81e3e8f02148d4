use super::{check_priorities, load_priorities, save_priorities};
use crate::domain::entities::{
    ContainerKind, ContainerSignature, MatchResult, MatcherType, PriorityList, SignatureSet,
};
use crate::domain::repositories::{Buffer, ContainerReader};
use crate::domain::services::{Matcher, MatcherError, ResultStream};
use crate::infrastructure::containers::ZipReader;
use crate::persist::{Loader, PersistError, Saver};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Clone)]
struct Inner {
    signatures: Vec<ContainerSignature>,
    priorities: PriorityList,
    readers: Vec<Arc<dyn ContainerReader>>,
}

impl Inner {
    fn scan(&self, buffer: &dyn Buffer) -> Result<Vec<MatchResult>, MatcherError> {
        let Some(reader) = self.readers.iter().find(|r| r.sniff(buffer)) else {
            return Ok(Vec::new());
        };
        let kind = reader.kind();
        let entries = reader.entries(buffer)?;
        trace!(kind = %kind, entries = entries.len(), "Listed container entries");
        let present: HashSet<&str> = entries.iter().map(String::as_str).collect();

        let hits: Vec<usize> = self
            .signatures
            .iter()
            .enumerate()
            .filter(|(_, sig)| {
                sig.kind() == kind
                    && !sig.entries().is_empty()
                    && sig.entries().iter().all(|e| present.contains(e.as_str()))
            })
            .map(|(idx, _)| idx)
            .collect();

        Ok(self
            .priorities
            .filter(&hits)
            .into_iter()
            .map(|idx| {
                let sig = &self.signatures[idx];
                MatchResult::new(
                    idx,
                    format!("container {} entries {}", sig.kind(), sig.entries().join(", ")),
                )
            })
            .collect())
    }
}

/// Matches on the entry names inside container formats
///
/// Listing happens on the rayon pool; only the sniff is done up front so
/// an unreadable buffer is reported as a setup error.
#[derive(Clone)]
pub struct ContainerMatcher {
    inner: Arc<Inner>,
}

impl Default for ContainerMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContainerMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerMatcher")
            .field("signatures", &self.inner.signatures.len())
            .field("priorities", &self.inner.priorities.len())
            .field("readers", &self.inner.readers.len())
            .finish()
    }
}

impl ContainerMatcher {
    pub fn new() -> Self {
        Self::with_readers(vec![Arc::new(ZipReader::new())])
    }

    /// Creates a matcher that traverses containers with `readers`
    pub fn with_readers(readers: Vec<Arc<dyn ContainerReader>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                signatures: Vec::new(),
                priorities: PriorityList::new(),
                readers,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.signatures.is_empty()
    }

    pub(crate) fn load(loader: &mut Loader) -> Self {
        let count = loader.load_count();
        let mut signatures = Vec::with_capacity(count);
        for _ in 0..count {
            if !loader.is_ok() {
                break;
            }
            let tag = loader.load_byte();
            let entries = loader.load_strings();
            match ContainerKind::from_tag(tag) {
                Some(kind) => signatures.push(ContainerSignature::new(kind, entries)),
                None => loader.fail(PersistError::Invalid(format!("unknown container kind {tag}"))),
            }
        }
        let priorities = load_priorities(loader);

        let mut matcher = Self::new();
        let inner = Arc::make_mut(&mut matcher.inner);
        inner.signatures = signatures;
        inner.priorities = priorities;
        matcher
    }
}

impl Matcher for ContainerMatcher {
    fn matcher_type(&self) -> MatcherType {
        MatcherType::Container
    }

    fn identify(&self, name: &str, buffer: Arc<dyn Buffer>) -> Result<ResultStream, MatcherError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        if self.inner.signatures.is_empty() {
            return Ok(rx);
        }
        // Touch the head now so an unreadable buffer fails setup.
        buffer.slice(0, 4)?;

        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        rayon::spawn(move || match inner.scan(buffer.as_ref()) {
            Ok(results) => {
                for result in results {
                    if tx.send(result).is_err() {
                        break;
                    }
                }
            }
            Err(err) => debug!(file = %name, error = %err, "Container scan aborted"),
        });
        Ok(rx)
    }

    fn add(&mut self, set: SignatureSet, priorities: &PriorityList) -> Result<usize, MatcherError> {
        let SignatureSet::Containers(signatures) = set else {
            return Err(MatcherError::WrongSet {
                expected: MatcherType::Container,
                found: set.matcher_type(),
            });
        };
        check_priorities(priorities, signatures.len())?;
        if let Some(empty) = signatures.iter().position(|s| s.entries().is_empty()) {
            return Err(MatcherError::InvalidSignature(format!(
                "container signature {empty} names no entries"
            )));
        }

        let inner = Arc::make_mut(&mut self.inner);
        let base = inner.signatures.len();
        inner.signatures.extend(signatures);
        inner.priorities.extend(&priorities.offset(base));
        Ok(inner.signatures.len())
    }

    fn save(&self, saver: &mut Saver) {
        saver.save_count(self.inner.signatures.len());
        for sig in &self.inner.signatures {
            saver.save_byte(sig.kind().tag());
            saver.save_strings(sig.entries());
        }
        save_priorities(saver, &self.inner.priorities);
    }

    fn describe(&self) -> String {
        format!(
            "container matcher: {} signatures, {} priorities",
            self.inner.signatures.len(),
            self.inner.priorities.len()
        )
    }
}
