use super::{check_priorities, load_priorities, save_priorities};
use crate::domain::entities::{MatchResult, MatcherType, PriorityList, SignatureSet};
use crate::domain::repositories::Buffer;
use crate::domain::services::{Matcher, MatcherError, ResultStream};
use crate::persist::{Loader, Saver};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Matches the final extension of a file name, case-insensitively
#[derive(Debug, Clone, Default)]
pub struct ExtensionMatcher {
    /// lowercased extension -> signature indexes
    extensions: BTreeMap<String, Vec<usize>>,
    total: usize,
    priorities: PriorityList,
}

impl ExtensionMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of signatures held
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Returns the filtered signature hits for `name`
    pub fn hits(&self, name: &str) -> Vec<(usize, String)> {
        let Some(ext) = extension_of(name) else {
            return Vec::new();
        };
        let Some(indexes) = self.extensions.get(&ext) else {
            return Vec::new();
        };
        self.priorities
            .filter(indexes)
            .into_iter()
            .map(|idx| (idx, ext.clone()))
            .collect()
    }

    pub(crate) fn load(loader: &mut Loader) -> Self {
        let total = loader.load_usize();
        let count = loader.load_count();
        let mut extensions = BTreeMap::new();
        for _ in 0..count {
            if !loader.is_ok() {
                break;
            }
            let ext = loader.load_string();
            let indexes = loader.load_usizes();
            extensions.insert(ext, indexes);
        }
        let priorities = load_priorities(loader);
        Self {
            extensions,
            total,
            priorities,
        }
    }
}

fn extension_of(name: &str) -> Option<String> {
    // Accept Windows separators regardless of the host platform.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    Path::new(base)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_lowercase)
}

impl Matcher for ExtensionMatcher {
    fn matcher_type(&self) -> MatcherType {
        MatcherType::Extension
    }

    fn identify(&self, name: &str, _buffer: Arc<dyn Buffer>) -> Result<ResultStream, MatcherError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        for (idx, ext) in self.hits(name) {
            // The receiver is still in scope, so this cannot fail.
            let _ = tx.send(MatchResult::new(idx, format!("extension match {ext}")));
        }
        Ok(rx)
    }

    fn add(&mut self, set: SignatureSet, priorities: &PriorityList) -> Result<usize, MatcherError> {
        let SignatureSet::Extensions(signatures) = set else {
            return Err(MatcherError::WrongSet {
                expected: MatcherType::Extension,
                found: set.matcher_type(),
            });
        };
        check_priorities(priorities, signatures.len())?;

        let base = self.total;
        for (local, exts) in signatures.iter().enumerate() {
            for ext in exts {
                let ext = ext.trim_start_matches('.').to_lowercase();
                if ext.is_empty() {
                    continue;
                }
                let slot = self.extensions.entry(ext).or_default();
                if !slot.contains(&(base + local)) {
                    slot.push(base + local);
                }
            }
        }
        self.priorities.extend(&priorities.offset(base));
        self.total += signatures.len();
        Ok(self.total)
    }

    fn save(&self, saver: &mut Saver) {
        saver.save_usize(self.total);
        saver.save_count(self.extensions.len());
        for (ext, indexes) in &self.extensions {
            saver.save_string(ext);
            saver.save_usizes(indexes);
        }
        save_priorities(saver, &self.priorities);
    }

    fn describe(&self) -> String {
        format!(
            "extension matcher: {} signatures, {} extensions",
            self.total,
            self.extensions.len()
        )
    }
}
