//! Matcher implementations
//!
//! One matcher per `MatcherType`. Each keeps its signatures in a single
//! index space: every `add` appends after the signatures already held, so
//! result indexes stay unique per matcher.

mod byte;
mod container;
mod extension;

pub use byte::ByteMatcher;
pub use container::ContainerMatcher;
pub use extension::ExtensionMatcher;

use crate::domain::entities::{MatcherType, PriorityList};
use crate::domain::services::{Matcher, MatcherError};
use crate::persist::{Loader, PersistError, Saver};

/// Rebuilds a matcher from its persisted type tag and state
///
/// An unknown tag is recorded on the cursor and yields `None`.
pub fn load_matcher(tag: u8, loader: &mut Loader) -> Option<Box<dyn Matcher>> {
    if !loader.is_ok() {
        return None;
    }
    match MatcherType::from_tag(tag) {
        Some(MatcherType::Extension) => Some(Box::new(ExtensionMatcher::load(loader))),
        Some(MatcherType::Container) => Some(Box::new(ContainerMatcher::load(loader))),
        Some(MatcherType::Byte) => ByteMatcher::load(loader).map(|m| Box::new(m) as Box<dyn Matcher>),
        None => {
            loader.fail(PersistError::BadMatcherType(tag));
            None
        }
    }
}

/// Creates one empty matcher of every type, in phase order
pub fn default_matchers() -> Vec<Box<dyn Matcher>> {
    vec![
        Box::new(ExtensionMatcher::new()),
        Box::new(ContainerMatcher::new()),
        Box::new(ByteMatcher::new()),
    ]
}

pub(crate) fn save_priorities(saver: &mut Saver, priorities: &PriorityList) {
    let pairs: Vec<usize> = priorities
        .pairs()
        .flat_map(|(sup, inf)| [sup, inf])
        .collect();
    saver.save_usizes(&pairs);
}

pub(crate) fn load_priorities(loader: &mut Loader) -> PriorityList {
    let flat = loader.load_usizes();
    if flat.len() % 2 != 0 {
        loader.fail(PersistError::Invalid("odd priority pair list".into()));
    }
    let mut priorities = PriorityList::new();
    for pair in flat.chunks_exact(2) {
        priorities.add(pair[0], pair[1]);
    }
    priorities
}

/// Rejects priority relations that point outside a set of `len` signatures
pub(crate) fn check_priorities(priorities: &PriorityList, len: usize) -> Result<(), MatcherError> {
    match priorities.pairs().find(|&(sup, inf)| sup >= len || inf >= len) {
        Some((sup, inf)) => Err(MatcherError::InvalidSignature(format!(
            "priority {sup} > {inf} refers outside a set of {len} signatures"
        ))),
        None => Ok(()),
    }
}
