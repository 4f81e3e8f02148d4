//! Priority list entity
//!
//! Records "A supersedes B" relations between signatures. When both A and B
//! match, B is suppressed in favour of the more specific A.

use std::collections::{BTreeMap, BTreeSet};

/// Supersession relations between signature indexes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityList {
    /// superior -> inferiors
    edges: BTreeMap<usize, BTreeSet<usize>>,
}

impl PriorityList {
    /// Creates an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `superior` supersedes `inferior`
    pub fn add(&mut self, superior: usize, inferior: usize) {
        if superior == inferior {
            return;
        }
        self.edges.entry(superior).or_default().insert(inferior);
    }

    /// Returns true if `superior` supersedes `inferior`
    pub fn supersedes(&self, superior: usize, inferior: usize) -> bool {
        self.edges
            .get(&superior)
            .is_some_and(|set| set.contains(&inferior))
    }

    /// Returns true if any index supersedes `index`
    pub fn has_superiors(&self, index: usize) -> bool {
        self.edges.values().any(|set| set.contains(&index))
    }

    /// Iterates over the indexes `superior` supersedes
    pub fn inferiors(&self, superior: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges.get(&superior).into_iter().flatten().copied()
    }

    /// Orders `0..count` so that every superior comes before its inferiors
    ///
    /// Ties keep index order. Indexes caught in a cycle are appended in
    /// index order after everything that could be ordered.
    pub fn scan_order(&self, count: usize) -> Vec<usize> {
        let mut pending = vec![0usize; count];
        for (_, inf) in self.pairs() {
            if inf < count {
                pending[inf] += 1;
            }
        }
        let mut ready: BTreeSet<usize> = (0..count).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(count);
        let mut placed = vec![false; count];
        while let Some(next) = ready.pop_first() {
            order.push(next);
            placed[next] = true;
            for inf in self.inferiors(next) {
                if inf < count && !placed[inf] {
                    pending[inf] -= 1;
                    if pending[inf] == 0 {
                        ready.insert(inf);
                    }
                }
            }
        }
        order.extend((0..count).filter(|&i| !placed[i]));
        order
    }

    /// Drops every index in `hits` that another index in `hits` supersedes
    ///
    /// The relative order of the survivors is kept.
    pub fn filter(&self, hits: &[usize]) -> Vec<usize> {
        hits.iter()
            .copied()
            .filter(|&candidate| {
                !hits
                    .iter()
                    .any(|&other| other != candidate && self.supersedes(other, candidate))
            })
            .collect()
    }

    /// Returns a copy with every index shifted by `by`
    pub fn offset(&self, by: usize) -> Self {
        let edges = self
            .edges
            .iter()
            .map(|(sup, inf)| (sup + by, inf.iter().map(|i| i + by).collect()))
            .collect();
        Self { edges }
    }

    /// Merges another list into this one
    pub fn extend(&mut self, other: &PriorityList) {
        for (sup, infs) in &other.edges {
            for inf in infs {
                self.add(*sup, *inf);
            }
        }
    }

    /// Iterates over `(superior, inferior)` pairs in ascending order
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges
            .iter()
            .flat_map(|(sup, infs)| infs.iter().map(move |inf| (*sup, *inf)))
    }

    /// Returns the number of relations
    pub fn len(&self) -> usize {
        self.edges.values().map(|s| s.len()).sum()
    }

    /// Returns true if there are no relations
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
