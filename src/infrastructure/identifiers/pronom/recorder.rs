//! PRONOM recorder
//!
//! Keeps every claimed hit per phase. The reported answer comes from the
//! strongest phase that produced anything: container, then byte, then
//! extension.

use super::identification::PronomIdentification;
use super::identifier::Pronom;
use crate::domain::entities::{Confidence, Identification, MatchResult, MatcherType};
use crate::domain::services::{Identifier, Recorder};

const EXTENSION_MISMATCH: &str = "extension mismatch";
const EXTENSION_ONLY: &str = "match on extension only";

pub struct PronomRecorder<'a> {
    pronom: &'a Pronom,
    /// (format, basis) per phase, indexed by `MatcherType::tag()`
    hits: [Vec<(usize, String)>; 3],
}

impl<'a> PronomRecorder<'a> {
    pub fn new(pronom: &'a Pronom) -> Self {
        Self {
            pronom,
            hits: Default::default(),
        }
    }

    fn phase(&self, matcher_type: MatcherType) -> &[(usize, String)] {
        &self.hits[matcher_type.tag() as usize]
    }

    /// The phase whose hits decide the answer
    fn deciding_phase(&self) -> Option<MatcherType> {
        [MatcherType::Container, MatcherType::Byte, MatcherType::Extension]
            .into_iter()
            .find(|&mt| !self.phase(mt).is_empty())
    }

    /// Formats of the deciding phase, minus the superseded ones
    fn candidates(&self) -> Vec<usize> {
        let Some(phase) = self.deciding_phase() else {
            return Vec::new();
        };
        let mut formats: Vec<usize> = Vec::new();
        for (format, _) in self.phase(phase) {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }
        self.pronom.priorities.filter(&formats)
    }

    fn identification(&self, format: usize, phase: MatcherType) -> Option<PronomIdentification> {
        let info = self.pronom.formats.get(format)?;
        let extension_hits: Vec<&str> = self
            .phase(MatcherType::Extension)
            .iter()
            .filter(|(f, _)| *f == format)
            .map(|(_, basis)| basis.as_str())
            .collect();

        let mut basis: Vec<String> = Vec::new();
        let mut warning = None;
        let confidence = match phase {
            MatcherType::Extension => {
                warning = Some(EXTENSION_ONLY.to_string());
                Confidence::Tentative
            }
            MatcherType::Container => Confidence::Structural,
            MatcherType::Byte => Confidence::Signature,
        };
        if phase != MatcherType::Extension {
            if !extension_hits.is_empty() {
                basis.extend(extension_hits.iter().map(|b| b.to_string()));
            } else if self.pronom.range(MatcherType::Extension).covers_format(format) {
                warning = Some(EXTENSION_MISMATCH.to_string());
            }
        }
        for (f, b) in self.phase(phase) {
            if *f == format && !basis.contains(b) {
                basis.push(b.clone());
            }
        }

        Some(PronomIdentification {
            namespace: self.pronom.name().to_string(),
            id: info.id.clone(),
            format: info.name.clone(),
            version: info.version.clone(),
            mime: info.mime.clone(),
            basis,
            warning,
            confidence,
        })
    }
}

impl Recorder for PronomRecorder<'_> {
    fn record(&mut self, matcher_type: MatcherType, result: &MatchResult) -> bool {
        let Some(format) = self.pronom.range(matcher_type).format(result.index()) else {
            return false;
        };
        self.hits[matcher_type.tag() as usize].push((format, result.basis().to_string()));
        true
    }

    fn satisfied(&self) -> bool {
        self.pronom.extension_only() || !self.phase(MatcherType::Container).is_empty()
    }

    fn is_archive(&self) -> bool {
        self.candidates()
            .into_iter()
            .any(|f| self.pronom.formats.get(f).is_some_and(|info| info.archive))
    }

    fn report(self: Box<Self>) -> Vec<Box<dyn Identification>> {
        let Some(phase) = self.deciding_phase() else {
            return Vec::new();
        };
        self.candidates()
            .into_iter()
            .filter_map(|format| self.identification(format, phase))
            .map(|id| Box::new(id) as Box<dyn Identification>)
            .collect()
    }
}
