//! Identification engine
//!
//! Runs a file through the matcher phases in cost order, routes every raw
//! result to the identifiers' recorders and collects their answers.
//!
//! Per file:
//! 1. start every matcher of the phase; each returns a result stream
//! 2. fan the streams in, offering each result to the recorders in
//!    identifier order until one claims it
//! 3. once every stream is drained, stop early if all recorders are
//!    satisfied
//! 4. ask every recorder for its report, exactly once
//!
//! A matcher that fails to start is logged, noted in the report as
//! degraded, and skipped; the rest of the run carries on.

use crate::application::dto::{EngineConfig, FileReport, MatcherFailure};
use crate::domain::entities::{Identification, MatchResult, MatcherType};
use crate::domain::repositories::Buffer;
use crate::domain::services::{Identifier, Matcher, Recorder, ResultStream};
use crate::infrastructure::identifiers::pronom::{DefinitionError, Pronom, SignatureDefinition};
use crate::infrastructure::matchers::default_matchers;
use crate::persist::{IdentifierRegistry, PersistError, signature_file};
use anyhow::{Context, Result};
use bytes::Bytes;
use crossbeam_channel::Select;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Identification engine: matchers plus the identifiers built on them
pub struct Engine {
    matchers: Vec<Box<dyn Matcher>>,
    identifiers: Vec<Box<dyn Identifier>>,
    version: u16,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Loads a compiled signature file
    pub fn load(data: Bytes, registry: &IdentifierRegistry, version: u16) -> Result<Self, PersistError> {
        let file = signature_file::decode(data, registry, version)?;
        Ok(Self {
            matchers: file.matchers,
            identifiers: file.identifiers,
            version,
        })
    }

    /// Loads the signature file named by `config`
    pub fn open(config: &EngineConfig, registry: &IdentifierRegistry) -> Result<Self> {
        Self::load_path(&config.signature_path(), registry, config.version)
    }

    pub fn load_path(path: &Path, registry: &IdentifierRegistry, version: u16) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read signature file {}", path.display()))?;
        let engine = Self::load(Bytes::from(data), registry, version)
            .with_context(|| format!("Failed to load signature file {}", path.display()))?;
        info!(
            "Loaded {} ({} identifiers, {} matchers)",
            path.display(),
            engine.identifiers.len(),
            engine.matchers.len()
        );
        Ok(engine)
    }

    /// Serializes the engine into a signature file
    pub fn save(&self) -> Result<Bytes, PersistError> {
        let identifiers: Vec<&dyn Identifier> = self.identifiers.iter().map(|i| i.as_ref()).collect();
        let matchers: Vec<&dyn Matcher> = self.matchers.iter().map(|m| m.as_ref()).collect();
        signature_file::encode(self.version, &identifiers, &matchers)
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &dyn Identifier> {
        self.identifiers.iter().map(|i| i.as_ref())
    }

    /// One line per identifier and per matcher
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![format!("signature version {}", self.version)];
        for identifier in &self.identifiers {
            let [name, details] = identifier.describe();
            lines.push(format!("identifier {name}: {details}"));
        }
        lines.extend(self.matchers.iter().map(|m| m.describe()));
        lines
    }

    /// Identifies one file
    pub fn identify(&self, name: &str, buffer: Arc<dyn Buffer>) -> FileReport {
        let mut recorders: Vec<Box<dyn Recorder + '_>> =
            self.identifiers.iter().map(|i| i.recorder()).collect();
        let mut degraded = Vec::new();

        for phase in MatcherType::PHASES {
            let streams = self.start_phase(phase, name, &buffer, &mut degraded);
            drain(phase, streams, &mut recorders);

            if recorders.iter().all(|r| r.satisfied()) {
                if phase != MatcherType::Byte {
                    debug!(file = name, phase = %phase, "Recorders satisfied, skipping later phases");
                }
                break;
            }
        }

        let archive = recorders.iter().any(|r| r.is_archive());
        let mut identifications: Vec<Box<dyn Identification>> =
            recorders.into_iter().flat_map(|r| r.report()).collect();
        identifications.sort_by(|a, b| b.confidence().cmp(&a.confidence()));

        FileReport {
            name: name.to_string(),
            identifications,
            degraded,
            archive,
        }
    }

    fn start_phase(
        &self,
        phase: MatcherType,
        name: &str,
        buffer: &Arc<dyn Buffer>,
        degraded: &mut Vec<MatcherFailure>,
    ) -> Vec<ResultStream> {
        let mut streams = Vec::new();
        for matcher in self.matchers.iter().filter(|m| m.matcher_type() == phase) {
            match matcher.identify(name, Arc::clone(buffer)) {
                Ok(stream) => streams.push(stream),
                Err(err) => {
                    warn!(file = name, phase = %phase, matcher = %matcher.describe(), "Matcher failed to start: {err}");
                    degraded.push(MatcherFailure {
                        matcher_type: phase,
                        message: err.to_string(),
                    });
                }
            }
        }
        streams
    }
}

/// Reads every stream to completion, routing results as they arrive
fn drain(phase: MatcherType, mut live: Vec<ResultStream>, recorders: &mut [Box<dyn Recorder + '_>]) {
    while !live.is_empty() {
        let (idx, received) = {
            let mut select = Select::new();
            for rx in &live {
                select.recv(rx);
            }
            let op = select.select();
            let idx = op.index();
            (idx, op.recv(&live[idx]))
        };
        match received {
            Ok(result) => route(phase, &result, recorders),
            // Every sender is gone: that stream is complete.
            Err(_) => {
                live.swap_remove(idx);
            }
        }
    }
}

/// Offers a result to each recorder in turn; the first to claim it wins
fn route(phase: MatcherType, result: &MatchResult, recorders: &mut [Box<dyn Recorder + '_>]) {
    let claimed = recorders.iter_mut().any(|r| r.record(phase, result));
    if !claimed {
        trace!(phase = %phase, index = result.index(), "Unclaimed result");
    }
}

/// Builds an engine from signature definitions
pub struct EngineBuilder {
    matchers: Vec<Box<dyn Matcher>>,
    identifiers: Vec<Box<dyn Identifier>>,
    version: u16,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// Starts with one empty matcher of each type
    pub fn new() -> Self {
        Self {
            matchers: default_matchers(),
            identifiers: Vec::new(),
            version: 1,
        }
    }

    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    /// Replaces the matchers
    pub fn with_matchers(mut self, matchers: Vec<Box<dyn Matcher>>) -> Self {
        self.matchers = matchers;
        self
    }

    pub fn with_identifier(mut self, identifier: Box<dyn Identifier>) -> Self {
        self.identifiers.push(identifier);
        self
    }

    /// Compiles `definition` into a new PRONOM identifier
    pub fn add_definition(
        &mut self,
        name: &str,
        definition: &SignatureDefinition,
        extension_only: bool,
    ) -> Result<&mut Self, DefinitionError> {
        let pronom = Pronom::build(name, definition, extension_only, &mut self.matchers)?;
        self.identifiers.push(Box::new(pronom));
        Ok(self)
    }

    /// Reads and merges the definitions named by `config`
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut merged = SignatureDefinition::default();
        for path in config.definition_paths() {
            let definition = SignatureDefinition::from_path(&path)
                .with_context(|| format!("Failed to read definition {}", path.display()))?;
            merged.merge(definition);
        }
        let mut builder = Self::new().with_version(config.version);
        builder
            .add_definition(&config.name, &merged, config.extension_only)
            .with_context(|| format!("Failed to build identifier {}", config.name))?;
        Ok(builder)
    }

    pub fn build(self) -> Engine {
        Engine {
            matchers: self.matchers,
            identifiers: self.identifiers,
            version: self.version,
        }
    }
}
