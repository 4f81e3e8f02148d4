//! Signature definition files
//!
//! JSON documents listing formats and the evidence for each. Compiling a
//! definition turns it into one `SignatureSet` per matcher type plus the
//! tables that map matcher indexes back to formats.

use crate::domain::entities::{
    Anchor, ByteSignature, ContainerKind, ContainerSignature, MatcherType, PriorityList, Segment,
    SignatureSet,
};
use crate::domain::services::MatcherError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Cannot read definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid definition JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Format {format}: invalid hex pattern {pattern:?}")]
    Hex { format: String, pattern: String },

    #[error("Format {format}: unknown container kind {kind:?}")]
    UnknownContainer { format: String, kind: String },

    #[error("Definition holds no formats")]
    Empty,

    #[error("No {0} matcher to register signatures with")]
    MissingMatcher(MatcherType),

    #[error(transparent)]
    Matcher(#[from] MatcherError),
}

/// Top level of a definition file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDefinition {
    #[serde(default)]
    pub formats: Vec<FormatDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub archive: bool,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub containers: Vec<ContainerDefinition>,
    #[serde(default)]
    pub bytes: Vec<ByteDefinition>,
    /// Ids of the formats this one is more specific than
    #[serde(default)]
    pub supersedes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    #[serde(default = "default_container_kind")]
    pub kind: String,
    pub entries: Vec<String>,
}

fn default_container_kind() -> String {
    "zip".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteDefinition {
    pub segments: Vec<SegmentDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorDefinition {
    Bof,
    Eof,
    Var,
}

impl From<AnchorDefinition> for Anchor {
    fn from(value: AnchorDefinition) -> Self {
        match value {
            AnchorDefinition::Bof => Anchor::Bof,
            AnchorDefinition::Eof => Anchor::Eof,
            AnchorDefinition::Var => Anchor::Var,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDefinition {
    pub anchor: AnchorDefinition,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub max_offset: Option<u64>,
    /// Hex digits; whitespace is ignored
    pub hex: String,
}

impl SignatureDefinition {
    pub fn from_json(text: &str) -> Result<Self, DefinitionError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, DefinitionError> {
        let text = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let definition = Self::from_json(&text)?;
        debug!("Read {} formats from {}", definition.formats.len(), path.display());
        Ok(definition)
    }

    /// Folds `other` into this definition
    ///
    /// A format whose id is already present replaces the earlier entry.
    pub fn merge(&mut self, other: SignatureDefinition) {
        for format in other.formats {
            match self.formats.iter_mut().find(|f| f.id == format.id) {
                Some(existing) => {
                    debug!("Format {} redefined", format.id);
                    *existing = format;
                }
                None => self.formats.push(format),
            }
        }
    }
}

/// Descriptive fields of a format, as kept by the identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub mime: String,
    pub archive: bool,
}

/// One matcher's worth of compiled signatures
#[derive(Debug)]
pub(crate) struct CompiledSet {
    pub set: SignatureSet,
    pub priorities: PriorityList,
    /// local signature index -> format index
    pub formats: Vec<usize>,
}

/// A definition ready to be handed to the matchers
#[derive(Debug)]
pub(crate) struct Compiled {
    pub formats: Vec<FormatInfo>,
    /// format-level supersession
    pub priorities: PriorityList,
    /// indexed by `MatcherType::tag()`
    pub sets: [CompiledSet; 3],
}

pub(crate) fn compile(definition: &SignatureDefinition) -> Result<Compiled, DefinitionError> {
    if definition.formats.is_empty() {
        return Err(DefinitionError::Empty);
    }
    let by_id: HashMap<&str, usize> = definition
        .formats
        .iter()
        .enumerate()
        .map(|(idx, f)| (f.id.as_str(), idx))
        .collect();

    let mut formats = Vec::with_capacity(definition.formats.len());
    let mut extensions = (Vec::new(), Vec::new());
    let mut containers = (Vec::new(), Vec::new());
    let mut bytes = (Vec::new(), Vec::new());

    for (idx, format) in definition.formats.iter().enumerate() {
        formats.push(FormatInfo {
            id: format.id.clone(),
            name: format.name.clone(),
            version: format.version.clone(),
            mime: format.mime.clone(),
            archive: format.archive,
        });
        if !format.extensions.is_empty() {
            extensions.0.push(format.extensions.clone());
            extensions.1.push(idx);
        }
        for container in &format.containers {
            let kind = match container.kind.to_ascii_lowercase().as_str() {
                "zip" => ContainerKind::Zip,
                _ => {
                    return Err(DefinitionError::UnknownContainer {
                        format: format.id.clone(),
                        kind: container.kind.clone(),
                    });
                }
            };
            containers
                .0
                .push(ContainerSignature::new(kind, container.entries.clone()));
            containers.1.push(idx);
        }
        for byte in &format.bytes {
            bytes.0.push(compile_bytes(&format.id, byte)?);
            bytes.1.push(idx);
        }
    }

    let mut priorities = PriorityList::new();
    for (idx, format) in definition.formats.iter().enumerate() {
        for target in &format.supersedes {
            match by_id.get(target.as_str()) {
                Some(&inferior) => priorities.add(idx, inferior),
                None => warn!("Format {} supersedes unknown format {}", format.id, target),
            }
        }
    }

    let sets = [
        compiled_set(SignatureSet::Extensions(extensions.0), extensions.1, &priorities),
        compiled_set(SignatureSet::Containers(containers.0), containers.1, &priorities),
        compiled_set(SignatureSet::Bytes(bytes.0), bytes.1, &priorities),
    ];
    Ok(Compiled {
        formats,
        priorities,
        sets,
    })
}

fn compile_bytes(format: &str, byte: &ByteDefinition) -> Result<ByteSignature, DefinitionError> {
    let mut segments = Vec::with_capacity(byte.segments.len());
    for seg in &byte.segments {
        let digits: String = seg.hex.chars().filter(|c| !c.is_whitespace()).collect();
        let pattern = hex::decode(&digits).map_err(|_| DefinitionError::Hex {
            format: format.to_string(),
            pattern: seg.hex.clone(),
        })?;
        let mut segment = Segment::new(seg.anchor.into(), seg.offset, pattern);
        if let Some(max) = seg.max_offset {
            segment = segment.with_max_offset(max);
        }
        segments.push(segment);
    }
    Ok(ByteSignature::new(segments))
}

/// Lifts format-level supersession onto the signatures of one matcher
fn compiled_set(set: SignatureSet, formats: Vec<usize>, priorities: &PriorityList) -> CompiledSet {
    let mut local = PriorityList::new();
    for (sup_sig, &sup_fmt) in formats.iter().enumerate() {
        for (inf_sig, &inf_fmt) in formats.iter().enumerate() {
            if priorities.supersedes(sup_fmt, inf_fmt) {
                local.add(sup_sig, inf_sig);
            }
        }
    }
    CompiledSet {
        set,
        priorities: local,
        formats,
    }
}
