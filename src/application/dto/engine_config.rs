//! Engine configuration DTO

use std::path::PathBuf;

/// Where signature data lives and how an engine is built from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory holding signature files and definitions
    pub home: PathBuf,
    /// Compiled signature file name, relative to `home`
    pub signature: String,
    /// Signature file version this build reads and writes
    pub version: u16,
    /// Name given to the identifier
    pub name: String,
    /// Base definition file, relative to `home`
    pub definition: String,
    /// Extra definition files folded in after the base
    pub extend: Vec<String>,
    /// Build an identifier that only looks at file name extensions
    pub extension_only: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from("/usr/share/idforge"),
            signature: "default.sig".to_string(),
            version: 1,
            name: "pronom".to_string(),
            definition: "pronom.json".to_string(),
            extend: Vec::new(),
            extension_only: false,
        }
    }
}

impl EngineConfig {
    /// The Archivematica build: PRONOM plus Archivematica's own formats
    pub fn archivematica() -> Self {
        Self {
            signature: "archivematica.sig".to_string(),
            name: "archivematica".to_string(),
            extend: (2..=5).map(|n| format!("archivematica-fmt{n}.json")).collect(),
            ..Self::default()
        }
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = definition.into();
        self
    }

    pub fn with_extend(mut self, extend: Vec<String>) -> Self {
        self.extend = extend;
        self
    }

    /// Restricts identification to file name extensions
    pub fn extension_only(mut self) -> Self {
        self.extension_only = true;
        self
    }

    /// Full path of the compiled signature file
    pub fn signature_path(&self) -> PathBuf {
        self.home.join(&self.signature)
    }

    /// Base definition followed by every extension, as full paths
    pub fn definition_paths(&self) -> Vec<PathBuf> {
        std::iter::once(&self.definition)
            .chain(&self.extend)
            .map(|name| self.home.join(name))
            .collect()
    }
}
