//! Command execution

use super::commands::{Cli, Commands, SignatureArgs};
use crate::application::dto::FileReport;
use crate::application::{Engine, EngineBuilder, JoinKey, compare};
use crate::domain::repositories::Buffer;
use crate::infrastructure::buffers::MmapBuffer;
use crate::infrastructure::identifiers::pronom::SignatureDefinition;
use crate::infrastructure::results::{
    CsvResultWriter, FileRecord, IdentifierSummary, JsonResultWriter, ResultSetHeader,
    format_timestamp,
};
use crate::persist::IdentifierRegistry;
use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};
use std::io::{self, StdoutLock, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, warn};

/// Runs a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            signatures,
            definitions,
            output,
            extension_only,
        } => build(&signatures, &definitions, output, extension_only),
        Commands::Identify {
            signatures,
            json,
            csv,
            hash,
            paths,
        } => {
            let format = if json {
                Format::Json
            } else if csv {
                Format::Csv
            } else {
                Format::Text
            };
            identify(&signatures, format, hash, &paths)
        }
        Commands::Compare { join, results } => compare_results(join, &results),
        Commands::Inspect { signatures } => inspect(&signatures),
    }
}

fn build(
    signatures: &SignatureArgs,
    definitions: &[PathBuf],
    output: Option<PathBuf>,
    extension_only: bool,
) -> Result<()> {
    let mut config = signatures.config();
    if extension_only {
        config = config.extension_only();
    }

    let builder = if definitions.is_empty() {
        EngineBuilder::from_config(&config)?
    } else {
        let mut merged = SignatureDefinition::default();
        for path in definitions {
            let definition = SignatureDefinition::from_path(path)
                .with_context(|| format!("Failed to read definition {}", path.display()))?;
            merged.merge(definition);
        }
        let mut builder = EngineBuilder::new().with_version(config.version);
        builder
            .add_definition(&config.name, &merged, config.extension_only)
            .with_context(|| format!("Failed to build identifier {}", config.name))?;
        builder
    };
    let engine = builder.build();

    let output = output.unwrap_or_else(|| config.signature_path());
    let data = engine.save().context("Failed to serialize signatures")?;
    std::fs::write(&output, &data)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {} ({} bytes)", output.display(), data.len());
    for line in engine.describe() {
        println!("{line}");
    }
    Ok(())
}

fn inspect(signatures: &SignatureArgs) -> Result<()> {
    let config = signatures.config();
    let engine = Engine::open(&config, &IdentifierRegistry::with_defaults())?;
    println!("{}", config.signature_path().display());
    for line in engine.describe() {
        println!("  {line}");
    }
    Ok(())
}

fn compare_results(join: JoinKey, results: &[PathBuf]) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = compare(&mut out, join, results)?;
    if summary.is_complete_match() {
        writeln!(out)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
    Csv,
}

enum Output<'a> {
    Text(StdoutLock<'a>),
    Json(JsonResultWriter<StdoutLock<'a>>),
    Csv(CsvResultWriter<StdoutLock<'a>>),
}

impl Output<'_> {
    fn write(&mut self, record: &FileRecord<'_>) -> Result<()> {
        match self {
            Output::Text(out) => {
                writeln!(out, "---")?;
                writeln!(out, "filename : '{}'", record.name)?;
                writeln!(out, "filesize : {}", record.size)?;
                writeln!(out, "modified : {}", record.modified)?;
                writeln!(out, "errors   : '{}'", record.errors.join("; "))?;
                if let Some(hash) = &record.hash {
                    writeln!(out, "sha256   : {hash}")?;
                }
                writeln!(out, "matches  :")?;
                for id in record.identifications {
                    write!(out, "{}", id.long_text())?;
                }
            }
            Output::Json(writer) => writer.write(record)?,
            Output::Csv(writer) => writer.write(record)?,
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        match self {
            Output::Text(mut out) => out.flush()?,
            Output::Json(writer) => {
                let _out = writer.finish()?;
            }
            Output::Csv(writer) => {
                let _out = writer.finish()?;
            }
        }
        Ok(())
    }
}

fn identify(signatures: &SignatureArgs, format: Format, hash: bool, paths: &[PathBuf]) -> Result<()> {
    let config = signatures.config();
    let engine = Engine::open(&config, &IdentifierRegistry::with_defaults())?;

    let mut files = Vec::new();
    for path in paths {
        collect_files(path, &mut files)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }
    if files.is_empty() {
        bail!("No files to identify");
    }

    let header = ResultSetHeader {
        tool: format!("idforge {}", env!("CARGO_PKG_VERSION")),
        signature: config.signature_path().display().to_string(),
        created: format_timestamp(SystemTime::now()),
        identifiers: engine
            .identifiers()
            .map(|i| {
                let [name, details] = i.describe();
                IdentifierSummary { name, details }
            })
            .collect(),
    };
    let stdout = io::stdout().lock();
    let mut output = match format {
        Format::Text => Output::Text(stdout),
        Format::Json => Output::Json(JsonResultWriter::new(stdout, &header)?),
        Format::Csv => Output::Csv(CsvResultWriter::new(stdout)?),
    };

    let mut degraded = 0usize;
    for path in &files {
        let name = path.display().to_string();
        let (size, modified) = std::fs::metadata(path)
            .map(|m| (m.len(), m.modified().map(format_timestamp).unwrap_or_default()))
            .unwrap_or_default();

        let (report, digest) = match MmapBuffer::open(path) {
            Ok(buffer) => {
                let digest = if hash { Some(sha256(&buffer)?) } else { None };
                (engine.identify(&name, Arc::new(buffer)), digest)
            }
            Err(err) => {
                warn!("Cannot read {name}: {err}");
                let report = FileReport {
                    name: name.clone(),
                    ..Default::default()
                };
                let mut entry = record(&report, size, modified, None);
                entry.errors.push(err.to_string());
                output.write(&entry)?;
                degraded += 1;
                continue;
            }
        };
        if report.is_degraded() {
            degraded += 1;
        }
        output.write(&record(&report, size, modified, digest))?;
    }
    output.finish()?;

    if degraded > 0 {
        warn!("{degraded} of {} files were identified with errors", files.len());
    }
    Ok(())
}

fn record(report: &FileReport, size: u64, modified: String, hash: Option<String>) -> FileRecord<'_> {
    FileRecord {
        name: &report.name,
        size,
        modified,
        errors: report.errors(),
        hash,
        identifications: &report.identifications,
    }
}

fn sha256(buffer: &dyn Buffer) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(buffer.full()?);
    Ok(hex::encode(hasher.finalize()))
}

/// Expands directories depth first, in name order
fn collect_files(path: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    if !path.is_dir() {
        files.push(path.to_path_buf());
        return Ok(());
    }
    let mut entries = std::fs::read_dir(path)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    for entry in entries {
        collect_files(&entry, files)?;
    }
    Ok(())
}
