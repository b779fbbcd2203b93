//! Document orchestration
//!
//! [`process_document`] is the end-to-end flow for one file: load it, split it
//! into chunks, run every chunk through the pipeline, reassemble and write.
//! The first failure aborts the run and is reported wrapped in
//! [`PiiProcessError::DocumentProcess`]. Nothing is written unless every
//! chunk succeeded, and the output and the PII dump become visible together.

pub mod format;
pub mod jsonl;
pub mod loader;
pub mod writer;

pub use format::DocumentFormat;
pub use jsonl::{process_jsonl, process_jsonl_file, process_yaml, JsonlOptions, JsonlSummary};
pub use loader::{BuiltinLoader, DocumentLoader, RawChunk, RawDocument};
pub use writer::{
    write_atomic, write_json_atomic, BuiltinWriter, DocumentWriter, ProcessedDocument, StagedFile,
};

use crate::domain::chunk::{DocumentChunk, CONTEXT_FIELD};
use crate::domain::errors::PiiProcessError;
use crate::domain::ids::{ChunkId, Language, TaskId};
use crate::domain::pii::PiiInstance;
use crate::domain::result::Result;
use crate::pipeline::adapter::validate_markers;
use crate::pipeline::{
    MultiPiiTextProcessor, PiiTextProcessor, ProcessedChunk, ProcessorOptions, StatsReport,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for [`process_document`]
#[derive(Clone, Default)]
pub struct DocumentOptions {
    /// Language used when the document declares none
    pub lang: Option<String>,
    /// Processor options
    pub processor: ProcessorOptions,
    /// Input format; inferred from the input extension when unset
    pub input_format: Option<DocumentFormat>,
    /// Output format; inferred from the output extension when unset
    pub output_format: Option<DocumentFormat>,
    /// Where to dump the consolidated instances as JSON
    pub pii_file: Option<PathBuf>,
    /// Give each chunk the text of its neighbours under the `context`
    /// metadata key, so detectors can look across chunk boundaries
    pub chunk_context: bool,
    /// Custom loader
    pub loader: Option<Arc<dyn DocumentLoader>>,
    /// Custom writer
    pub writer: Option<Arc<dyn DocumentWriter>>,
}

impl fmt::Debug for DocumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentOptions")
            .field("lang", &self.lang)
            .field("processor", &self.processor)
            .field("input_format", &self.input_format)
            .field("output_format", &self.output_format)
            .field("pii_file", &self.pii_file)
            .field("chunk_context", &self.chunk_context)
            .field("custom_loader", &self.loader.is_some())
            .field("custom_writer", &self.writer.is_some())
            .finish()
    }
}

/// Outcome of a successful [`process_document`] run
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    /// Input path
    pub input: PathBuf,
    /// Output path
    pub output: PathBuf,
    /// Output format
    pub format: DocumentFormat,
    /// Number of chunks processed
    pub chunks: usize,
    /// Number of consolidated instances
    pub instances: usize,
    /// Languages used
    pub languages: Vec<Language>,
    /// Bound tasks per language
    pub tasks: BTreeMap<Language, Vec<TaskId>>,
    /// Statistics for this document
    pub stats: StatsReport,
    /// Completion time
    pub completed_at: DateTime<Utc>,
}

impl DocumentSummary {
    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            input = %self.input.display(),
            output = %self.output.display(),
            format = %self.format,
            chunks = self.chunks,
            instances = self.instances,
            languages = ?self.languages.iter().map(Language::as_str).collect::<Vec<_>>(),
            "Document processed"
        );
    }
}

/// Processes one document end to end
///
/// # Errors
///
/// Every failure is returned as `PiiProcessError::DocumentProcess` wrapping
/// the first stage error. On failure no output file is left at `output`.
pub fn process_document(
    input: &Path,
    output: &Path,
    options: &DocumentOptions,
) -> Result<DocumentSummary> {
    run(input, output, options).map_err(|e| {
        tracing::error!(
            input = %input.display(),
            stage = %e.stage(),
            error = %e,
            "Document processing failed"
        );
        e.in_document(input)
    })
}

fn run(input: &Path, output: &Path, options: &DocumentOptions) -> Result<DocumentSummary> {
    let format = options
        .output_format
        .or_else(|| DocumentFormat::from_path(output))
        .ok_or_else(|| {
            PiiProcessError::Write(format!(
                "Cannot infer output format from {}",
                output.display()
            ))
        })?;

    let raw = match &options.loader {
        Some(loader) => loader.load(input),
        None => BuiltinLoader::with_format(options.input_format)
            .and_then(|loader| loader.load(input)),
    }
    .map_err(|e| stage_error(e, PiiProcessError::Load))?;

    let default_lang = raw
        .main_lang()
        .or(options.lang.as_deref())
        .map(Language::new)
        .transpose()
        .map_err(PiiProcessError::InvalidDocument)?;
    let chunks = build_chunks(&raw, default_lang.as_ref(), options.chunk_context)?;

    let mut languages: BTreeSet<Language> = chunks.iter().map(|c| c.lang().clone()).collect();
    if languages.is_empty() {
        languages.extend(default_lang);
    }
    if languages.is_empty() {
        return Err(PiiProcessError::InvalidDocument(format!(
            "{} declares no language and none was given",
            input.display()
        )));
    }

    let mut engine = Engine::new(&languages, &options.processor)?;
    tracing::info!(
        input = %input.display(),
        chunks = chunks.len(),
        languages = languages.len(),
        "Processing document"
    );

    let mut stats = StatsReport::new();
    let mut instances: Vec<PiiInstance> = Vec::new();
    let mut transformed = Vec::with_capacity(chunks.len());
    for (source, chunk) in raw.chunks.iter().zip(chunks) {
        let processed = engine.process_chunk(chunk)?;
        stats.record(processed.chunk.lang(), &processed.counts(), &processed.timings);
        instances.extend(processed.instances.into_iter().map(|mut i| {
            i.fields.insert("docid".to_string(), raw.id.clone().into());
            i
        }));
        transformed.push(RawChunk {
            id: source.id.clone(),
            data: processed.chunk.data,
            lang: source.lang.clone(),
            markers: processed.chunk.markers,
            fields: source.fields.clone(),
        });
    }

    let document = ProcessedDocument {
        id: raw.id.clone(),
        metadata: raw.metadata.clone(),
        chunks: transformed,
    };
    write_outputs(output, &document, format, &instances, options)?;

    let summary = DocumentSummary {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        format,
        chunks: document.chunks.len(),
        instances: instances.len(),
        languages: languages.into_iter().collect(),
        tasks: engine.tasks(),
        stats,
        completed_at: Utc::now(),
    };
    summary.log_summary();
    Ok(summary)
}

/// Stages the PII dump and the document, then commits both
///
/// Nothing at `output` or at the PII path changes unless both were written
/// in full.
fn write_outputs(
    output: &Path,
    document: &ProcessedDocument,
    format: DocumentFormat,
    instances: &[PiiInstance],
    options: &DocumentOptions,
) -> Result<()> {
    let to_write_error = |e: anyhow::Error| stage_error(e, PiiProcessError::Write);

    let pii = options
        .pii_file
        .as_deref()
        .map(|path| stage_instances(path, instances))
        .transpose()
        .map_err(to_write_error)?;

    let mut staged = StagedFile::new(output).map_err(to_write_error)?;
    match &options.writer {
        Some(writer) => writer.write(&mut staged, document, format),
        None => BuiltinWriter.write(&mut staged, document, format),
    }
    .map_err(to_write_error)?;

    commit_outputs(pii, staged).map_err(to_write_error)
}

fn stage_instances(path: &Path, instances: &[PiiInstance]) -> anyhow::Result<StagedFile> {
    let mut staged = StagedFile::new(path)?;
    serde_json::to_writer_pretty(&mut staged, instances)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(staged)
}

/// Commits the PII dump, then the output; puts the previous dump back if
/// the output cannot be committed
fn commit_outputs(pii: Option<StagedFile>, output: StagedFile) -> anyhow::Result<()> {
    let Some(pii) = pii else {
        return output.commit();
    };
    let pii_path = pii.target().to_path_buf();
    let previous = std::fs::read(&pii_path).ok();
    pii.commit()?;

    if let Err(e) = output.commit() {
        let restored = match &previous {
            Some(bytes) => write_atomic(&pii_path, bytes),
            None => std::fs::remove_file(&pii_path).map_err(Into::into),
        };
        if let Err(restore) = restored {
            tracing::warn!(path = %pii_path.display(), error = %restore, "Failed to restore PII file");
        }
        return Err(e);
    }
    Ok(())
}

/// Keeps domain errors raised inside collaborators, wraps anything else
fn stage_error(error: anyhow::Error, wrap: fn(String) -> PiiProcessError) -> PiiProcessError {
    match error.downcast::<PiiProcessError>() {
        Ok(inner) => inner,
        Err(other) => wrap(format!("{other:#}")),
    }
}

/// Turns raw chunks into pipeline chunks with resolved languages
fn build_chunks(
    raw: &RawDocument,
    default_lang: Option<&Language>,
    chunk_context: bool,
) -> Result<Vec<DocumentChunk>> {
    raw.chunks
        .iter()
        .enumerate()
        .map(|(index, rc)| {
            let lang = match rc.lang.as_deref() {
                Some(tag) => Language::new(tag).map_err(PiiProcessError::InvalidDocument)?,
                None => default_lang.cloned().ok_or_else(|| {
                    PiiProcessError::InvalidDocument(format!(
                        "chunk {index} of '{}' has no language and the document declares none",
                        raw.id
                    ))
                })?,
            };
            let id = match &rc.id {
                Some(id) => ChunkId::new(id.clone()).map_err(PiiProcessError::InvalidDocument)?,
                None => ChunkId::generate(),
            };

            validate_markers(&rc.data, &rc.markers)?;
            let mut chunk = DocumentChunk::with_id(id, rc.data.clone(), lang);
            chunk.markers = rc.markers.clone();
            chunk.metadata = rc.fields.clone();
            chunk
                .metadata
                .entry("document_id")
                .or_insert_with(|| raw.id.clone().into());
            if chunk_context {
                chunk
                    .metadata
                    .insert(CONTEXT_FIELD.to_string(), neighbours(&raw.chunks, index));
            }
            Ok(chunk)
        })
        .collect()
}

/// `{"before": ..., "after": ...}` with the text of the adjacent chunks;
/// a side is absent at the document edges
fn neighbours(chunks: &[RawChunk], index: usize) -> Value {
    let mut context = Map::new();
    if let Some(prev) = index.checked_sub(1).and_then(|i| chunks.get(i)) {
        context.insert("before".to_string(), prev.data.clone().into());
    }
    if let Some(next) = chunks.get(index + 1) {
        context.insert("after".to_string(), next.data.clone().into());
    }
    Value::Object(context)
}

/// Single processor for one language, dispatcher for several
enum Engine {
    Single(PiiTextProcessor),
    Multi(MultiPiiTextProcessor),
}

impl Engine {
    fn new(languages: &BTreeSet<Language>, options: &ProcessorOptions) -> Result<Self> {
        let mut iter = languages.iter();
        match (iter.next(), iter.next()) {
            (Some(lang), None) => Ok(Engine::Single(PiiTextProcessor::new(
                lang.as_str(),
                options.clone(),
            )?)),
            _ => Ok(Engine::Multi(MultiPiiTextProcessor::new(
                languages.iter().map(Language::as_str),
                options.clone(),
            )?)),
        }
    }

    fn process_chunk(&mut self, chunk: DocumentChunk) -> Result<ProcessedChunk> {
        match self {
            Engine::Single(p) => p.process_chunk(chunk),
            Engine::Multi(p) => p.process_chunk(chunk),
        }
    }

    fn tasks(&self) -> BTreeMap<Language, Vec<TaskId>> {
        match self {
            Engine::Single(p) => BTreeMap::from([(p.lang().clone(), p.task_ids())]),
            Engine::Multi(p) => p.tasks(),
        }
    }
}
