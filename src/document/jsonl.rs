//! JSONL record processing
//!
//! Every line of the input is a JSON object carrying one text field and,
//! optionally, a language field. Each record becomes one chunk routed through
//! a [`MultiPiiTextProcessor`]; the transformed text replaces the original in
//! place and every other field is written back untouched, in its original
//! order. A `.yml`/`.yaml` input holds the same records as a YAML list; the
//! output is JSONL either way.

use crate::domain::chunk::ChunkMetadata;
use crate::domain::errors::PiiProcessError;
use crate::domain::result::Result;
use crate::pipeline::adapter::wrap;
use crate::pipeline::MultiPiiTextProcessor;
use serde_json::Value;
use std::fmt;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Options for JSONL processing
#[derive(Debug, Clone)]
pub struct JsonlOptions {
    /// Dotted path of the text field
    pub text_field: String,
    /// Candidate names of the language field, tried in order
    pub lang_fields: Vec<String>,
    /// Copy records in an unusable language verbatim instead of failing
    pub skip_invalid_lang: bool,
}

impl Default for JsonlOptions {
    fn default() -> Self {
        Self {
            text_field: "text".to_string(),
            lang_fields: vec!["lang".to_string(), "language".to_string()],
            skip_invalid_lang: false,
        }
    }
}

/// Counters for a JSONL run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonlSummary {
    /// Non-blank records read
    pub records: u64,
    /// Records run through the pipeline
    pub processed: u64,
    /// Records copied verbatim because of their language
    pub copied: u64,
}

impl JsonlSummary {
    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            records = self.records,
            processed = self.processed,
            copied = self.copied,
            "JSONL processing completed"
        );
    }
}

/// Where a record sits in its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Line(usize),
    Item(usize),
}

impl Position {
    fn number(self) -> usize {
        match self {
            Position::Line(n) | Position::Item(n) => n,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Line(n) => write!(f, "line {n}"),
            Position::Item(n) => write!(f, "item {n}"),
        }
    }
}

/// Processes JSONL from `input` into `output`
///
/// `should_stop` is checked before each record; when it returns true the run
/// ends with `PiiProcessError::Interrupted`.
pub fn process_jsonl<R, W, F>(
    input: R,
    mut output: W,
    processor: &mut MultiPiiTextProcessor,
    options: &JsonlOptions,
    should_stop: F,
) -> Result<JsonlSummary>
where
    R: BufRead,
    W: Write,
    F: Fn() -> bool,
{
    let mut summary = JsonlSummary::default();

    for (index, line) in input.lines().enumerate() {
        check_stop(&should_stop, &summary)?;

        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        summary.records += 1;
        let position = Position::Line(index + 1);

        let mut record: Value = serde_json::from_str(&line).map_err(|e| {
            PiiProcessError::InvalidDocument(format!("{position}: not valid JSON: {e}"))
        })?;
        if process_record(&mut record, position, processor, options)? {
            serde_json::to_writer(&mut output, &record)?;
            summary.processed += 1;
        } else {
            output.write_all(line.as_bytes())?;
            summary.copied += 1;
        }
        output.write_all(b"\n")?;
    }

    output.flush()?;
    Ok(summary)
}

/// Processes a YAML list of records from `input`, writing JSONL to `output`
///
/// Records copied because of their language are written as JSON, unchanged.
pub fn process_yaml<R, W, F>(
    mut input: R,
    mut output: W,
    processor: &mut MultiPiiTextProcessor,
    options: &JsonlOptions,
    should_stop: F,
) -> Result<JsonlSummary>
where
    R: Read,
    W: Write,
    F: Fn() -> bool,
{
    let mut source = String::new();
    input.read_to_string(&mut source)?;
    let records: Vec<Value> = if source.trim().is_empty() {
        Vec::new()
    } else {
        serde_yaml::from_str(&source).map_err(|e| {
            PiiProcessError::InvalidDocument(format!("not a YAML list of records: {e}"))
        })?
    };

    let mut summary = JsonlSummary::default();
    for (index, mut record) in records.into_iter().enumerate() {
        check_stop(&should_stop, &summary)?;
        summary.records += 1;

        if process_record(&mut record, Position::Item(index + 1), processor, options)? {
            summary.processed += 1;
        } else {
            summary.copied += 1;
        }
        serde_json::to_writer(&mut output, &record)?;
        output.write_all(b"\n")?;
    }

    output.flush()?;
    Ok(summary)
}

fn check_stop<F: Fn() -> bool>(should_stop: &F, summary: &JsonlSummary) -> Result<()> {
    if should_stop() {
        return Err(PiiProcessError::Interrupted(format!(
            "stopped after {} records",
            summary.records
        )));
    }
    Ok(())
}

/// Processes a JSONL or YAML file, writing the output atomically
///
/// The reader is picked from the input extension. The output only appears
/// once every record has been processed.
pub fn process_jsonl_file<F>(
    input: &Path,
    output: &Path,
    processor: &mut MultiPiiTextProcessor,
    options: &JsonlOptions,
    should_stop: F,
) -> Result<JsonlSummary>
where
    F: Fn() -> bool,
{
    let reader = std::fs::File::open(input).map_err(|e| {
        PiiProcessError::Load(format!("Failed to open {}: {e}", input.display()))
    })?;

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        PiiProcessError::Write(format!(
            "Failed to create temporary file in {}: {e}",
            dir.display()
        ))
    })?;

    let mut writer = BufWriter::new(tmp);
    let summary = if is_yaml(input) {
        tracing::debug!(input = %input.display(), "Reading records as YAML");
        process_yaml(reader, &mut writer, processor, options, should_stop)?
    } else {
        process_jsonl(
            BufReader::new(reader),
            &mut writer,
            processor,
            options,
            should_stop,
        )?
    };

    let tmp = writer
        .into_inner()
        .map_err(|e| PiiProcessError::Write(format!("Failed to flush output: {e}")))?;
    tmp.persist(output).map_err(|e| {
        PiiProcessError::Write(format!("Failed to persist {}: {}", output.display(), e.error))
    })?;

    summary.log_summary();
    Ok(summary)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"))
}

/// Runs one record in place; `false` means it is to be copied unchanged
fn process_record(
    record: &mut Value,
    position: Position,
    processor: &mut MultiPiiTextProcessor,
    options: &JsonlOptions,
) -> Result<bool> {
    let invalid = |message: String| PiiProcessError::InvalidDocument(format!("{position}: {message}"));

    if !record.is_object() {
        return Err(invalid("record is not an object".to_string()));
    }

    let lang = match record_lang(record, &options.lang_fields) {
        Some(tag) => match processor.processor(&tag) {
            Some(p) => p.lang().clone(),
            None if options.skip_invalid_lang => {
                tracing::warn!(position = %position, lang = %tag, "Copying record in unsupported language");
                return Ok(false);
            }
            None => {
                return Err(PiiProcessError::unsupported_language(
                    tag,
                    processor.languages(),
                ))
            }
        },
        None => {
            let mut langs = processor.languages();
            match (langs.next(), langs.next()) {
                (Some(only), None) => only.clone(),
                _ if options.skip_invalid_lang => {
                    tracing::warn!(position = %position, "Copying record without language");
                    return Ok(false);
                }
                _ => return Err(invalid("record has no language".to_string())),
            }
        }
    };

    let document_id = record
        .get("id")
        .cloned()
        .unwrap_or(Value::from(position.number()));
    let text_slot = field_mut(record, &options.text_field)
        .ok_or_else(|| invalid(format!("missing text field '{}'", options.text_field)))?;
    let Value::String(text) = text_slot else {
        return Err(invalid(format!(
            "text field '{}' is not a string",
            options.text_field
        )));
    };

    let metadata = ChunkMetadata::new()
        .with_field("document_id", document_id)
        .with_field("record", position.number());
    let chunk = wrap(text.as_str(), &lang, Some(metadata))?;
    let processed = processor.process_chunk(chunk)?;
    *text = processed.chunk.data;

    Ok(true)
}

fn record_lang(record: &Value, fields: &[String]) -> Option<String> {
    fields
        .iter()
        .find_map(|f| record.get(f).and_then(Value::as_str))
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

/// Follows a dotted path through nested objects
fn field_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(value, |current, key| current.get_mut(key))
}
