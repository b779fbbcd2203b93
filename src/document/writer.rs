//! Document writing
//!
//! Output is rendered fully in memory and written to a [`StagedFile`], a
//! temporary file in the destination directory that only replaces the target
//! path on [`StagedFile::commit`]. A failed run never leaves a partial file
//! behind.

use super::format::DocumentFormat;
use super::loader::RawChunk;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A fully processed document, ready to be written
///
/// Chunks keep the shape they were loaded with; only their text and boundary
/// markers reflect the transformation.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    /// Document identifier
    pub id: String,
    /// Document metadata
    pub metadata: Map<String, Value>,
    /// Transformed chunks, in document order
    pub chunks: Vec<RawChunk>,
}

impl ProcessedDocument {
    /// Renders the document in a format
    pub fn render(&self, format: DocumentFormat) -> Result<String> {
        match format {
            DocumentFormat::Text => Ok(self.chunks.iter().map(|c| c.data.as_str()).collect()),
            DocumentFormat::Json => {
                let document = JsonDocument {
                    id: &self.id,
                    metadata: &self.metadata,
                    chunks: &self.chunks,
                };
                Ok(serde_json::to_string_pretty(&document)?)
            }
        }
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    id: &'a str,
    metadata: &'a Map<String, Value>,
    chunks: &'a [RawChunk],
}

/// Trait for document writers
pub trait DocumentWriter: Send + Sync {
    /// Write a rendered document to `out`
    fn write(
        &self,
        out: &mut dyn Write,
        document: &ProcessedDocument,
        format: DocumentFormat,
    ) -> Result<()>;
}

/// Writer for the built-in formats
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinWriter;

impl DocumentWriter for BuiltinWriter {
    fn write(
        &self,
        out: &mut dyn Write,
        document: &ProcessedDocument,
        format: DocumentFormat,
    ) -> Result<()> {
        let rendered = document.render(format)?;
        out.write_all(rendered.as_bytes())?;
        tracing::debug!(document = %document.id, format = %format, "Document rendered");
        Ok(())
    }
}

/// File contents staged next to their target, invisible until committed
///
/// Dropping an uncommitted stage removes the temporary file and leaves the
/// target untouched.
#[derive(Debug)]
pub struct StagedFile {
    target: PathBuf,
    file: NamedTempFile,
}

impl StagedFile {
    /// Creates a temporary file in the target's directory
    pub fn new(target: &Path) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        Ok(Self {
            target: target.to_path_buf(),
            file,
        })
    }

    /// Path the contents will land at
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Moves the contents over the target path
    pub fn commit(mut self) -> Result<()> {
        self.file
            .flush()
            .with_context(|| format!("Failed to write {}", self.target.display()))?;
        let target = self.target;
        self.file
            .persist(&target)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to persist {}", target.display()))?;
        Ok(())
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Writes bytes through a temporary file in the destination directory
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut staged = StagedFile::new(path)?;
    staged
        .write_all(contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    staged.commit()
}

/// Writes a value as pretty JSON, atomically
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chunk::ContextMarker;

    fn document() -> ProcessedDocument {
        ProcessedDocument {
            id: "doc".to_string(),
            metadata: Map::new(),
            chunks: vec![
                RawChunk {
                    id: Some("c1".to_string()),
                    data: "Hello <PERSON>.\n\n".to_string(),
                    lang: Some("en".to_string()),
                    markers: vec![ContextMarker::boundary("separator", 15)],
                    ..RawChunk::default()
                },
                RawChunk {
                    data: "Bye.".to_string(),
                    ..RawChunk::default()
                },
            ],
        }
    }

    fn written(document: &ProcessedDocument, format: DocumentFormat) -> String {
        let mut out = Vec::new();
        BuiltinWriter.write(&mut out, document, format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_render_text_concatenates() {
        assert_eq!(
            written(&document(), DocumentFormat::Text),
            "Hello <PERSON>.\n\nBye."
        );
    }

    #[test]
    fn test_render_json_keeps_chunk_shape() {
        let value: Value = serde_json::from_str(&written(&document(), DocumentFormat::Json)).unwrap();
        assert_eq!(value["chunks"][0]["id"], "c1");
        assert_eq!(value["chunks"][0]["lang"], "en");
        assert_eq!(value["chunks"][0]["markers"][0]["offset"], 15);
        assert_eq!(value["chunks"][1], serde_json::json!({"data": "Bye."}));
    }

    #[test]
    fn test_write_atomic_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_dropped_stage_leaves_target_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old").unwrap();

        let mut staged = StagedFile::new(&path).unwrap();
        staged.write_all(b"half").unwrap();
        assert_eq!(staged.target(), path.as_path());
        drop(staged);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");
        assert!(write_atomic(&path, b"x").is_err());
        assert!(!path.exists());
    }
}
