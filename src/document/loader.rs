//! Document loading
//!
//! A [`DocumentLoader`] turns a file into a [`RawDocument`]: document metadata
//! plus an ordered list of raw chunks. Languages are left as declared; the
//! orchestrator resolves them.

use super::format::DocumentFormat;
use crate::domain::chunk::ContextMarker;
use crate::domain::errors::PiiProcessError;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Boundary kind recorded where a paragraph separator starts
pub const SEPARATOR_BOUNDARY: &str = "separator";

/// One chunk as found in the source document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawChunk {
    /// Chunk id, if the document carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Chunk text
    pub data: String,
    /// Declared language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Context markers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<ContextMarker>,
    /// Free-form fields
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

/// A loaded document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Document identifier
    #[serde(default)]
    pub id: String,
    /// Document metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Chunks, in document order
    pub chunks: Vec<RawChunk>,
}

impl RawDocument {
    /// Document language from `main_lang`, then `lang`
    pub fn main_lang(&self) -> Option<&str> {
        ["main_lang", "lang"]
            .iter()
            .find_map(|key| self.metadata.get(*key).and_then(Value::as_str))
            .filter(|l| !l.trim().is_empty())
    }
}

/// Trait for document loaders
pub trait DocumentLoader: Send + Sync {
    /// Load a document
    fn load(&self, path: &Path) -> Result<RawDocument>;
}

/// Loader for the built-in formats
#[derive(Debug, Clone)]
pub struct BuiltinLoader {
    format: Option<DocumentFormat>,
    separator: Regex,
}

impl BuiltinLoader {
    /// Loader picking the format from the file extension
    pub fn new() -> Result<Self> {
        Self::with_format(None)
    }

    /// Loader with an optional format override
    pub fn with_format(format: Option<DocumentFormat>) -> Result<Self> {
        Ok(Self {
            format,
            separator: Regex::new(r"\r?\n(?:[ \t]*\r?\n)+")?,
        })
    }

    /// Splits text into paragraph chunks
    ///
    /// Each chunk keeps the blank-line separator that follows it, with a
    /// boundary marker where the separator starts, so concatenating the
    /// chunks restores the input byte for byte.
    pub fn split_text(&self, document: &str, text: &str) -> Vec<RawChunk> {
        let mut chunks = Vec::new();
        let mut cursor = 0;
        for sep in self.separator.find_iter(text) {
            let mut chunk = paragraph(document, chunks.len(), &text[cursor..sep.end()]);
            chunk
                .markers
                .push(ContextMarker::boundary(SEPARATOR_BOUNDARY, sep.start() - cursor));
            chunks.push(chunk);
            cursor = sep.end();
        }
        if cursor < text.len() {
            chunks.push(paragraph(document, chunks.len(), &text[cursor..]));
        }
        chunks
    }

    fn load_text(&self, path: &Path, id: String) -> Result<RawDocument> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(RawDocument {
            chunks: self.split_text(&id, &text),
            id,
            metadata: Map::new(),
        })
    }

    fn load_json(&self, path: &Path, id: String) -> Result<RawDocument> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut document: RawDocument = serde_json::from_str(&content).map_err(|e| {
            PiiProcessError::InvalidDocument(format!("{}: {e}", path.display()))
        })?;
        if document.id.is_empty() {
            document.id = id;
        }
        Ok(document)
    }
}

impl DocumentLoader for BuiltinLoader {
    fn load(&self, path: &Path) -> Result<RawDocument> {
        let format = self
            .format
            .or_else(|| DocumentFormat::from_path(path))
            .ok_or_else(|| {
                PiiProcessError::Load(format!(
                    "Cannot infer document format from {}",
                    path.display()
                ))
            })?;
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();

        tracing::debug!(path = %path.display(), format = %format, "Loading document");
        match format {
            DocumentFormat::Text => self.load_text(path, id),
            DocumentFormat::Json => self.load_json(path, id),
        }
    }
}

fn paragraph(document: &str, index: usize, data: &str) -> RawChunk {
    RawChunk {
        data: data.to_string(),
        markers: vec![ContextMarker::position(document, index)],
        ..RawChunk::default()
    }
}
