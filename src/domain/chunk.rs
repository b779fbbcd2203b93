//! Document chunk model
//!
//! A [`DocumentChunk`] is the unit every stage of the pipeline works on: a piece
//! of text, the language it is written in, the structural markers needed to put
//! it back into its document, and an opaque metadata bag.

use super::ids::{ChunkId, Language};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structural context attached to a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "marker", rename_all = "snake_case")]
pub enum ContextMarker {
    /// Location of the chunk inside its source document
    Position {
        /// Document identifier
        document: String,
        /// Zero-based chunk index
        index: usize,
    },
    /// Structural boundary inside the chunk text
    Boundary {
        /// Boundary kind (`paragraph`, `line`, `cell`, ...)
        kind: String,
        /// Byte offset into the chunk text
        offset: usize,
    },
}

impl ContextMarker {
    /// Creates a boundary marker
    pub fn boundary(kind: impl Into<String>, offset: usize) -> Self {
        ContextMarker::Boundary {
            kind: kind.into(),
            offset,
        }
    }

    /// Creates a position marker
    pub fn position(document: impl Into<String>, index: usize) -> Self {
        ContextMarker::Position {
            document: document.into(),
            index,
        }
    }

    /// Returns the byte offset for boundary markers
    pub fn offset(&self) -> Option<usize> {
        match self {
            ContextMarker::Boundary { offset, .. } => Some(*offset),
            ContextMarker::Position { .. } => None,
        }
    }
}

/// Structural metadata supplied when wrapping a buffer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Context markers, in document order
    #[serde(default)]
    pub markers: Vec<ContextMarker>,
    /// Free-form fields carried along with the chunk
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl ChunkMetadata {
    /// Creates empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a marker
    pub fn with_marker(mut self, marker: ContextMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Adds a metadata field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Metadata key holding the text of the neighbouring chunks
pub const CONTEXT_FIELD: &str = "context";

/// Atomic processing unit of the pipeline
///
/// The identifier and language are fixed at creation. Transformed chunks are
/// produced through [`DocumentChunk::derive`], which keeps both along with the
/// metadata bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    id: ChunkId,
    lang: Language,
    /// Chunk text
    pub data: String,
    /// Context markers, in document order
    #[serde(default)]
    pub markers: Vec<ContextMarker>,
    /// Opaque metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DocumentChunk {
    /// Creates a chunk with a fresh identifier
    pub fn new(data: impl Into<String>, lang: Language) -> Self {
        Self::with_id(ChunkId::generate(), data, lang)
    }

    /// Creates a chunk with a known identifier
    pub fn with_id(id: ChunkId, data: impl Into<String>, lang: Language) -> Self {
        Self {
            id,
            lang,
            data: data.into(),
            markers: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Chunk identifier
    pub fn id(&self) -> &ChunkId {
        &self.id
    }

    /// Chunk language
    pub fn lang(&self) -> &Language {
        &self.lang
    }

    /// Document identifier from the metadata bag, if any
    pub fn document_id(&self) -> Option<&Value> {
        self.metadata.get("document_id")
    }

    /// Text of the neighbouring chunk on one side (`before` or `after`), when
    /// the chunk was built with context
    pub fn context(&self, side: &str) -> Option<&str> {
        self.metadata.get(CONTEXT_FIELD)?.get(side)?.as_str()
    }

    /// Produces a new chunk sharing this chunk's identity with replaced content
    pub fn derive(&self, data: String, markers: Vec<ContextMarker>) -> Self {
        Self {
            id: self.id.clone(),
            lang: self.lang.clone(),
            data,
            markers,
            metadata: self.metadata.clone(),
        }
    }

    /// Boundary markers only
    pub fn boundaries(&self) -> impl Iterator<Item = &ContextMarker> {
        self.markers
            .iter()
            .filter(|m| matches!(m, ContextMarker::Boundary { .. }))
    }
}
