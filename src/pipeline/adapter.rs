//! Chunk adapter
//!
//! Wraps raw buffers into [`DocumentChunk`]s and turns transformed chunks back
//! into text. Boundary markers recorded at wrap time are carried through
//! transformation by [`remap_markers`], so the structural shape of the
//! buffer survives span replacement.

use crate::domain::chunk::{ChunkMetadata, ContextMarker, DocumentChunk};
use crate::domain::errors::PiiProcessError;
use crate::domain::ids::Language;
use crate::domain::result::Result;

/// One span replacement, in original-text coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanEdit {
    /// Start of the replaced span
    pub start: usize,
    /// End of the replaced span (exclusive)
    pub end: usize,
    /// Byte length of the replacement text
    pub replacement_len: usize,
}

/// Wraps a buffer into a chunk with a fresh identifier
///
/// # Errors
///
/// Returns `PiiProcessError::Adapter` if a boundary marker lies outside the
/// buffer, splits a character, or goes backwards.
pub fn wrap(
    buffer: impl Into<String>,
    lang: &Language,
    metadata: Option<ChunkMetadata>,
) -> Result<DocumentChunk> {
    let mut chunk = DocumentChunk::new(buffer, lang.clone());
    if let Some(metadata) = metadata {
        validate_markers(&chunk.data, &metadata.markers)?;
        chunk.markers = metadata.markers;
        chunk.metadata = metadata.fields;
    }
    Ok(chunk)
}

/// Returns the chunk text after checking its markers still fit it
pub fn unwrap(chunk: DocumentChunk) -> Result<String> {
    validate_markers(&chunk.data, &chunk.markers)?;
    Ok(chunk.data)
}

/// Checks boundary markers against a text
pub fn validate_markers(text: &str, markers: &[ContextMarker]) -> Result<()> {
    let mut previous = 0usize;
    for offset in markers.iter().filter_map(ContextMarker::offset) {
        if offset > text.len() {
            return Err(PiiProcessError::Adapter(format!(
                "boundary offset {offset} outside buffer of length {}",
                text.len()
            )));
        }
        if !text.is_char_boundary(offset) {
            return Err(PiiProcessError::Adapter(format!(
                "boundary offset {offset} is not on a character boundary"
            )));
        }
        if offset < previous {
            return Err(PiiProcessError::Adapter(format!(
                "boundary offset {offset} precedes offset {previous}"
            )));
        }
        previous = offset;
    }
    Ok(())
}

/// Shifts boundary markers across span replacements
///
/// `edits` must be sorted and non-overlapping. A boundary at or before an
/// edit's start stays in front of the replacement; one strictly inside a
/// replaced span moves to the end of the replacement.
pub fn remap_markers(markers: &[ContextMarker], edits: &[SpanEdit]) -> Vec<ContextMarker> {
    markers
        .iter()
        .map(|marker| match marker {
            ContextMarker::Boundary { kind, offset } => ContextMarker::Boundary {
                kind: kind.clone(),
                offset: remap_offset(*offset, edits),
            },
            other => other.clone(),
        })
        .collect()
}

fn remap_offset(offset: usize, edits: &[SpanEdit]) -> usize {
    let mut shift: isize = 0;
    for edit in edits {
        if offset >= edit.end {
            shift += edit.replacement_len as isize - (edit.end - edit.start) as isize;
        } else if offset > edit.start {
            return (edit.start as isize + shift) as usize + edit.replacement_len;
        } else {
            break;
        }
    }
    (offset as isize + shift) as usize
}

/// Splits the chunk text at its boundary markers
pub fn segments(chunk: &DocumentChunk) -> Result<Vec<&str>> {
    validate_markers(&chunk.data, &chunk.markers)?;
    let mut pieces = Vec::new();
    let mut cursor = 0;
    for offset in chunk.boundaries().filter_map(ContextMarker::offset) {
        pieces.push(&chunk.data[cursor..offset]);
        cursor = offset;
    }
    pieces.push(&chunk.data[cursor..]);
    Ok(pieces)
}
