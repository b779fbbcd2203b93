//! PII instance data models

use super::ids::{ChunkId, PiiType, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Detection method used to identify PII
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Regex pattern matching
    Regex,
    /// Named Entity Recognition
    Ner,
    /// Dictionary or gazetteer lookup
    Dictionary,
    /// Hybrid approach
    Hybrid,
}

/// Detected PII instance
///
/// Offsets are UTF-8 byte offsets into the owning chunk's text, half-open
/// `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiInstance {
    /// PII type tag
    #[serde(rename = "type")]
    pub pii_type: PiiType,
    /// Start offset
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
    /// Matched text
    pub value: String,
    /// Task that produced the instance
    pub detector: TaskId,
    /// Confidence score (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Country the instance is specific to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Owning chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<ChunkId>,
    /// Extra fields (e.g. `docid`)
    #[serde(default, skip_serializing_if = "Map::is_empty", flatten)]
    pub fields: Map<String, Value>,
}

impl PiiInstance {
    /// Create a new PII instance
    pub fn new(
        pii_type: PiiType,
        value: impl Into<String>,
        start: usize,
        end: usize,
        detector: TaskId,
    ) -> Self {
        Self {
            pii_type,
            start,
            end,
            value: value.into(),
            detector,
            score: None,
            country: None,
            chunk_id: None,
            fields: Map::new(),
        }
    }

    /// Set the confidence score
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score.clamp(0.0, 1.0));
        self
    }

    /// Set the country
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Set the owning chunk
    pub fn with_chunk(mut self, chunk_id: ChunkId) -> Self {
        self.chunk_id = Some(chunk_id);
        self
    }

    /// Span length in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span is empty
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether two spans share at least one byte
    pub fn overlaps(&self, other: &PiiInstance) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(start: usize, end: usize) -> PiiInstance {
        PiiInstance::new(
            PiiType::PERSON,
            "x".repeat(end - start),
            start,
            end,
            TaskId::new("test").unwrap(),
        )
    }

    #[test]
    fn test_overlaps() {
        assert!(instance(0, 5).overlaps(&instance(4, 8)));
        assert!(!instance(0, 5).overlaps(&instance(5, 8)));
        assert!(instance(2, 3).overlaps(&instance(0, 10)));
    }

    #[test]
    fn test_score_clamped() {
        let i = instance(0, 1).with_score(1.7);
        assert_eq!(i.score, Some(1.0));
    }

    #[test]
    fn test_serialization_uses_type_key_and_flattens_fields() {
        let mut i = instance(0, 4).with_country("es");
        i.fields.insert("docid".to_string(), Value::from(7));
        let json = serde_json::to_value(&i).unwrap();
        assert_eq!(json["type"], "PERSON");
        assert_eq!(json["docid"], 7);
        assert_eq!(json["country"], "es");
        assert!(json.get("score").is_none());
    }
}
