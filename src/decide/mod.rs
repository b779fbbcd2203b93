//! Consolidation stage
//!
//! A [`DecisionEngine`] receives every instance the detection tasks produced
//! for a chunk and returns the authoritative, non-overlapping set. The
//! pipeline re-checks that postcondition with [`check_consolidated`] no matter
//! which engine is plugged in.

pub mod overlap;

pub use overlap::{OverlapDecider, OverlapPolicy};

use crate::domain::chunk::DocumentChunk;
use crate::domain::errors::PiiProcessError;
use crate::domain::pii::PiiInstance;
use crate::domain::result::Result;

/// Trait for consolidation implementations
pub trait DecisionEngine: Send + Sync {
    /// Engine name, for logs and task listings
    fn name(&self) -> &str;

    /// Consolidate the instances detected in a chunk
    fn decide(
        &self,
        chunk: &DocumentChunk,
        instances: Vec<PiiInstance>,
    ) -> anyhow::Result<Vec<PiiInstance>>;
}

/// Engine that returns its input unchanged
///
/// Used when the decision stage is disabled. Overlapping detections then fail
/// the consolidation check instead of being resolved.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughDecider;

impl DecisionEngine for PassthroughDecider {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn decide(
        &self,
        _chunk: &DocumentChunk,
        instances: Vec<PiiInstance>,
    ) -> anyhow::Result<Vec<PiiInstance>> {
        Ok(instances)
    }
}

/// Sorts consolidated instances by offset and verifies they are pairwise
/// non-overlapping and inside the chunk
pub fn check_consolidated(chunk: &DocumentChunk, instances: &mut [PiiInstance]) -> Result<()> {
    let violation = |message: String| PiiProcessError::ConsolidationInvariant {
        chunk_id: chunk.id().to_string(),
        message,
    };

    instances.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
    if let Some(bad) = instances
        .iter()
        .find(|i| i.is_empty() || i.end > chunk.data.len())
    {
        return Err(violation(format!(
            "span [{}, {}) from '{}' is empty or outside the chunk",
            bad.start, bad.end, bad.detector
        )));
    }
    if let Some(pair) = instances.windows(2).find(|w| w[0].overlaps(&w[1])) {
        return Err(violation(format!(
            "{} [{}, {}) from '{}' overlaps {} [{}, {}) from '{}'",
            pair[0].pii_type,
            pair[0].start,
            pair[0].end,
            pair[0].detector,
            pair[1].pii_type,
            pair[1].start,
            pair[1].end,
            pair[1].detector
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{Language, PiiType, TaskId};

    fn instance(start: usize, end: usize) -> PiiInstance {
        PiiInstance::new(PiiType::PERSON, "", start, end, TaskId::new("t").unwrap())
    }

    #[test]
    fn test_check_sorts_and_accepts_disjoint() {
        let chunk = DocumentChunk::new("0123456789", Language::new("en").unwrap());
        let mut set = vec![instance(5, 8), instance(0, 3)];
        check_consolidated(&chunk, &mut set).unwrap();
        assert_eq!(set[0].start, 0);
    }

    #[test]
    fn test_check_rejects_overlap() {
        let chunk = DocumentChunk::new("0123456789", Language::new("en").unwrap());
        let mut set = vec![instance(0, 5), instance(4, 8)];
        let err = check_consolidated(&chunk, &mut set).unwrap_err();
        assert!(matches!(
            err,
            PiiProcessError::ConsolidationInvariant { ref chunk_id, .. } if chunk_id == chunk.id().as_str()
        ));
    }

    #[test]
    fn test_passthrough_keeps_everything() {
        let chunk = DocumentChunk::new("0123456789", Language::new("en").unwrap());
        let out = PassthroughDecider
            .decide(&chunk, vec![instance(0, 5), instance(4, 8)])
            .unwrap();
        assert_eq!(out.len(), 2);
    }
}
