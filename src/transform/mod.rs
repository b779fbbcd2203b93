//! Transformation stage
//!
//! A [`Transformer`] rewrites a chunk given its consolidated PII instances and
//! the effective [`PolicyMap`].

pub mod policy;
pub mod substitution;
pub mod synthetic;

pub use policy::{Policy, PolicyMap};
pub use substitution::PolicyTransformer;

use crate::domain::chunk::DocumentChunk;
use crate::domain::pii::PiiInstance;

/// Trait for transformation implementations
pub trait Transformer: Send + Sync {
    /// Transformer name, for logs and task listings
    fn name(&self) -> &str;

    /// Produce the transformed chunk
    ///
    /// `instances` are sorted by start offset and pairwise non-overlapping.
    fn transform(
        &self,
        chunk: &DocumentChunk,
        instances: &[PiiInstance],
        policies: &PolicyMap,
    ) -> anyhow::Result<DocumentChunk>;
}

/// Transformer that returns the chunk unchanged
///
/// Used when the transform stage is disabled, for detect-only runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTransformer;

impl Transformer for PassthroughTransformer {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn transform(
        &self,
        chunk: &DocumentChunk,
        _instances: &[PiiInstance],
        _policies: &PolicyMap,
    ) -> anyhow::Result<DocumentChunk> {
        Ok(chunk.clone())
    }
}
