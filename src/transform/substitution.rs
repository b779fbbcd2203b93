//! Policy-driven span substitution

use super::{PolicyMap, Transformer};
use crate::domain::chunk::DocumentChunk;
use crate::domain::pii::PiiInstance;
use crate::pipeline::adapter::{remap_markers, SpanEdit};
use anyhow::{bail, Result};

/// Replaces every instance span with the output of its type's policy
#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyTransformer;

impl PolicyTransformer {
    /// Create a new transformer
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for PolicyTransformer {
    fn name(&self) -> &str {
        "policy"
    }

    fn transform(
        &self,
        chunk: &DocumentChunk,
        instances: &[PiiInstance],
        policies: &PolicyMap,
    ) -> Result<DocumentChunk> {
        let text = chunk.data.as_str();
        let mut output = String::with_capacity(text.len());
        let mut edits = Vec::with_capacity(instances.len());
        let mut cursor = 0;

        for instance in instances {
            if instance.start < cursor
                || instance.end > text.len()
                || !text.is_char_boundary(instance.start)
                || !text.is_char_boundary(instance.end)
            {
                bail!(
                    "cannot replace span [{}, {}) of chunk {}",
                    instance.start,
                    instance.end,
                    chunk.id()
                );
            }
            output.push_str(&text[cursor..instance.start]);
            let replacement = policies.replacement(instance);
            output.push_str(&replacement);
            edits.push(SpanEdit {
                start: instance.start,
                end: instance.end,
                replacement_len: replacement.len(),
            });
            cursor = instance.end;
        }
        output.push_str(&text[cursor..]);

        let markers = remap_markers(&chunk.markers, &edits);
        Ok(chunk.derive(output, markers))
    }
}
