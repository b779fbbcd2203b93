//! Shared stubs for the integration tests

#![allow(dead_code)]

use pii_process::decide::DecisionEngine;
use pii_process::detect::{Detector, LanguageSupport, TaskInfo};
use pii_process::document::{DocumentFormat, DocumentWriter, ProcessedDocument};
use pii_process::domain::{DetectionMethod, DocumentChunk, Language, PiiInstance, PiiType, TaskId};
use pii_process::pipeline::{StageContext, StageRegistry};
use pii_process::transform::{PolicyMap, Transformer};
use std::io::Write;
use std::sync::Arc;

pub fn lang(tag: &str) -> Language {
    Language::new(tag).unwrap()
}

fn info(id: &str, languages: LanguageSupport) -> TaskInfo {
    TaskInfo {
        id: TaskId::new(id).unwrap(),
        pii_types: vec![PiiType::PERSON],
        languages,
        country: None,
        method: DetectionMethod::Dictionary,
        description: String::new(),
    }
}

/// Flags every occurrence of a list of names as PERSON
pub struct NameDetector {
    info: TaskInfo,
    names: Vec<&'static str>,
}

impl NameDetector {
    pub fn new(id: &str, names: &[&'static str]) -> Self {
        Self {
            info: info(id, LanguageSupport::Any),
            names: names.to_vec(),
        }
    }

    pub fn for_languages(id: &str, names: &[&'static str], langs: &[&str]) -> Self {
        Self {
            info: info(id, LanguageSupport::from_tags(langs).unwrap()),
            names: names.to_vec(),
        }
    }
}

impl Detector for NameDetector {
    fn info(&self) -> &TaskInfo {
        &self.info
    }

    fn detect(&self, chunk: &DocumentChunk) -> anyhow::Result<Vec<PiiInstance>> {
        let mut found: Vec<PiiInstance> = self
            .names
            .iter()
            .flat_map(|name| chunk.data.match_indices(name))
            .map(|(start, m)| {
                PiiInstance::new(PiiType::PERSON, m, start, start + m.len(), self.info.id.clone())
                    .with_score(0.9)
            })
            .collect();
        found.sort_by_key(|i| i.start);
        Ok(found)
    }
}

/// Always fails
pub struct FailingDetector {
    info: TaskInfo,
}

impl FailingDetector {
    pub fn new(id: &str) -> Self {
        Self {
            info: info(id, LanguageSupport::Any),
        }
    }
}

impl Detector for FailingDetector {
    fn info(&self) -> &TaskInfo {
        &self.info
    }

    fn detect(&self, _chunk: &DocumentChunk) -> anyhow::Result<Vec<PiiInstance>> {
        anyhow::bail!("model not loaded")
    }
}

/// Flags a whole chunk as PERSON when the chunk before it ends with a label
pub struct LabelledValueDetector {
    info: TaskInfo,
    label: &'static str,
}

impl LabelledValueDetector {
    pub fn new(id: &str, label: &'static str) -> Self {
        Self {
            info: info(id, LanguageSupport::Any),
            label,
        }
    }
}

impl Detector for LabelledValueDetector {
    fn info(&self) -> &TaskInfo {
        &self.info
    }

    fn detect(&self, chunk: &DocumentChunk) -> anyhow::Result<Vec<PiiInstance>> {
        let labelled = chunk
            .context("before")
            .is_some_and(|before| before.trim_end().ends_with(self.label));
        let value = chunk.data.trim_end();
        if !labelled || value.is_empty() {
            return Ok(Vec::new());
        }
        let start = value.len() - value.trim_start().len();
        Ok(vec![PiiInstance::new(
            PiiType::PERSON,
            &value[start..],
            start,
            value.len(),
            self.info.id.clone(),
        )])
    }
}

/// Returns every instance twice, breaking the no-overlap postcondition
pub struct DuplicatingDecider;

impl DecisionEngine for DuplicatingDecider {
    fn name(&self) -> &str {
        "duplicating"
    }

    fn decide(
        &self,
        _chunk: &DocumentChunk,
        instances: Vec<PiiInstance>,
    ) -> anyhow::Result<Vec<PiiInstance>> {
        Ok(instances.iter().cloned().chain(instances.clone()).collect())
    }
}

/// Always fails
pub struct FailingDecider;

impl DecisionEngine for FailingDecider {
    fn name(&self) -> &str {
        "failing"
    }

    fn decide(
        &self,
        _chunk: &DocumentChunk,
        _instances: Vec<PiiInstance>,
    ) -> anyhow::Result<Vec<PiiInstance>> {
        anyhow::bail!("decision service unavailable")
    }
}

/// Transformer whose backend always fails
pub struct FailingTransformer;

impl Transformer for FailingTransformer {
    fn name(&self) -> &str {
        "failing"
    }

    fn transform(
        &self,
        _chunk: &DocumentChunk,
        _instances: &[PiiInstance],
        _policies: &PolicyMap,
    ) -> anyhow::Result<DocumentChunk> {
        anyhow::bail!("template engine unavailable")
    }
}

/// Transformer that hands back a chunk with a fresh identifier
pub struct IdentityChangingTransformer;

impl Transformer for IdentityChangingTransformer {
    fn name(&self) -> &str {
        "identity-changing"
    }

    fn transform(
        &self,
        chunk: &DocumentChunk,
        _instances: &[PiiInstance],
        _policies: &PolicyMap,
    ) -> anyhow::Result<DocumentChunk> {
        Ok(DocumentChunk::new(chunk.data.clone(), chunk.lang().clone()))
    }
}

/// Writer that emits part of the document, then fails
pub struct FailingWriter;

impl DocumentWriter for FailingWriter {
    fn write(
        &self,
        out: &mut dyn Write,
        _document: &ProcessedDocument,
        _format: DocumentFormat,
    ) -> anyhow::Result<()> {
        out.write_all(b"partial")?;
        anyhow::bail!("disk quota exceeded")
    }
}

/// Registry holding only the given detectors
pub fn registry_with(detectors: Vec<Arc<dyn Detector>>) -> Arc<StageRegistry> {
    let mut registry = StageRegistry::empty();
    for detector in detectors {
        registry.register_detector(detector).unwrap();
    }
    Arc::new(registry)
}

/// Registry with one name detector
pub fn names_registry(names: &[&'static str]) -> Arc<StageRegistry> {
    registry_with(vec![Arc::new(NameDetector::new("names", names))])
}

/// Registry using a custom decision engine
pub fn registry_with_decider(
    detectors: Vec<Arc<dyn Detector>>,
    decider: Arc<dyn DecisionEngine>,
) -> Arc<StageRegistry> {
    let mut registry = StageRegistry::empty();
    for detector in detectors {
        registry.register_detector(detector).unwrap();
    }
    registry.set_decider(Arc::new(
        move |_ctx: &StageContext<'_>| -> anyhow::Result<Arc<dyn DecisionEngine>> {
            Ok(Arc::clone(&decider))
        },
    ));
    Arc::new(registry)
}

/// Registry using a custom transformer
pub fn registry_with_transformer(
    detectors: Vec<Arc<dyn Detector>>,
    transformer: Arc<dyn Transformer>,
) -> Arc<StageRegistry> {
    let mut registry = StageRegistry::empty();
    for detector in detectors {
        registry.register_detector(detector).unwrap();
    }
    registry.set_transformer(Arc::new(
        move |_ctx: &StageContext<'_>| -> anyhow::Result<Arc<dyn Transformer>> {
            Ok(Arc::clone(&transformer))
        },
    ));
    Arc::new(registry)
}
