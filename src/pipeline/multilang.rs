//! Multi-language dispatcher
//!
//! [`MultiPiiTextProcessor`] holds one [`PiiTextProcessor`] per configured
//! language, routes each call to the matching one and folds the per-call
//! counts into a cumulative [`StatsReport`].

use super::adapter::{unwrap, wrap};
use super::builder::PipelineBuilder;
use super::processor::{PiiTextProcessor, ProcessedChunk, ProcessorOptions};
use super::stats::StatsReport;
use crate::config::{merge_configs, EffectiveConfig};
use crate::domain::chunk::DocumentChunk;
use crate::domain::errors::PiiProcessError;
use crate::domain::ids::{Language, TaskId};
use crate::domain::pii::PiiInstance;
use crate::domain::result::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Dispatches text to per-language processors
#[derive(Debug)]
pub struct MultiPiiTextProcessor {
    processors: BTreeMap<Language, PiiTextProcessor>,
    config: Arc<EffectiveConfig>,
    stats: StatsReport,
    keep_pii: bool,
    pii: Vec<PiiInstance>,
    detectors: BTreeSet<TaskId>,
}

impl MultiPiiTextProcessor {
    /// Builds one processor per language
    ///
    /// The configuration is merged once and every pipeline is built before
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns `PiiProcessError::Config` for an empty list, an invalid or
    /// duplicate language, or an invalid configuration, and
    /// `PiiProcessError::PipelineBuild` if a language has no pipeline.
    pub fn new<I, S>(languages: I, options: ProcessorOptions) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut langs = Vec::new();
        for tag in languages {
            let lang = Language::new(tag.as_ref()).map_err(PiiProcessError::Config)?;
            if langs.contains(&lang) {
                return Err(PiiProcessError::Config(format!(
                    "Duplicate language '{lang}'"
                )));
            }
            langs.push(lang);
        }
        if langs.is_empty() {
            return Err(PiiProcessError::Config(
                "At least one language is required".to_string(),
            ));
        }

        let config = Arc::new(merge_configs(&options.sources())?);
        let mut builder = PipelineBuilder::new(options.registry()?);

        let mut processors = BTreeMap::new();
        for lang in langs {
            let processor = PiiTextProcessor::with_builder(
                lang.clone(),
                Arc::clone(&config),
                &mut builder,
                options.tasks.as_deref(),
                options.default_policy.as_ref(),
            )?;
            processors.insert(lang, processor);
        }

        tracing::info!(
            languages = processors.len(),
            pipelines = builder.cached(),
            "Multi-language processor ready"
        );

        let mut stats = StatsReport::new();
        for lang in processors.keys() {
            stats.add_language(lang);
        }

        Ok(Self {
            processors,
            config,
            stats,
            keep_pii: false,
            pii: Vec::new(),
            detectors: BTreeSet::new(),
        })
    }

    /// Keeps every consolidated instance, available through [`Self::pii`]
    pub fn with_keep_pii(mut self, keep: bool) -> Self {
        self.keep_pii = keep;
        self
    }

    /// Configured languages, sorted
    pub fn languages(&self) -> impl Iterator<Item = &Language> {
        self.processors.keys()
    }

    /// Whether `lang` is configured
    pub fn supports(&self, lang: &str) -> bool {
        self.processor(lang).is_some()
    }

    /// Processor for one language
    pub fn processor(&self, lang: &str) -> Option<&PiiTextProcessor> {
        let lang = Language::new(lang).ok()?;
        self.processors.get(&lang)
    }

    /// Shared effective configuration
    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// Processes a buffer in the given language
    pub fn process(&mut self, buffer: &str, lang: &str) -> Result<String> {
        let lang = self.resolve(lang)?.lang().clone();
        let chunk = wrap(buffer, &lang, None)?;
        let processed = self.process_chunk(chunk)?;
        unwrap(processed.chunk)
    }

    /// Processes a chunk with the processor of its own language
    pub fn process_chunk(&mut self, chunk: DocumentChunk) -> Result<ProcessedChunk> {
        let processed = self.resolve(chunk.lang().as_str())?.process_chunk(chunk)?;
        self.record(&processed);
        Ok(processed)
    }

    fn resolve(&self, lang: &str) -> Result<&PiiTextProcessor> {
        self.processor(lang).ok_or_else(|| {
            PiiProcessError::unsupported_language(lang, self.processors.keys())
        })
    }

    fn record(&mut self, processed: &ProcessedChunk) {
        let lang = processed.chunk.lang();
        self.stats.record(lang, &processed.counts(), &processed.timings);
        self.detectors
            .extend(processed.instances.iter().map(|i| i.detector.clone()));

        if self.keep_pii {
            let docid = processed.chunk.document_id().cloned();
            self.pii.extend(processed.instances.iter().cloned().map(|mut i| {
                if let Some(docid) = &docid {
                    i.fields.insert("docid".to_string(), docid.clone());
                }
                i
            }));
        }
    }

    /// Snapshot of the cumulative statistics
    pub fn stats(&self) -> StatsReport {
        self.stats.clone()
    }

    /// Instances kept so far
    pub fn pii(&self) -> &[PiiInstance] {
        &self.pii
    }

    /// Takes the kept instances, leaving the collection empty
    pub fn take_pii(&mut self) -> Vec<PiiInstance> {
        std::mem::take(&mut self.pii)
    }

    /// Tasks that produced at least one instance
    pub fn detectors(&self) -> &BTreeSet<TaskId> {
        &self.detectors
    }

    /// Bound tasks per language
    pub fn tasks(&self) -> BTreeMap<Language, Vec<TaskId>> {
        self.processors
            .iter()
            .map(|(lang, p)| (lang.clone(), p.task_ids()))
            .collect()
    }
}
