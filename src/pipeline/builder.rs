//! Pipeline builder
//!
//! Binds the three stages for one (language, task selection, configuration)
//! and caches the result for the lifetime of the owning processor.

use super::registry::{StageContext, StageRegistry};
use crate::config::EffectiveConfig;
use crate::decide::DecisionEngine;
use crate::detect::patterns::PatternLibrary;
use crate::detect::DetectorSet;
use crate::domain::errors::PiiProcessError;
use crate::domain::ids::{Language, TaskId};
use crate::domain::result::Result;
use crate::log_pipeline_built;
use crate::transform::Transformer;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Bound stages for one language
///
/// Read-only once built; share it through `Arc`.
pub struct Pipeline {
    lang: Language,
    detectors: DetectorSet,
    decider: Arc<dyn DecisionEngine>,
    transformer: Arc<dyn Transformer>,
}

impl Pipeline {
    /// Pipeline language
    pub fn lang(&self) -> &Language {
        &self.lang
    }

    /// Bound detection tasks
    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    /// Bound decision engine
    pub fn decider(&self) -> &dyn DecisionEngine {
        self.decider.as_ref()
    }

    /// Bound transformer
    pub fn transformer(&self) -> &dyn Transformer {
        self.transformer.as_ref()
    }

    /// Ids of the bound tasks, in execution order
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.detectors.infos().map(|i| i.id.clone()).collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("lang", &self.lang)
            .field("detectors", &self.detectors)
            .field("decider", &self.decider.name())
            .field("transformer", &self.transformer.name())
            .finish()
    }
}

/// Cache key for built pipelines
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    lang: Language,
    tasks: Option<Vec<TaskId>>,
    fingerprint: String,
}

impl PipelineKey {
    fn new(config: &EffectiveConfig, lang: &Language, tasks: Option<&[TaskId]>) -> Self {
        let tasks = tasks.map(|t| {
            let mut sorted = t.to_vec();
            sorted.sort();
            sorted.dedup();
            sorted
        });
        Self {
            lang: lang.clone(),
            tasks,
            fingerprint: config.fingerprint().to_string(),
        }
    }
}

/// Builds and caches pipelines from a [`StageRegistry`]
#[derive(Debug)]
pub struct PipelineBuilder {
    registry: Arc<StageRegistry>,
    cache: HashMap<PipelineKey, Arc<Pipeline>>,
}

impl PipelineBuilder {
    /// Creates a builder over a registry
    pub fn new(registry: Arc<StageRegistry>) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    /// The registry pipelines are built from
    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Number of cached pipelines
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Builds the pipeline for a language, or returns the cached one
    ///
    /// `task_filter` overrides `detect.tasks`. Tasks listed in
    /// `detect.exclude_tasks` are removed afterwards, then the country and
    /// language filters apply.
    ///
    /// # Errors
    ///
    /// Returns `PiiProcessError::PipelineBuild` if a named task does not
    /// exist, if no task is left for the language, or if a stage factory
    /// fails.
    pub fn build(
        &mut self,
        config: &EffectiveConfig,
        lang: &Language,
        task_filter: Option<&[TaskId]>,
    ) -> Result<Arc<Pipeline>> {
        let key = PipelineKey::new(config, lang, task_filter);
        if let Some(pipeline) = self.cache.get(&key) {
            return Ok(Arc::clone(pipeline));
        }

        let pipeline = Arc::new(self.assemble(config, lang, task_filter)?);
        self.cache.insert(key, Arc::clone(&pipeline));
        Ok(pipeline)
    }

    fn assemble(
        &self,
        config: &EffectiveConfig,
        lang: &Language,
        task_filter: Option<&[TaskId]>,
    ) -> Result<Pipeline> {
        let registry = self.registry_for(config)?;
        let detect = config.detect();

        let mut selected: Vec<TaskId> = match task_filter.or(detect.tasks.as_deref()) {
            Some(requested) => {
                let mut ids = BTreeSet::new();
                for id in requested {
                    if registry.task(id.as_str()).is_none() {
                        return Err(unknown_task(id, &registry));
                    }
                    ids.insert(id.clone());
                }
                ids.into_iter().collect()
            }
            None => registry.tasks().map(|t| t.info().id.clone()).collect(),
        };

        for id in &detect.exclude_tasks {
            if registry.task(id.as_str()).is_none() {
                return Err(unknown_task(id, &registry));
            }
        }
        selected.retain(|id| !detect.exclude_tasks.contains(id));

        if let Some(countries) = detect.country.as_ref().and_then(|c| c.for_lang(lang)) {
            selected.retain(|id| {
                registry
                    .task(id.as_str())
                    .map_or(false, |t| t.info().matches_country(countries))
            });
        }

        selected.retain(|id| {
            let keep = registry
                .task(id.as_str())
                .map_or(false, |t| t.info().languages.supports(lang));
            if !keep {
                tracing::debug!(task = %id, lang = %lang, "Skipping task without language support");
            }
            keep
        });

        if selected.is_empty() {
            return Err(PiiProcessError::PipelineBuild(format!(
                "no detection task available for language '{lang}'"
            )));
        }

        let ctx = StageContext { lang, config };
        let mut detectors = Vec::with_capacity(selected.len());
        for id in &selected {
            if let Some(task) = registry.task(id.as_str()) {
                let detector = task.instantiate(&ctx).map_err(|e| {
                    PiiProcessError::PipelineBuild(format!("task '{id}' failed to build: {e:#}"))
                })?;
                detectors.push(detector);
            }
        }

        let decider = registry.build_decider(&ctx).map_err(|e| {
            PiiProcessError::PipelineBuild(format!("decision engine failed to build: {e:#}"))
        })?;
        let transformer = registry.build_transformer(&ctx).map_err(|e| {
            PiiProcessError::PipelineBuild(format!("transformer failed to build: {e:#}"))
        })?;

        log_pipeline_built!(lang, detectors.len(), decider.name());

        Ok(Pipeline {
            lang: lang.clone(),
            detectors: DetectorSet::new(detectors),
            decider,
            transformer,
        })
    }

    /// The shared registry, extended with the tasks the configuration defines
    fn registry_for(&self, config: &EffectiveConfig) -> Result<Cow<'_, StageRegistry>> {
        let detect = config.detect();
        if detect.patterns.is_empty() && detect.pattern_library.is_none() {
            return Ok(Cow::Borrowed(self.registry.as_ref()));
        }

        let mut registry = self.registry.as_ref().clone();
        if let Some(path) = &detect.pattern_library {
            let library = PatternLibrary::from_file(path)
                .map_err(|e| PiiProcessError::PipelineBuild(format!("{e:#}")))?;
            registry.register_patterns(&library)?;
        }
        if !detect.patterns.is_empty() {
            let library = PatternLibrary::from_definitions(detect.patterns.clone())
                .map_err(|e| PiiProcessError::PipelineBuild(format!("{e:#}")))?;
            registry.register_patterns(&library)?;
        }
        Ok(Cow::Owned(registry))
    }
}

fn unknown_task(id: &TaskId, registry: &StageRegistry) -> PiiProcessError {
    let known: Vec<_> = registry.tasks().map(|t| t.info().id.as_str()).collect();
    PiiProcessError::PipelineBuild(format!(
        "unknown task '{id}' (registered: {})",
        known.join(", ")
    ))
}
