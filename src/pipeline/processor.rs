//! Single-language text processor
//!
//! [`PiiTextProcessor`] runs chunks of one fixed language through
//! detect → decide → transform. The configuration is merged and the pipeline
//! built once, at construction.

use super::adapter::{unwrap, validate_markers, wrap};
use super::builder::{Pipeline, PipelineBuilder};
use super::registry::StageRegistry;
use super::stats::StageTimings;
use crate::config::{merge_configs, ConfigSource, CountryFilter, EffectiveConfig};
use crate::decide::check_consolidated;
use crate::domain::chunk::DocumentChunk;
use crate::domain::errors::PiiProcessError;
use crate::domain::ids::{Language, PiiType, TaskId};
use crate::domain::pii::PiiInstance;
use crate::domain::result::Result;
use crate::transform::{Policy, PolicyMap};
use crate::{log_chunk_processed, log_stage_failure};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Construction options shared by the single and multi-language processors
#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
    /// Default policy; overrides `transform.default_policy`
    pub default_policy: Option<Policy>,
    /// Configuration sources, merged in order
    pub config: Vec<ConfigSource>,
    /// Task allow-list; overrides `detect.tasks`
    pub tasks: Option<Vec<TaskId>>,
    /// Country filter; overrides `detect.country`
    pub country: Option<CountryFilter>,
    /// Replace the decision engine with a pass-through
    pub skip_decision: bool,
    /// Leave chunks untransformed; detection and statistics still run
    pub skip_transform: bool,
    /// Registry to build from instead of the built-in one
    pub registry: Option<Arc<StageRegistry>>,
}

impl ProcessorOptions {
    /// Options with the given default policy
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.default_policy = Some(policy);
        self
    }

    /// Appends a configuration source
    pub fn with_config(mut self, source: impl Into<ConfigSource>) -> Self {
        self.config.push(source.into());
        self
    }

    /// Restricts the detection tasks
    pub fn with_tasks<I, S>(mut self, tasks: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tasks = tasks
            .into_iter()
            .map(|t| TaskId::new(t).map_err(PiiProcessError::Config))
            .collect::<Result<Vec<_>>>()?;
        self.tasks = Some(tasks);
        Ok(self)
    }

    /// Restricts country-specific tasks, for every language
    pub fn with_country<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.country = Some(CountryFilter::All(
            countries.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Restricts country-specific tasks per language
    ///
    /// Languages missing from the map are not filtered.
    pub fn with_country_map<I, L, C>(mut self, countries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (L, C)>,
        L: AsRef<str>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (lang, codes) in countries {
            let lang = Language::new(lang.as_ref()).map_err(PiiProcessError::Config)?;
            map.entry(lang)
                .or_insert_with(Vec::new)
                .extend(codes.into_iter().map(Into::into));
        }
        self.country = Some(CountryFilter::PerLanguage(map));
        Ok(self)
    }

    /// Disables the decision engine
    pub fn skip_decision(mut self, skip: bool) -> Self {
        self.skip_decision = skip;
        self
    }

    /// Enables or disables the transform stage
    ///
    /// With the stage disabled chunks come back unchanged while instances,
    /// statistics and kept PII are still produced.
    pub fn transform(mut self, enabled: bool) -> Self {
        self.skip_transform = !enabled;
        self
    }

    /// Builds from a custom registry
    pub fn with_registry(mut self, registry: Arc<StageRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Configuration sources including the ones implied by the options
    pub fn sources(&self) -> Vec<ConfigSource> {
        let mut sources = self.config.clone();
        if let Some(country) = &self.country {
            // replaces a configured filter instead of merging into it
            sources.push(ConfigSource::from(json!({"detect": {"country": null}})));
            sources.push(ConfigSource::from(json!({"detect": {"country": country}})));
        }
        if self.skip_decision {
            sources.push(ConfigSource::from(json!({"decide": {"enabled": false}})));
        }
        if self.skip_transform {
            sources.push(ConfigSource::from(json!({"transform": {"enabled": false}})));
        }
        sources
    }

    pub(crate) fn registry(&self) -> Result<Arc<StageRegistry>> {
        match &self.registry {
            Some(registry) => Ok(Arc::clone(registry)),
            None => Ok(Arc::new(StageRegistry::builtin()?)),
        }
    }
}

/// Outcome of processing one chunk
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    /// Transformed chunk
    pub chunk: DocumentChunk,
    /// Consolidated instances, sorted by offset, in input coordinates
    pub instances: Vec<PiiInstance>,
    /// Stage timings
    pub timings: StageTimings,
}

impl ProcessedChunk {
    /// Instance counts per PII type
    pub fn counts(&self) -> BTreeMap<PiiType, u64> {
        let mut counts = BTreeMap::new();
        for instance in &self.instances {
            *counts.entry(instance.pii_type.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Processor for text in one language
#[derive(Debug)]
pub struct PiiTextProcessor {
    lang: Language,
    config: Arc<EffectiveConfig>,
    pipeline: Arc<Pipeline>,
    policies: PolicyMap,
}

impl PiiTextProcessor {
    /// Creates a processor for `lang`
    ///
    /// # Errors
    ///
    /// Returns `PiiProcessError::Config` for an invalid language tag or
    /// configuration, and `PiiProcessError::PipelineBuild` if no pipeline can
    /// be built for the language.
    ///
    /// # Examples
    ///
    /// ```
    /// use pii_process::pipeline::{PiiTextProcessor, ProcessorOptions};
    /// use pii_process::transform::Policy;
    ///
    /// let processor =
    ///     PiiTextProcessor::new("en", ProcessorOptions::default().with_policy(Policy::Redact))?;
    /// let out = processor.process("Write to jane@example.com")?;
    /// assert_eq!(out, "Write to <PII>");
    /// # Ok::<(), pii_process::domain::PiiProcessError>(())
    /// ```
    pub fn new(lang: &str, options: ProcessorOptions) -> Result<Self> {
        let lang = Language::new(lang).map_err(PiiProcessError::Config)?;
        let config = Arc::new(merge_configs(&options.sources())?);
        let mut builder = PipelineBuilder::new(options.registry()?);
        Self::with_builder(
            lang,
            config,
            &mut builder,
            options.tasks.as_deref(),
            options.default_policy.as_ref(),
        )
    }

    pub(crate) fn with_builder(
        lang: Language,
        config: Arc<EffectiveConfig>,
        builder: &mut PipelineBuilder,
        tasks: Option<&[TaskId]>,
        default_policy: Option<&Policy>,
    ) -> Result<Self> {
        let pipeline = builder.build(&config, &lang, tasks)?;
        let policies = PolicyMap::resolve(config.transform(), default_policy);
        Ok(Self {
            lang,
            config,
            pipeline,
            policies,
        })
    }

    /// Processor language
    pub fn lang(&self) -> &Language {
        &self.lang
    }

    /// Effective configuration
    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// Bound pipeline
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Effective policy map
    pub fn policies(&self) -> &PolicyMap {
        &self.policies
    }

    /// Ids of the bound detection tasks
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.pipeline.task_ids()
    }

    /// Processes a raw buffer
    pub fn process(&self, buffer: &str) -> Result<String> {
        let chunk = wrap(buffer, &self.lang, None)?;
        let processed = self.process_chunk(chunk)?;
        unwrap(processed.chunk)
    }

    /// Processes a chunk
    ///
    /// # Errors
    ///
    /// Fails with the error of the first stage that fails. The chunk's
    /// language must be the processor's language.
    pub fn process_chunk(&self, chunk: DocumentChunk) -> Result<ProcessedChunk> {
        let chunk_id = chunk.id().clone();
        self.run(chunk).map_err(|e| {
            log_stage_failure!(e, chunk_id);
            e
        })
    }

    fn run(&self, chunk: DocumentChunk) -> Result<ProcessedChunk> {
        if chunk.lang() != &self.lang {
            return Err(PiiProcessError::unsupported_language(
                chunk.lang().as_str(),
                [&self.lang],
            ));
        }
        validate_markers(&chunk.data, &chunk.markers)?;

        let mut timings = StageTimings::default();

        let started = Instant::now();
        let detected = self.pipeline.detectors().detect(&chunk)?;
        timings.detect = started.elapsed();

        let started = Instant::now();
        let decider = self.pipeline.decider();
        let mut instances = decider.decide(&chunk, detected).map_err(|e| {
            PiiProcessError::Decision(format!("engine '{}' failed: {e:#}", decider.name()))
        })?;
        check_consolidated(&chunk, &mut instances)?;
        timings.decide = started.elapsed();

        let started = Instant::now();
        let transformer = self.pipeline.transformer();
        let output = transformer
            .transform(&chunk, &instances, &self.policies)
            .map_err(|e| {
                PiiProcessError::Transform(format!(
                    "transformer '{}' failed: {e:#}",
                    transformer.name()
                ))
            })?;
        if output.id() != chunk.id() || output.lang() != chunk.lang() {
            return Err(PiiProcessError::Transform(format!(
                "transformer '{}' changed the identity of chunk {}",
                transformer.name(),
                chunk.id()
            )));
        }
        validate_markers(&output.data, &output.markers)?;
        timings.transform = started.elapsed();

        log_chunk_processed!(chunk.id(), self.lang, instances.len());

        Ok(ProcessedChunk {
            chunk: output,
            instances,
            timings,
        })
    }
}
