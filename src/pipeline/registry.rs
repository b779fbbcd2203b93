//! Stage registry
//!
//! Explicit registration table for detection tasks and the factories that
//! build decision engines and transformers. Tasks are kept sorted by id so
//! discovery order is deterministic.

use crate::config::EffectiveConfig;
use crate::decide::{DecisionEngine, OverlapDecider, PassthroughDecider};
use crate::detect::patterns::PatternLibrary;
use crate::detect::regex::RegexDetector;
use crate::detect::{Detector, TaskInfo};
use crate::domain::errors::PiiProcessError;
use crate::domain::ids::{Language, TaskId};
use crate::domain::result::Result;
use crate::transform::{PassthroughTransformer, PolicyTransformer, Transformer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// What a stage factory is building for
pub struct StageContext<'a> {
    /// Pipeline language
    pub lang: &'a Language,
    /// Effective configuration
    pub config: &'a EffectiveConfig,
}

/// Builds a detection task for a pipeline
pub type TaskFactory =
    Arc<dyn Fn(&StageContext<'_>) -> anyhow::Result<Arc<dyn Detector>> + Send + Sync>;

/// Builds the decision engine for a pipeline
pub type DecisionFactory =
    Arc<dyn Fn(&StageContext<'_>) -> anyhow::Result<Arc<dyn DecisionEngine>> + Send + Sync>;

/// Builds the transformer for a pipeline
pub type TransformerFactory =
    Arc<dyn Fn(&StageContext<'_>) -> anyhow::Result<Arc<dyn Transformer>> + Send + Sync>;

/// A registered detection task
#[derive(Clone)]
pub struct RegisteredTask {
    info: TaskInfo,
    factory: TaskFactory,
}

impl RegisteredTask {
    /// Task metadata
    pub fn info(&self) -> &TaskInfo {
        &self.info
    }

    /// Instantiates the task
    pub fn instantiate(&self, ctx: &StageContext<'_>) -> anyhow::Result<Arc<dyn Detector>> {
        (self.factory)(ctx)
    }
}

/// Registration table for pipeline stages
#[derive(Clone)]
pub struct StageRegistry {
    tasks: BTreeMap<TaskId, RegisteredTask>,
    decider: DecisionFactory,
    transformer: TransformerFactory,
}

impl StageRegistry {
    /// Registry without tasks, using the built-in decision engine and
    /// transformer
    pub fn empty() -> Self {
        Self {
            tasks: BTreeMap::new(),
            decider: Arc::new(default_decider),
            transformer: Arc::new(
                |_ctx: &StageContext<'_>| -> anyhow::Result<Arc<dyn Transformer>> {
                    Ok(Arc::new(PolicyTransformer::new()))
                },
            ),
        }
    }

    /// Registry loaded with the built-in pattern library
    pub fn builtin() -> Result<Self> {
        let library = PatternLibrary::builtin().map_err(|e| {
            PiiProcessError::PipelineBuild(format!("Failed to load built-in patterns: {e:#}"))
        })?;
        let mut registry = Self::empty();
        registry.register_patterns(&library)?;
        Ok(registry)
    }

    /// Registers a task factory
    ///
    /// # Errors
    ///
    /// Returns `PiiProcessError::PipelineBuild` if the id is already taken.
    pub fn register_task(&mut self, info: TaskInfo, factory: TaskFactory) -> Result<()> {
        if self.tasks.contains_key(&info.id) {
            return Err(PiiProcessError::PipelineBuild(format!(
                "task '{}' is already registered",
                info.id
            )));
        }
        self.tasks
            .insert(info.id.clone(), RegisteredTask { info, factory });
        Ok(())
    }

    /// Registers a ready-made detector shared by every pipeline
    pub fn register_detector(&mut self, detector: Arc<dyn Detector>) -> Result<()> {
        let info = detector.info().clone();
        self.register_task(
            info,
            Arc::new(
                move |_ctx: &StageContext<'_>| -> anyhow::Result<Arc<dyn Detector>> {
                    Ok(Arc::clone(&detector))
                },
            ),
        )
    }

    /// Registers one regex task per pattern definition
    pub fn register_patterns(&mut self, library: &PatternLibrary) -> Result<()> {
        for def in library.definitions() {
            let detector = RegexDetector::from_definition(def).map_err(|e| {
                PiiProcessError::PipelineBuild(format!("pattern '{}': {e:#}", def.name))
            })?;
            self.register_detector(Arc::new(detector))?;
        }
        Ok(())
    }

    /// Replaces the decision engine factory
    pub fn set_decider(&mut self, factory: DecisionFactory) {
        self.decider = factory;
    }

    /// Replaces the transformer factory
    pub fn set_transformer(&mut self, factory: TransformerFactory) {
        self.transformer = factory;
    }

    /// Registered tasks, sorted by id
    pub fn tasks(&self) -> impl Iterator<Item = &RegisteredTask> {
        self.tasks.values()
    }

    /// Looks up a task
    pub fn task(&self, id: &str) -> Option<&RegisteredTask> {
        self.tasks.get(id)
    }

    /// Number of registered tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task is registered
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn build_decider(
        &self,
        ctx: &StageContext<'_>,
    ) -> anyhow::Result<Arc<dyn DecisionEngine>> {
        if !ctx.config.decide().enabled {
            return Ok(Arc::new(PassthroughDecider));
        }
        (self.decider)(ctx)
    }

    pub(crate) fn build_transformer(
        &self,
        ctx: &StageContext<'_>,
    ) -> anyhow::Result<Arc<dyn Transformer>> {
        if !ctx.config.transform().enabled {
            return Ok(Arc::new(PassthroughTransformer));
        }
        (self.transformer)(ctx)
    }
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRegistry")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn default_decider(ctx: &StageContext<'_>) -> anyhow::Result<Arc<dyn DecisionEngine>> {
    let decide = ctx.config.decide();
    Ok(Arc::new(OverlapDecider::new(decide.overlap, decide.min_score)))
}
