//! PII detection module
//!
//! Provides the trait-based [`Detector`] interface implemented by detection
//! tasks, and the [`DetectorSet`] that runs every task bound to a pipeline and
//! checks each task's output before it reaches the decision stage.

pub mod patterns;
pub mod regex;

use crate::domain::chunk::DocumentChunk;
use crate::domain::errors::PiiProcessError;
use crate::domain::ids::{Language, PiiType, TaskId};
use crate::domain::pii::{DetectionMethod, PiiInstance};
use crate::domain::result::Result;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Trait for PII detection tasks
///
/// Implementations return instances whose offsets lie inside the chunk text
/// and which do not overlap each other.
pub trait Detector: Send + Sync {
    /// Task metadata
    fn info(&self) -> &TaskInfo;

    /// Detect PII in a chunk
    fn detect(&self, chunk: &DocumentChunk) -> anyhow::Result<Vec<PiiInstance>>;
}

/// Languages a task can process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageSupport {
    /// Language independent
    Any,
    /// Only the listed languages
    Only(BTreeSet<Language>),
}

impl LanguageSupport {
    /// Builds language support from raw tags; empty or `any` means all
    pub fn from_tags<I, S>(tags: I) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut langs = BTreeSet::new();
        for tag in tags {
            let tag = tag.as_ref();
            if tag.eq_ignore_ascii_case("any") {
                return Ok(LanguageSupport::Any);
            }
            langs.insert(Language::new(tag)?);
        }
        if langs.is_empty() {
            Ok(LanguageSupport::Any)
        } else {
            Ok(LanguageSupport::Only(langs))
        }
    }

    /// Whether `lang` is supported; a regional tag matches its base language
    pub fn supports(&self, lang: &Language) -> bool {
        match self {
            LanguageSupport::Any => true,
            LanguageSupport::Only(langs) => {
                langs.contains(lang) || langs.iter().any(|l| l.as_str() == lang.base())
            }
        }
    }
}

impl fmt::Display for LanguageSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageSupport::Any => f.write_str("any"),
            LanguageSupport::Only(langs) => {
                let tags: Vec<_> = langs.iter().map(Language::as_str).collect();
                f.write_str(&tags.join(","))
            }
        }
    }
}

/// Metadata describing a detection task
#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    /// Task id
    pub id: TaskId,
    /// PII types the task emits
    pub pii_types: Vec<PiiType>,
    /// Supported languages
    pub languages: LanguageSupport,
    /// Country the task is specific to
    pub country: Option<String>,
    /// Detection method
    pub method: DetectionMethod,
    /// Human readable description
    pub description: String,
}

impl TaskInfo {
    /// Whether the task passes a country filter
    ///
    /// Tasks without a country always pass.
    pub fn matches_country(&self, countries: &[String]) -> bool {
        match &self.country {
            None => true,
            Some(c) => countries.iter().any(|x| x.eq_ignore_ascii_case(c)),
        }
    }
}

/// The detection tasks bound to one pipeline
#[derive(Clone, Default)]
pub struct DetectorSet {
    detectors: Vec<Arc<dyn Detector>>,
}

impl DetectorSet {
    /// Creates a set from bound detectors
    pub fn new(detectors: Vec<Arc<dyn Detector>>) -> Self {
        Self { detectors }
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    /// Whether the set holds no task
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Task metadata, in execution order
    pub fn infos(&self) -> impl Iterator<Item = &TaskInfo> {
        self.detectors.iter().map(|d| d.info())
    }

    /// Runs every task over the chunk
    ///
    /// Each task's output is checked on its own: offsets in bounds and on
    /// character boundaries, non-empty spans, no overlap within the task.
    /// Instances from different tasks may overlap.
    pub fn detect(&self, chunk: &DocumentChunk) -> Result<Vec<PiiInstance>> {
        let mut all = Vec::new();
        for detector in &self.detectors {
            let task = &detector.info().id;
            let mut found = detector
                .detect(chunk)
                .map_err(|e| PiiProcessError::Detection {
                    task: task.to_string(),
                    message: format!("{e:#}"),
                })?;
            check_task_output(chunk, task, &mut found)?;
            all.extend(found);
        }
        Ok(all)
    }
}

impl fmt::Debug for DetectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.detectors.iter().map(|d| d.info().id.as_str()))
            .finish()
    }
}

fn check_task_output(
    chunk: &DocumentChunk,
    task: &TaskId,
    found: &mut [PiiInstance],
) -> Result<()> {
    let text = chunk.data.as_str();
    let fail = |message: String| PiiProcessError::Detection {
        task: task.to_string(),
        message,
    };

    for instance in found.iter_mut() {
        if instance.is_empty() {
            return Err(fail(format!(
                "empty span [{}, {})",
                instance.start, instance.end
            )));
        }
        if instance.end > text.len() {
            return Err(fail(format!(
                "span [{}, {}) outside chunk of length {}",
                instance.start,
                instance.end,
                text.len()
            )));
        }
        if !text.is_char_boundary(instance.start) || !text.is_char_boundary(instance.end) {
            return Err(fail(format!(
                "span [{}, {}) splits a character",
                instance.start, instance.end
            )));
        }
        if instance.value.is_empty() {
            instance.value = text[instance.start..instance.end].to_string();
        }
        instance.chunk_id = Some(chunk.id().clone());
    }

    found.sort_by_key(|i| (i.start, i.end));
    if let Some(pair) = found.windows(2).find(|w| w[0].overlaps(&w[1])) {
        return Err(fail(format!(
            "overlapping spans [{}, {}) and [{}, {})",
            pair[0].start, pair[0].end, pair[1].start, pair[1].end
        )));
    }
    Ok(())
}
