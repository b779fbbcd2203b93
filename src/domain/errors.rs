//! Domain error types
//!
//! This module defines the error hierarchy for the PII pipeline. Every variant
//! knows the pipeline [`Stage`] it originates from, so callers can report
//! failures per stage without inspecting messages. Collaborator errors
//! (`anyhow::Error`) are flattened to strings at the stage boundary.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage an error originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Configuration merging and validation
    Config,
    /// Chunk wrapping and unwrapping
    Adapter,
    /// Pipeline construction from the stage registry
    Build,
    /// Language routing
    Dispatch,
    /// Detection
    Detect,
    /// Consolidation
    Decide,
    /// Transformation
    Transform,
    /// Document loading
    Load,
    /// Output writing
    Write,
    /// Cancelled run
    Interrupt,
}

impl Stage {
    /// Returns the stage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Adapter => "adapter",
            Stage::Build => "build",
            Stage::Dispatch => "dispatch",
            Stage::Detect => "detect",
            Stage::Decide => "decide",
            Stage::Transform => "transform",
            Stage::Load => "load",
            Stage::Write => "write",
            Stage::Interrupt => "interrupt",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main pipeline error type
///
/// This is the primary error type used throughout the crate. Stage errors are
/// never swallowed: they propagate to the immediate caller unchanged, and the
/// document orchestrator wraps the first one in [`PiiProcessError::DocumentProcess`].
#[derive(Debug, Error)]
pub enum PiiProcessError {
    /// Configuration source unreadable, malformed, or contradictory
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chunk metadata inconsistent with its buffer
    #[error("Adapter error: {0}")]
    Adapter(String),

    /// No pipeline could be built for the language/task selection
    #[error("Pipeline build error: {0}")]
    PipelineBuild(String),

    /// Language not among the configured ones
    #[error("Unsupported language '{lang}' (available: {})", available.join(", "))]
    UnsupportedLanguage { lang: String, available: Vec<String> },

    /// Decision stage returned overlapping instances
    #[error("Consolidation invariant violated in chunk {chunk_id}: {message}")]
    ConsolidationInvariant { chunk_id: String, message: String },

    /// A detection task failed or broke its output contract
    #[error("Detection error in task '{task}': {message}")]
    Detection { task: String, message: String },

    /// Decision engine failure
    #[error("Decision error: {0}")]
    Decision(String),

    /// Transformer failure
    #[error("Transform error: {0}")]
    Transform(String),

    /// Document-level failure wrapping the first stage error
    #[error("Failed to process document '{}': {source}", path.display())]
    DocumentProcess {
        path: PathBuf,
        #[source]
        source: Box<PiiProcessError>,
    },

    /// Input document or record is malformed
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Document could not be loaded
    #[error("Load error: {0}")]
    Load(String),

    /// Output could not be written
    #[error("Write error: {0}")]
    Write(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Processing was cancelled before completion
    #[error("Interrupted: {0}")]
    Interrupted(String),
}

impl PiiProcessError {
    /// Returns the pipeline stage this error originates from
    pub fn stage(&self) -> Stage {
        match self {
            PiiProcessError::Config(_) => Stage::Config,
            PiiProcessError::Adapter(_) => Stage::Adapter,
            PiiProcessError::PipelineBuild(_) => Stage::Build,
            PiiProcessError::UnsupportedLanguage { .. } => Stage::Dispatch,
            PiiProcessError::ConsolidationInvariant { .. } => Stage::Decide,
            PiiProcessError::Detection { .. } => Stage::Detect,
            PiiProcessError::Decision(_) => Stage::Decide,
            PiiProcessError::Transform(_) => Stage::Transform,
            PiiProcessError::DocumentProcess { source, .. } => source.stage(),
            PiiProcessError::InvalidDocument(_) => Stage::Load,
            PiiProcessError::Load(_) => Stage::Load,
            PiiProcessError::Write(_) => Stage::Write,
            PiiProcessError::Io(_) => Stage::Load,
            PiiProcessError::Serialization(_) => Stage::Write,
            PiiProcessError::Interrupted(_) => Stage::Interrupt,
        }
    }

    /// Returns the innermost error, unwrapping document-level wrappers
    pub fn root(&self) -> &PiiProcessError {
        match self {
            PiiProcessError::DocumentProcess { source, .. } => source.root(),
            other => other,
        }
    }

    /// Builds an `UnsupportedLanguage` error from any iterable of languages
    pub fn unsupported_language<I, S>(lang: impl Into<String>, available: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        PiiProcessError::UnsupportedLanguage {
            lang: lang.into(),
            available: available.into_iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Wraps this error in a `DocumentProcess` error for the given path
    pub fn in_document(self, path: impl Into<PathBuf>) -> Self {
        match self {
            wrapped @ PiiProcessError::DocumentProcess { .. } => wrapped,
            other => PiiProcessError::DocumentProcess {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for PiiProcessError {
    fn from(err: std::io::Error) -> Self {
        PiiProcessError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for PiiProcessError {
    fn from(err: serde_json::Error) -> Self {
        PiiProcessError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for PiiProcessError {
    fn from(err: toml::de::Error) -> Self {
        PiiProcessError::Config(format!("TOML parse error: {err}"))
    }
}
