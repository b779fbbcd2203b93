//! Pattern library for regex detection tasks
//!
//! A pattern library is a TOML document with one `[patterns.<task_id>]` table
//! per task. The built-in library is embedded at compile time; extra
//! libraries can be loaded from disk or supplied inline through the `detect`
//! configuration section.

use crate::domain::ids::PiiType;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Pattern definition for one detection task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefinition {
    /// Task id. Filled from the table key when loaded from TOML.
    #[serde(default)]
    pub name: String,
    /// Regex patterns for this task
    pub patterns: Vec<String>,
    /// Confidence score (0.0 - 1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// PII type emitted for every match
    pub category: PiiType,
    /// Supported languages; empty or `any` means all
    #[serde(default)]
    pub languages: Vec<String>,
    /// Country the identifier belongs to
    #[serde(default)]
    pub country: Option<String>,
    /// Human readable description
    #[serde(default)]
    pub description: Option<String>,
}

impl PatternDefinition {
    /// Checks that the definition is usable: named, non-empty and compilable
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("pattern definition without a name");
        }
        if self.patterns.is_empty() {
            anyhow::bail!("pattern '{}' has no regex", self.name);
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            anyhow::bail!(
                "pattern '{}' confidence {} is outside [0, 1]",
                self.name,
                self.confidence
            );
        }
        self.compile().map(|_| ())
    }

    /// Compiles every regex of the definition
    pub fn compile(&self) -> Result<Vec<Regex>> {
        self.patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .with_context(|| format!("Invalid regex in pattern '{}': {p}", self.name))
            })
            .collect()
    }
}

fn default_confidence() -> f32 {
    1.0
}

/// TOML container
#[derive(Debug, Deserialize)]
struct PatternFile {
    #[serde(default)]
    patterns: BTreeMap<String, PatternDefinition>,
}

/// Ordered collection of pattern definitions
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    definitions: Vec<PatternDefinition>,
}

impl PatternLibrary {
    /// Loads a pattern library from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read pattern library: {}",
                path.as_ref().display()
            )
        })?;

        Self::from_toml(&content)
    }

    /// Parses a pattern library from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: PatternFile =
            toml::from_str(content).context("Failed to parse pattern library TOML")?;

        let definitions = file
            .patterns
            .into_iter()
            .map(|(name, mut def)| {
                def.name = name;
                def
            })
            .collect();
        Self::from_definitions(definitions)
    }

    /// Builds a library from definitions, validating each one
    pub fn from_definitions(mut definitions: Vec<PatternDefinition>) -> Result<Self> {
        for def in &definitions {
            def.validate()?;
        }
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = definitions.windows(2).find(|w| w[0].name == w[1].name) {
            anyhow::bail!("duplicate pattern '{}'", pair[0].name);
        }
        Ok(Self { definitions })
    }

    /// Built-in pattern library
    pub fn builtin() -> Result<Self> {
        let default_toml = include_str!("../../../patterns/pii_patterns.toml");
        Self::from_toml(default_toml)
    }

    /// Definitions, sorted by name
    pub fn definitions(&self) -> &[PatternDefinition] {
        &self.definitions
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the library is empty
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
