//! Configuration schema definitions
//!
//! Typed views of the three stage sections of an effective configuration.
//! Keys a section does not recognize are kept in its `options` map and passed
//! through to the owning collaborator.

use crate::decide::OverlapPolicy;
use crate::detect::patterns::PatternDefinition;
use crate::domain::ids::{Language, PiiType, TaskId};
use crate::transform::policy::Policy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Merged, validated configuration shared by every stage of a processor
///
/// Immutable once built; share it through `Arc`.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    detect: DetectConfig,
    decide: DecideConfig,
    transform: TransformConfig,
    raw: Value,
    fingerprint: String,
}

impl EffectiveConfig {
    pub(crate) fn new(
        detect: DetectConfig,
        decide: DecideConfig,
        transform: TransformConfig,
        raw: Value,
        fingerprint: String,
    ) -> Self {
        Self {
            detect,
            decide,
            transform,
            raw,
            fingerprint,
        }
    }

    /// Detection section
    pub fn detect(&self) -> &DetectConfig {
        &self.detect
    }

    /// Decision section
    pub fn decide(&self) -> &DecideConfig {
        &self.decide
    }

    /// Transformation section
    pub fn transform(&self) -> &TransformConfig {
        &self.transform
    }

    /// Merged configuration as JSON
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// SHA-256 of the merged configuration
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Validates every section
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.detect.validate()?;
        self.decide.validate()?;
        self.transform.validate()?;
        Ok(())
    }
}

/// Detection section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Allow-list of task ids
    #[serde(default)]
    pub tasks: Option<Vec<TaskId>>,

    /// Deny-list of task ids
    #[serde(default)]
    pub exclude_tasks: Vec<TaskId>,

    /// Country filter for country-specific tasks
    #[serde(default)]
    pub country: Option<CountryFilter>,

    /// Extra regex tasks
    #[serde(default)]
    pub patterns: Vec<PatternDefinition>,

    /// Extra TOML pattern library
    #[serde(default)]
    pub pattern_library: Option<PathBuf>,

    /// Options passed through to detection tasks
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl DetectConfig {
    fn validate(&self) -> Result<(), String> {
        if self.tasks.is_some() && !self.exclude_tasks.is_empty() {
            return Err("detect.tasks and detect.exclude_tasks are mutually exclusive".to_string());
        }

        for def in &self.patterns {
            def.validate()
                .map_err(|e| format!("Invalid detect.patterns entry: {e:#}"))?;
        }

        if let Some(path) = &self.pattern_library {
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                return Err(format!(
                    "detect.pattern_library must be a .toml file: {}",
                    path.display()
                ));
            }
            if !path.exists() {
                return Err(format!(
                    "detect.pattern_library not found: {}",
                    path.display()
                ));
            }
        }

        if let Some(country) = &self.country {
            country.validate()?;
        }
        Ok(())
    }
}

/// Countries that country-specific tasks are restricted to
///
/// Either one list applied to every language, or a list per language. In the
/// per-language form a language without an entry is not filtered, and an
/// entry for a base language (`pt`) also covers its regional tags (`pt-br`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountryFilter {
    /// Same countries for every language
    All(Vec<String>),
    /// Countries keyed by language tag
    PerLanguage(BTreeMap<Language, Vec<String>>),
}

impl CountryFilter {
    /// Countries that apply to `lang`; `None` means no filtering
    pub fn for_lang(&self, lang: &Language) -> Option<&[String]> {
        match self {
            CountryFilter::All(countries) => Some(countries),
            CountryFilter::PerLanguage(map) => map
                .get(lang)
                .or_else(|| map.get(lang.base()))
                .map(Vec::as_slice),
        }
    }

    fn validate(&self) -> Result<(), String> {
        let empty = |countries: &[String]| countries.iter().any(|c| c.trim().is_empty());
        match self {
            CountryFilter::All(countries) if empty(countries) => {
                Err("detect.country cannot contain empty codes".to_string())
            }
            CountryFilter::PerLanguage(map) => match map.iter().find(|(_, c)| empty(c)) {
                Some((lang, _)) => Err(format!(
                    "detect.country.{lang} cannot contain empty codes"
                )),
                None => Ok(()),
            },
            CountryFilter::All(_) => Ok(()),
        }
    }
}

impl fmt::Display for CountryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountryFilter::All(countries) => f.write_str(&countries.join(", ")),
            CountryFilter::PerLanguage(map) => {
                let parts: Vec<_> = map
                    .iter()
                    .map(|(lang, countries)| format!("{lang}: {}", countries.join(",")))
                    .collect();
                f.write_str(&parts.join("; "))
            }
        }
    }
}

/// Decision section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideConfig {
    /// Run the configured decision engine
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Overlap resolution policy
    #[serde(default)]
    pub overlap: OverlapPolicy,

    /// Minimum score for scored instances
    #[serde(default)]
    pub min_score: f32,

    /// Options passed through to the decision engine
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Default for DecideConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            overlap: OverlapPolicy::default(),
            min_score: 0.0,
            options: Map::new(),
        }
    }
}

impl DecideConfig {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(format!(
                "decide.min_score must be within [0, 1], got {}",
                self.min_score
            ));
        }
        Ok(())
    }
}

/// Transformation section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Run the transformer; when disabled chunks come back unchanged
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Policy for types without an override
    #[serde(default)]
    pub default_policy: Option<Policy>,

    /// Per-type policy overrides
    #[serde(default)]
    pub policy: BTreeMap<PiiType, Policy>,

    /// Per-type values for the placeholder policy
    #[serde(default)]
    pub placeholder: BTreeMap<PiiType, String>,

    /// Options passed through to the transformer
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_policy: None,
            policy: BTreeMap::new(),
            placeholder: BTreeMap::new(),
            options: Map::new(),
        }
    }
}

impl TransformConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some((pii_type, _)) = self.placeholder.iter().find(|(_, v)| v.is_empty()) {
            return Err(format!("transform.placeholder.{pii_type} cannot be empty"));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

impl LoggingConfig {
    /// File logging into `dir`
    pub fn to_dir(dir: impl Into<String>) -> Self {
        Self {
            local_enabled: true,
            local_path: dir.into(),
            ..Self::default()
        }
    }

    /// Validates the logging settings
    pub fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_passthrough_options() {
        let cfg: DetectConfig =
            serde_json::from_value(json!({"tasks": ["email_address"], "threshold": 3})).unwrap();
        assert_eq!(cfg.tasks.as_ref().unwrap()[0].as_str(), "email_address");
        assert_eq!(cfg.options["threshold"], 3);
    }

    #[test]
    fn test_decide_defaults() {
        let cfg: DecideConfig = serde_json::from_value(json!({})).unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.overlap, OverlapPolicy::Longest);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_decide_min_score_range() {
        let cfg: DecideConfig = serde_json::from_value(json!({"min_score": 1.5})).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_pattern_library_must_be_toml() {
        let cfg: DetectConfig =
            serde_json::from_value(json!({"pattern_library": "patterns.json"})).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_invalid_inline_pattern() {
        let cfg: DetectConfig = serde_json::from_value(json!({
            "patterns": [{"name": "bad", "category": "PERSON", "patterns": ["("]}]
        }))
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("bad"));
    }

    #[test]
    fn test_country_list_applies_to_every_language() {
        let cfg: DetectConfig = serde_json::from_value(json!({"country": ["us"]})).unwrap();
        let country = cfg.country.unwrap();
        let es = Language::new("es").unwrap();
        assert_eq!(country.for_lang(&es), Some(&["us".to_string()][..]));
    }

    #[test]
    fn test_country_per_language() {
        let cfg: DetectConfig =
            serde_json::from_value(json!({"country": {"es": ["es"], "EN": ["us", "gb"]}})).unwrap();
        assert!(cfg.validate().is_ok());
        let country = cfg.country.unwrap();
        assert!(matches!(country, CountryFilter::PerLanguage(_)));

        let en_us = Language::new("en-us").unwrap();
        let fr = Language::new("fr").unwrap();
        assert_eq!(country.for_lang(&en_us).unwrap().len(), 2);
        assert_eq!(country.for_lang(&fr), None);
    }

    #[test]
    fn test_country_empty_code_rejected() {
        let cfg: DetectConfig =
            serde_json::from_value(json!({"country": {"es": ["es", " "]}})).unwrap();
        assert!(cfg.validate().unwrap_err().contains("detect.country.es"));
    }

    #[test]
    fn test_transform_enabled_by_default() {
        let cfg: TransformConfig = serde_json::from_value(json!({})).unwrap();
        assert!(cfg.enabled);
        assert!(TransformConfig::default().enabled);
        let cfg: TransformConfig = serde_json::from_value(json!({"enabled": false})).unwrap();
        assert!(!cfg.enabled);
        assert!(cfg.options.is_empty());
    }

    #[test]
    fn test_logging_rotation() {
        let mut cfg = LoggingConfig::to_dir("/tmp/logs");
        assert!(cfg.validate().is_ok());
        cfg.local_rotation = "weekly".to_string();
        assert!(cfg.validate().is_err());
    }
}
