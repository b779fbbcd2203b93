//! Configuration merger
//!
//! Combines an ordered list of configuration sources into one
//! [`EffectiveConfig`]. Sources are applied in order; later sources override
//! earlier ones key by key. Each recognized stage section is deep-merged, and
//! a `null` value removes a key.

use super::schema::{DecideConfig, DetectConfig, EffectiveConfig, TransformConfig};
use crate::domain::errors::PiiProcessError;
use crate::domain::result::Result;
use regex::Regex;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level sections understood by the merger
pub const SECTIONS: [&str; 3] = ["detect", "decide", "transform"];

/// One configuration source
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Structured value held in memory
    InMemory(Value),
    /// JSON or TOML file
    File(PathBuf),
}

impl From<Value> for ConfigSource {
    fn from(value: Value) -> Self {
        ConfigSource::InMemory(value)
    }
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        ConfigSource::File(path)
    }
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        ConfigSource::File(path.to_path_buf())
    }
}

impl ConfigSource {
    fn resolve(&self) -> Result<Value> {
        match self {
            ConfigSource::InMemory(value) => Ok(value.clone()),
            ConfigSource::File(path) => load_config_file(path),
        }
    }

    fn describe(&self) -> String {
        match self {
            ConfigSource::InMemory(_) => "in-memory configuration".to_string(),
            ConfigSource::File(path) => path.display().to_string(),
        }
    }
}

/// Merges configuration sources into an effective configuration
///
/// This function:
/// 1. Reads every file source (with `${VAR}` substitution)
/// 2. Deep-merges the `detect`, `decide` and `transform` sections in order
/// 3. Rejects mutually exclusive options
/// 4. Parses and validates the typed sections
///
/// An empty slice yields the default configuration.
///
/// # Errors
///
/// Returns `PiiProcessError::Config` if a source cannot be read or parsed, a
/// section is not an object, or validation fails.
///
/// # Examples
///
/// ```
/// use pii_process::config::{merge_configs, ConfigSource};
/// use serde_json::json;
///
/// let config = merge_configs(&[
///     ConfigSource::from(json!({"transform": {"default_policy": "mask"}})),
///     ConfigSource::from(json!({"transform": {"default_policy": "label"}})),
/// ])
/// .unwrap();
/// assert_eq!(config.transform().default_policy.as_ref().unwrap().name(), "label");
/// ```
pub fn merge_configs(sources: &[ConfigSource]) -> Result<EffectiveConfig> {
    let mut merged = Map::new();
    for section in SECTIONS {
        merged.insert(section.to_string(), Value::Object(Map::new()));
    }

    for source in sources {
        let value = source.resolve()?;
        let Value::Object(top) = value else {
            return Err(PiiProcessError::Config(format!(
                "{}: configuration must be an object",
                source.describe()
            )));
        };

        for (key, section_value) in top {
            if !SECTIONS.contains(&key.as_str()) {
                tracing::debug!(key = %key, source = %source.describe(), "Ignoring unknown configuration key");
                continue;
            }
            let target = merged
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            match section_value {
                Value::Null => *target = Value::Object(Map::new()),
                Value::Object(patch) => {
                    if let Value::Object(target) = target {
                        deep_merge(target, patch);
                    }
                }
                other => {
                    return Err(PiiProcessError::Config(format!(
                        "{}: section '{key}' must be an object, got {}",
                        source.describe(),
                        json_kind(&other)
                    )))
                }
            }
        }
    }

    build_effective(Value::Object(merged))
}

fn build_effective(raw: Value) -> Result<EffectiveConfig> {
    let section = |name: &str| raw.get(name).cloned().unwrap_or(Value::Object(Map::new()));

    let detect_raw = section("detect");
    if detect_raw.get("tasks").is_some() && detect_raw.get("exclude_tasks").is_some() {
        return Err(PiiProcessError::Config(
            "detect.tasks and detect.exclude_tasks are mutually exclusive".to_string(),
        ));
    }

    let detect: DetectConfig = serde_json::from_value(detect_raw)
        .map_err(|e| PiiProcessError::Config(format!("Invalid detect section: {e}")))?;
    let decide: DecideConfig = serde_json::from_value(section("decide"))
        .map_err(|e| PiiProcessError::Config(format!("Invalid decide section: {e}")))?;
    let transform: TransformConfig = serde_json::from_value(section("transform"))
        .map_err(|e| PiiProcessError::Config(format!("Invalid transform section: {e}")))?;

    let canonical = serde_json::to_vec(&raw)?;
    let fingerprint = format!("{:x}", Sha256::digest(&canonical));

    let config = EffectiveConfig::new(detect, decide, transform, raw, fingerprint);
    config.validate().map_err(|e| {
        PiiProcessError::Config(format!("Configuration validation failed: {e}"))
    })?;
    Ok(config)
}

/// Recursively merges `patch` into `target`
///
/// Objects merge key by key; scalars and arrays replace; `null` removes.
pub fn deep_merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(&key);
            }
            Value::Object(inner) => {
                let slot = target
                    .entry(key)
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(slot) = slot {
                    deep_merge(slot, inner);
                }
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Loads one configuration file
///
/// Files ending in `.toml` are parsed as TOML, everything else as JSON.
/// `${VAR}` references are substituted from the environment first.
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - Environment variable substitution fails
/// - Parsing fails
pub fn load_config_file(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PiiProcessError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PiiProcessError::Config(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
    if is_toml {
        let value: toml::Value = toml::from_str(&contents).map_err(|e| {
            PiiProcessError::Config(format!("Failed to parse TOML {}: {e}", path.display()))
        })?;
        serde_json::to_value(value).map_err(|e| {
            PiiProcessError::Config(format!("Failed to convert {}: {e}", path.display()))
        })
    } else {
        serde_json::from_str(&contents).map_err(|e| {
            PiiProcessError::Config(format!("Failed to parse JSON {}: {e}", path.display()))
        })
    }
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Lines starting with `#` are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| PiiProcessError::Config(e.to_string()))?;
    let mut missing_vars: Vec<String> = Vec::new();

    let lines: Vec<String> = input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }
            re.replace_all(line, |cap: &regex::Captures<'_>| {
                let var_name = &cap[1];
                match std::env::var(var_name) {
                    Ok(value) => value,
                    Err(_) => {
                        if !missing_vars.iter().any(|v| v == var_name) {
                            missing_vars.push(var_name.to_string());
                        }
                        String::new()
                    }
                }
            })
            .into_owned()
        })
        .collect();

    if !missing_vars.is_empty() {
        return Err(PiiProcessError::Config(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("PII_TEST_HASH_KEY", "s3cret");
        let input = "{\"key\": \"${PII_TEST_HASH_KEY}\"}";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "{\"key\": \"s3cret\"}");
        std::env::remove_var("PII_TEST_HASH_KEY");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("PII_TEST_MISSING_VAR");
        let result = substitute_env_vars("key = \"${PII_TEST_MISSING_VAR}\"");
        assert!(matches!(result, Err(PiiProcessError::Config(ref m)) if m.contains("PII_TEST_MISSING_VAR")));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# uses ${PII_TEST_NOT_SET_ANYWHERE}\nx = 1";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_empty_sources_give_defaults() {
        let config = merge_configs(&[]).unwrap();
        assert!(config.decide().enabled);
        assert!(config.transform().default_policy.is_none());
        assert_eq!(config.fingerprint().len(), 64);
    }

    #[test]
    fn test_deep_merge_within_section() {
        let config = merge_configs(&[
            ConfigSource::from(json!({"transform": {"policy": {"PERSON": "mask"}}})),
            ConfigSource::from(json!({"transform": {"policy": {"EMAIL_ADDRESS": "redact"}}})),
        ])
        .unwrap();
        assert_eq!(config.transform().policy.len(), 2);
    }

    #[test]
    fn test_null_unsets_key() {
        let config = merge_configs(&[
            ConfigSource::from(json!({"detect": {"tasks": ["email_address"]}})),
            ConfigSource::from(json!({"detect": {"tasks": null, "exclude_tasks": ["url"]}})),
        ])
        .unwrap();
        assert!(config.detect().tasks.is_none());
        assert_eq!(config.detect().exclude_tasks.len(), 1);
    }

    #[test]
    fn test_non_object_section_rejected() {
        let err = merge_configs(&[ConfigSource::from(json!({"decide": [1, 2]}))]).unwrap_err();
        assert!(matches!(err, PiiProcessError::Config(_)));
    }

    #[test]
    fn test_unknown_top_level_ignored() {
        let config = merge_configs(&[ConfigSource::from(
            json!({"format": "piisa:config:full:1.0", "decide": {"min_score": 0.3}}),
        )])
        .unwrap();
        assert!(config.raw().get("format").is_none());
        assert!((config.decide().min_score - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = merge_configs(&[ConfigSource::from(json!({"decide": {"min_score": 0.1}}))]).unwrap();
        let b = merge_configs(&[ConfigSource::from(json!({"decide": {"min_score": 0.1}}))]).unwrap();
        let c = merge_configs(&[ConfigSource::from(json!({"decide": {"min_score": 0.2}}))]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"transform": {{"default_policy": "redact"}}}}"#).unwrap();
        file.flush().unwrap();

        let config = merge_configs(&[ConfigSource::from(file.path())]).unwrap();
        assert_eq!(
            config.transform().default_policy.as_ref().map(|p| p.name()),
            Some("redact")
        );
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[decide]\noverlap = \"score\"").unwrap();
        file.flush().unwrap();

        let value = load_config_file(file.path()).unwrap();
        assert_eq!(value["decide"]["overlap"], "score");
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{ not json").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            merge_configs(&[ConfigSource::from(file.path())]),
            Err(PiiProcessError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config_file("nonexistent-config.json");
        assert!(matches!(result, Err(PiiProcessError::Config(_))));
    }
}
