//! Validate config command implementation
//!
//! This module implements the `validate-config` command: the given files are
//! merged in order, exactly as a processor would merge them, and a summary of
//! the effective configuration is printed.

use crate::config::{merge_configs, ConfigSource, EffectiveConfig};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files, merged in order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(files = ?self.files, "Validating configuration");

        println!("🔍 Validating configuration:");
        for file in &self.files {
            println!("   {}", file.display());
        }
        println!();

        let sources: Vec<ConfigSource> = self.files.iter().cloned().map(Into::into).collect();
        match merge_configs(&sources) {
            Ok(config) => {
                println!("✅ Configuration is valid");
                println!();
                print_summary(&config);
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(2) // Configuration error exit code
            }
        }
    }
}

fn print_summary(config: &EffectiveConfig) {
    let detect = config.detect();
    let decide = config.decide();
    let transform = config.transform();
    let list = |items: Vec<String>| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };

    println!("Configuration Summary:");
    match &detect.tasks {
        Some(tasks) => println!(
            "  Tasks: {}",
            list(tasks.iter().map(ToString::to_string).collect())
        ),
        None => println!("  Tasks: all"),
    }
    if !detect.exclude_tasks.is_empty() {
        println!(
            "  Excluded Tasks: {}",
            list(detect.exclude_tasks.iter().map(ToString::to_string).collect())
        );
    }
    if let Some(country) = &detect.country {
        println!("  Country: {country}");
    }
    println!("  Inline Patterns: {}", detect.patterns.len());
    if let Some(library) = &detect.pattern_library {
        println!("  Pattern Library: {}", library.display());
    }
    println!("  Decision Enabled: {}", decide.enabled);
    println!("  Overlap Policy: {}", decide.overlap);
    println!("  Minimum Score: {}", decide.min_score);
    match &transform.default_policy {
        Some(policy) => println!("  Default Policy: {policy}"),
        None => println!("  Default Policy: label"),
    }
    for (pii_type, policy) in &transform.policy {
        println!("    {pii_type}: {policy}");
    }
    println!("  Fingerprint: {}", config.fingerprint());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_valid_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.toml");
        std::fs::write(&a, r#"{"transform": {"default_policy": "mask"}}"#).unwrap();
        std::fs::write(&b, "[decide]\noverlap = \"score\"\n").unwrap();

        let args = ValidateArgs { files: vec![a, b] };
        assert_eq!(args.execute().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_conflicting_files_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        std::fs::write(&a, r#"{"detect": {"tasks": ["url"]}}"#).unwrap();
        std::fs::write(&b, r#"{"detect": {"exclude_tasks": ["url"]}}"#).unwrap();

        let args = ValidateArgs { files: vec![a, b] };
        assert_eq!(args.execute().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_exit_code() {
        let args = ValidateArgs {
            files: vec![PathBuf::from("/nonexistent/pii.json")],
        };
        assert_eq!(args.execute().await.unwrap(), 2);
    }
}
