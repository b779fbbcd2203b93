//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for pii-process using clap.

pub mod commands;

use crate::domain::errors::PiiProcessError;
use crate::domain::result::Result;
use crate::pipeline::ProcessorOptions;
use crate::transform::Policy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// pii-process - PII detection and transformation
#[derive(Parser, Debug)]
#[command(name = "pii-process")]
#[command(version, about, long_about = None)]
#[command(author = "PII Process Contributors")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "PII_PROCESS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Directory for rolling JSON log files
    #[arg(long, global = true, value_name = "DIR", env = "PII_PROCESS_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process a document (plain text or JSON)
    Doc(commands::doc::DocArgs),

    /// Process a JSONL file record by record
    Jsonl(commands::jsonl::JsonlArgs),

    /// List the registered detection tasks
    Tasks(commands::tasks::TasksArgs),

    /// Merge and validate configuration files
    ValidateConfig(commands::validate::ValidateArgs),
}

/// Pipeline options shared by the processing commands
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Configuration file (JSON or TOML); repeat to merge several in order
    #[arg(short, long = "config", value_name = "FILE")]
    pub config: Vec<PathBuf>,

    /// Default transformation policy
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<String>,

    /// Policy parameter (key for hash, template for custom)
    #[arg(long, value_name = "PARAM", requires = "policy")]
    pub policy_param: Option<String>,

    /// Detection tasks to use (comma-separated)
    #[arg(long, value_name = "TASK", value_delimiter = ',')]
    pub tasks: Option<Vec<String>>,

    /// Countries for country-specific tasks (comma-separated); `LANG:COUNTRY`
    /// entries set them per language
    #[arg(long, value_name = "COUNTRY", value_delimiter = ',')]
    pub country: Option<Vec<String>>,

    /// Bypass the decision stage
    #[arg(long)]
    pub skip_decision: bool,

    /// Detect only: leave the text unchanged
    #[arg(long)]
    pub skip_transform: bool,

    /// Print the detection tasks bound per language
    #[arg(long)]
    pub show_tasks: bool,

    /// Print processing statistics
    #[arg(long)]
    pub show_stats: bool,
}

impl PipelineArgs {
    /// Turns the arguments into processor options
    ///
    /// # Errors
    ///
    /// Returns `PiiProcessError::Config` for an unknown policy, a policy
    /// missing its parameter, or a malformed task id.
    pub fn processor_options(&self) -> Result<ProcessorOptions> {
        let mut options = ProcessorOptions::default()
            .skip_decision(self.skip_decision)
            .transform(!self.skip_transform);

        for path in &self.config {
            options = options.with_config(path.clone());
        }

        if let Some(name) = &self.policy {
            let policy = Policy::from_parts(name, self.policy_param.clone())
                .map_err(PiiProcessError::Config)?;
            tracing::info!(policy = %policy.name(), "Default policy from CLI");
            options = options.with_policy(policy);
        }

        if let Some(tasks) = &self.tasks {
            tracing::info!(tasks = ?tasks, "Restricting detection tasks from CLI");
            options = options.with_tasks(tasks.iter().map(|t| t.trim().to_string()))?;
        }

        if let Some(country) = &self.country {
            options = apply_country(options, country)?;
        }

        Ok(options)
    }
}

/// Plain entries apply to every language, `lang:code` entries to one
fn apply_country(options: ProcessorOptions, entries: &[String]) -> Result<ProcessorOptions> {
    let entries: Vec<&str> = entries.iter().map(|c| c.trim()).collect();
    let per_language: Vec<(&str, &str)> = entries
        .iter()
        .filter_map(|entry| entry.split_once(':'))
        .map(|(lang, code)| (lang.trim(), code.trim()))
        .collect();

    if per_language.is_empty() {
        return Ok(options.with_country(entries.iter().map(|c| c.to_string())));
    }
    if per_language.len() != entries.len() {
        return Err(PiiProcessError::Config(format!(
            "--country mixes plain and per-language entries: {}",
            entries.join(",")
        )));
    }
    options.with_country_map(
        per_language
            .into_iter()
            .map(|(lang, code)| (lang, [code.to_string()])),
    )
}
