//! Document command implementation
//!
//! This module implements the `doc` command, which runs one document through
//! the pipeline and writes the transformed copy.

use super::print_bound_tasks;
use crate::cli::PipelineArgs;
use crate::document::{process_document, DocumentFormat, DocumentOptions};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the doc command
#[derive(Args, Debug)]
pub struct DocArgs {
    /// Input document
    pub input: PathBuf,

    /// Output document
    pub output: PathBuf,

    /// Language used when the document declares none
    #[arg(short = 'L', long, value_name = "LANG")]
    pub lang: Option<String>,

    /// Output format (text or json); inferred from the output extension by default
    #[arg(short, long, value_name = "FMT")]
    pub format: Option<DocumentFormat>,

    /// Save the consolidated PII instances to a JSON file
    #[arg(long, value_name = "FILE")]
    pub save_pii: Option<PathBuf>,

    /// Let detectors see the text of the neighbouring chunks
    #[arg(long)]
    pub chunk_context: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

impl DocArgs {
    /// Execute the doc command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input.display(), "Starting doc command");

        let options = DocumentOptions {
            lang: self.lang.clone(),
            processor: self.pipeline.processor_options()?,
            output_format: self.format,
            pii_file: self.save_pii.clone(),
            chunk_context: self.chunk_context,
            ..DocumentOptions::default()
        };

        let input = self.input.clone();
        let output = self.output.clone();
        let summary =
            tokio::task::spawn_blocking(move || process_document(&input, &output, &options))
                .await??;

        println!(
            "✅ {} -> {} ({} chunks, {} PII instances)",
            summary.input.display(),
            summary.output.display(),
            summary.chunks,
            summary.instances
        );
        if let Some(path) = &self.save_pii {
            println!("   PII instances saved to {}", path.display());
        }
        println!();

        if self.pipeline.show_tasks {
            print_bound_tasks(&summary.tasks);
        }
        if self.pipeline.show_stats {
            println!("{}", summary.stats.format_console());
        }

        Ok(0)
    }
}
