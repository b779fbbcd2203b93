//! JSONL command implementation
//!
//! This module implements the `jsonl` command. Records are processed one by
//! one; a shutdown signal stops the run between records and discards the
//! partial output.

use super::print_bound_tasks;
use crate::cli::PipelineArgs;
use crate::document::{process_jsonl_file, write_json_atomic, JsonlOptions};
use crate::domain::errors::PiiProcessError;
use crate::pipeline::MultiPiiTextProcessor;
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the jsonl command
#[derive(Args, Debug)]
pub struct JsonlArgs {
    /// Input JSONL file, or a YAML list of records (.yml/.yaml)
    pub input: PathBuf,

    /// Output JSONL file
    pub output: PathBuf,

    /// Languages to load (comma-separated)
    #[arg(short = 'L', long, value_name = "LANG", value_delimiter = ',', required = true)]
    pub lang: Vec<String>,

    /// Dotted path of the text field
    #[arg(long, value_name = "PATH", default_value = "text")]
    pub field_text: String,

    /// Names of the language field, tried in order (comma-separated)
    #[arg(long, value_name = "NAME", value_delimiter = ',')]
    pub field_lang: Option<Vec<String>>,

    /// Save the consolidated PII instances to a JSON file
    #[arg(long, value_name = "FILE")]
    pub save_pii: Option<PathBuf>,

    /// Save processing statistics to a JSON file
    #[arg(long, value_name = "FILE")]
    pub save_stats: Option<PathBuf>,

    /// Copy records in an unsupported language instead of failing
    #[arg(long)]
    pub skip_invalid_lang: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

impl JsonlArgs {
    fn jsonl_options(&self) -> JsonlOptions {
        let defaults = JsonlOptions::default();
        JsonlOptions {
            text_field: self.field_text.clone(),
            lang_fields: self.field_lang.clone().unwrap_or(defaults.lang_fields),
            skip_invalid_lang: self.skip_invalid_lang,
        }
    }

    /// Execute the jsonl command
    pub async fn execute(&self, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
        tracing::info!(
            input = %self.input.display(),
            languages = ?self.lang,
            "Starting jsonl command"
        );

        let options = self.pipeline.processor_options()?;
        let jsonl_options = self.jsonl_options();
        let langs = self.lang.clone();
        let keep_pii = self.save_pii.is_some();
        let input = self.input.clone();
        let output = self.output.clone();

        let (summary, processor) = tokio::task::spawn_blocking(move || {
            let mut processor =
                MultiPiiTextProcessor::new(&langs, options)?.with_keep_pii(keep_pii);
            let summary = process_jsonl_file(
                &input,
                &output,
                &mut processor,
                &jsonl_options,
                || *shutdown_signal.borrow(),
            )?;
            Ok::<_, PiiProcessError>((summary, processor))
        })
        .await??;

        if let Some(path) = &self.save_pii {
            write_json_atomic(path, processor.pii())
                .map_err(|e| PiiProcessError::Write(format!("{e:#}")))?;
        }
        let stats = processor.stats();
        if let Some(path) = &self.save_stats {
            stats.write_to_file(path)?;
        }

        println!(
            "✅ {} -> {} ({} records, {} processed, {} copied)",
            self.input.display(),
            self.output.display(),
            summary.records,
            summary.processed,
            summary.copied
        );
        println!();

        if self.pipeline.show_tasks {
            print_bound_tasks(&processor.tasks());
        }
        if self.pipeline.show_stats {
            println!("{}", stats.format_console());
        }

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: JsonlArgs,
    }

    fn parse(extra: &[&str]) -> JsonlArgs {
        let mut argv = vec!["jsonl", "in.jsonl", "out.jsonl"];
        argv.extend_from_slice(extra);
        Wrapper::parse_from(argv).args
    }

    #[test]
    fn test_jsonl_options_defaults() {
        let options = parse(&["--lang", "en"]).jsonl_options();
        assert_eq!(options.text_field, "text");
        assert_eq!(options.lang_fields, vec!["lang", "language"]);
        assert!(!options.skip_invalid_lang);
    }

    #[test]
    fn test_jsonl_options_overrides() {
        let args = parse(&[
            "--lang",
            "en,es",
            "--field-text",
            "body.text",
            "--field-lang",
            "locale",
            "--skip-invalid-lang",
        ]);
        assert_eq!(args.lang, vec!["en", "es"]);
        let options = args.jsonl_options();
        assert_eq!(options.text_field, "body.text");
        assert_eq!(options.lang_fields, vec!["locale"]);
        assert!(options.skip_invalid_lang);
    }

    #[tokio::test]
    async fn test_jsonl_command_saves_pii_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        let output = dir.path().join("out.jsonl");
        let pii = dir.path().join("pii.json");
        let stats = dir.path().join("stats.json");
        std::fs::write(
            &input,
            "{\"id\": \"r1\", \"text\": \"mail a@b.com\", \"lang\": \"en\"}\n",
        )
        .unwrap();

        let mut args = parse(&["--lang", "en"]);
        args.input = input;
        args.output = output.clone();
        args.save_pii = Some(pii.clone());
        args.save_stats = Some(stats.clone());

        let (_tx, rx) = watch::channel(false);
        assert_eq!(args.execute(rx).await.unwrap(), 0);

        assert!(std::fs::read_to_string(&output)
            .unwrap()
            .contains("<EMAIL_ADDRESS>"));
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&pii).unwrap()).unwrap();
        assert_eq!(saved.as_array().unwrap().len(), 1);
        assert!(stats.exists());
    }

    #[tokio::test]
    async fn test_jsonl_command_interrupted() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        std::fs::write(&input, "{\"text\": \"x\"}\n").unwrap();

        let mut args = parse(&["--lang", "en"]);
        args.input = input;
        args.output = dir.path().join("out.jsonl");

        let (_tx, rx) = watch::channel(true);
        let err = args.execute(rx).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PiiProcessError>(),
            Some(PiiProcessError::Interrupted(_))
        ));
        assert!(!args.output.exists());
    }
}
