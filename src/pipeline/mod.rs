//! Pipeline orchestration
//!
//! This module ties the stages together:
//! - **adapter**: buffer ⇄ chunk conversion and marker bookkeeping
//! - **registry**: the table of available detection tasks and stage factories
//! - **builder**: binds and caches per-language pipelines
//! - **processor**: single-language detect → decide → transform
//! - **multilang**: per-language dispatch with cumulative statistics
//!
//! # Example
//!
//! ```
//! use pii_process::pipeline::{MultiPiiTextProcessor, ProcessorOptions};
//!
//! let mut processor = MultiPiiTextProcessor::new(["en", "es"], ProcessorOptions::default())?;
//! let out = processor.process("Escriba a ana@example.es", "es")?;
//! assert_eq!(out, "Escriba a <EMAIL_ADDRESS>");
//! assert_eq!(processor.stats()["es"]["EMAIL_ADDRESS"], 1);
//! # Ok::<(), pii_process::domain::PiiProcessError>(())
//! ```

pub mod adapter;
pub mod builder;
pub mod multilang;
pub mod processor;
pub mod registry;
pub mod stats;

pub use builder::{Pipeline, PipelineBuilder, PipelineKey};
pub use multilang::MultiPiiTextProcessor;
pub use processor::{PiiTextProcessor, ProcessedChunk, ProcessorOptions};
pub use registry::{
    DecisionFactory, RegisteredTask, StageContext, StageRegistry, TaskFactory, TransformerFactory,
};
pub use stats::{ChunkCounts, StageTimeStats, StageTimings, StatsReport};
