// PII Process - PII detection and transformation pipeline
// Copyright (c) 2025 PII Process Contributors
// Licensed under the MIT License

//! # PII Process
//!
//! End-to-end processing of personally identifiable information in text:
//! detect PII spans, consolidate overlapping detections, and rewrite each
//! span according to a per-type policy.
//!
//! ## Overview
//!
//! A single-language [`pipeline::PiiTextProcessor`] binds three stages,
//! assembled from the [`pipeline::StageRegistry`] for one language:
//!
//! - **Detect**: every bound task scans the chunk independently
//! - **Decide**: overlapping or low-confidence detections are resolved so
//!   that no two instances overlap
//! - **Transform**: each surviving span is replaced by its policy output
//!
//! [`pipeline::MultiPiiTextProcessor`] routes chunks to one processor per
//! language and accumulates statistics. [`document::process_document`] and
//! [`document::process_jsonl_file`] drive whole files through the pipeline.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`pipeline`] - Chunk adapter, registry, builder and processors
//! - [`detect`] - Detection tasks and the built-in pattern library
//! - [`decide`] - Decision engines
//! - [`transform`] - Policies and the substituting transformer
//! - [`document`] - Document and JSONL orchestration
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration merging
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```
//! use pii_process::pipeline::{PiiTextProcessor, ProcessorOptions};
//! use pii_process::transform::Policy;
//!
//! let processor = PiiTextProcessor::new(
//!     "en",
//!     ProcessorOptions::default().with_policy(Policy::Mask),
//! )?;
//! let out = processor.process("ip 10.0.0.1")?;
//! assert_eq!(out, "ip ********");
//! # Ok::<(), pii_process::domain::PiiProcessError>(())
//! ```
//!
//! ## Configuration
//!
//! Configuration is a JSON (or TOML) object with `detect`, `decide` and
//! `transform` sections. Several sources merge in order, later ones winning:
//!
//! ```
//! use pii_process::pipeline::{PiiTextProcessor, ProcessorOptions};
//! use serde_json::json;
//!
//! let options = ProcessorOptions::default()
//!     .with_config(json!({"detect": {"tasks": ["email_address"]}}))
//!     .with_config(json!({"transform": {"policy": {"EMAIL_ADDRESS": "redact"}}}));
//! let processor = PiiTextProcessor::new("en", options)?;
//! assert_eq!(processor.process("a@b.com or 10.0.0.1")?, "<PII> or 10.0.0.1");
//! # Ok::<(), pii_process::domain::PiiProcessError>(())
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`domain::PiiProcessError`]; each variant names the
//! [`domain::Stage`] it came from.

pub mod cli;
pub mod config;
pub mod decide;
pub mod detect;
pub mod document;
pub mod domain;
pub mod logging;
pub mod pipeline;
pub mod transform;
