//! Error propagation tests
//!
//! Every stage failure must reach the caller as the matching error variant,
//! tagged with the stage it came from.

mod common;

use common::{
    lang, names_registry, registry_with, registry_with_decider, registry_with_transformer,
    DuplicatingDecider, FailingDecider, FailingDetector, FailingTransformer,
    IdentityChangingTransformer, NameDetector,
};
use pii_process::domain::{ContextMarker, DocumentChunk, PiiProcessError, Stage};
use pii_process::pipeline::{PiiTextProcessor, ProcessorOptions};
use serde_json::json;
use std::sync::Arc;

fn processor_with(options: ProcessorOptions) -> PiiTextProcessor {
    PiiTextProcessor::new("en", options).unwrap()
}

#[test]
fn test_detection_error_names_task() {
    let registry = registry_with(vec![
        Arc::new(NameDetector::new("names", &["Ann"])),
        Arc::new(FailingDetector::new("broken")),
    ]);
    let p = processor_with(ProcessorOptions::default().with_registry(registry));
    let err = p.process("Ann").unwrap_err();

    assert_eq!(err.stage(), Stage::Detect);
    match err {
        PiiProcessError::Detection { task, message } => {
            assert_eq!(task, "broken");
            assert!(message.contains("model not loaded"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_decision_error() {
    let registry = registry_with_decider(
        vec![Arc::new(NameDetector::new("names", &["Ann"]))],
        Arc::new(FailingDecider),
    );
    let p = processor_with(ProcessorOptions::default().with_registry(registry));
    let err = p.process("Ann").unwrap_err();

    assert_eq!(err.stage(), Stage::Decide);
    assert!(matches!(err, PiiProcessError::Decision(ref m) if m.contains("failing")));
}

#[test]
fn test_overlapping_decision_output_is_invariant_violation() {
    let registry = registry_with_decider(
        vec![Arc::new(NameDetector::new("names", &["Ann"]))],
        Arc::new(DuplicatingDecider),
    );
    let p = processor_with(ProcessorOptions::default().with_registry(registry));
    let chunk = DocumentChunk::new("Hi Ann", lang("en"));
    let chunk_id = chunk.id().to_string();

    match p.process_chunk(chunk).unwrap_err() {
        PiiProcessError::ConsolidationInvariant { chunk_id: id, .. } => assert_eq!(id, chunk_id),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_decider_is_bypassed_when_disabled() {
    let registry = registry_with_decider(
        vec![Arc::new(NameDetector::new("names", &["Ann"]))],
        Arc::new(FailingDecider),
    );
    let p = processor_with(
        ProcessorOptions::default()
            .with_registry(registry)
            .with_config(json!({"decide": {"enabled": false}})),
    );
    assert_eq!(p.pipeline().decider().name(), "passthrough");
    assert_eq!(p.process("Ann").unwrap(), "<PERSON>");
}

#[test]
fn test_transformer_failure_is_transform_error() {
    let registry = registry_with_transformer(
        vec![Arc::new(NameDetector::new("names", &["Ann"]))],
        Arc::new(FailingTransformer),
    );
    let p = processor_with(ProcessorOptions::default().with_registry(registry));
    let err = p.process("Hi Ann").unwrap_err();

    assert_eq!(err.stage(), Stage::Transform);
    assert_eq!(err.stage().as_str(), "transform");
    match err {
        PiiProcessError::Transform(message) => {
            assert!(message.contains("failing"));
            assert!(message.contains("template engine unavailable"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_transformer_changing_identity_is_transform_error() {
    let registry = registry_with_transformer(
        vec![Arc::new(NameDetector::new("names", &["Ann"]))],
        Arc::new(IdentityChangingTransformer),
    );
    let p = processor_with(ProcessorOptions::default().with_registry(registry));
    let err = p.process("Hi Ann").unwrap_err();

    assert_eq!(err.stage().as_str(), "transform");
    assert!(
        matches!(err, PiiProcessError::Transform(ref m) if m.contains("changed the identity"))
    );
}

#[test]
fn test_transformer_is_bypassed_when_disabled() {
    let registry = registry_with_transformer(
        vec![Arc::new(NameDetector::new("names", &["Ann"]))],
        Arc::new(FailingTransformer),
    );
    let p = processor_with(ProcessorOptions::default().with_registry(registry).transform(false));
    assert_eq!(p.pipeline().transformer().name(), "passthrough");
    assert_eq!(p.process("Hi Ann").unwrap(), "Hi Ann");
}

#[test]
fn test_marker_out_of_range_is_adapter_error() {
    let p = processor_with(ProcessorOptions::default().with_registry(names_registry(&["Ann"])));
    let mut chunk = DocumentChunk::new("Ann", lang("en"));
    chunk.markers = vec![ContextMarker::boundary("separator", 10)];

    let err = p.process_chunk(chunk).unwrap_err();
    assert_eq!(err.stage(), Stage::Adapter);
}

#[test]
fn test_unknown_task_is_build_error() {
    let options = ProcessorOptions::default().with_tasks(["no_such_task"]).unwrap();
    let err = PiiTextProcessor::new("en", options).unwrap_err();
    assert_eq!(err.stage(), Stage::Build);
    assert!(err.to_string().contains("no_such_task"));
}

#[test]
fn test_invalid_inline_pattern_is_config_error() {
    let options = ProcessorOptions::default().with_config(json!({"detect": {"patterns": [
        {"name": "broken", "category": "TICKET", "patterns": ["("]}
    ]}}));
    let err = PiiTextProcessor::new("en", options).unwrap_err();
    assert_eq!(err.stage(), Stage::Config);
}

#[test]
fn test_error_messages_carry_context() {
    let err = PiiProcessError::unsupported_language("fr", ["en", "es"]);
    assert_eq!(
        err.to_string(),
        "Unsupported language 'fr' (available: en, es)"
    );

    let wrapped = PiiProcessError::Decision("boom".to_string()).in_document("/tmp/a.txt");
    assert!(wrapped.to_string().contains("/tmp/a.txt"));
    assert_eq!(wrapped.stage(), Stage::Decide);
    assert!(std::error::Error::source(&wrapped).is_some());

    // wrapping twice keeps the first path
    let twice = wrapped.in_document("/tmp/b.txt");
    assert!(twice.to_string().contains("/tmp/a.txt"));
}
