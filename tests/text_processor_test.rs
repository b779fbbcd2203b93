//! Integration tests for the single-language text processor

mod common;

use common::{lang, names_registry, registry_with, NameDetector};
use pii_process::domain::{DocumentChunk, PiiProcessError, PiiType};
use pii_process::pipeline::{PiiTextProcessor, ProcessorOptions, StageRegistry};
use pii_process::transform::Policy;
use serde_json::json;
use std::sync::Arc;
use test_case::test_case;

fn builtin(lang: &str, policy: Policy) -> PiiTextProcessor {
    PiiTextProcessor::new(lang, ProcessorOptions::default().with_policy(policy)).unwrap()
}

#[test_case(Policy::Passthrough, "Call Mr. John Smith." ; "passthrough")]
#[test_case(Policy::Redact, "Call Mr. <PII>." ; "redact")]
#[test_case(Policy::Mask, "Call Mr. **** *****." ; "mask")]
#[test_case(Policy::Label, "Call Mr. <PERSON>." ; "label")]
#[test_case(Policy::Annotate, "Call Mr. <PERSON:John Smith>." ; "annotate")]
#[test_case(Policy::Placeholder, "Call Mr. Jane Doe." ; "placeholder")]
#[test_case(Policy::Custom { template: "[{name}]".to_string() }, "Call Mr. [PERSON]." ; "custom")]
fn test_policies_on_honorific_name(policy: Policy, expected: &str) {
    let p = builtin("en", policy);
    assert_eq!(p.process("Call Mr. John Smith.").unwrap(), expected);
}

#[test]
fn test_language_specific_tasks() {
    let en = builtin("en", Policy::Label);
    let es = builtin("es", Policy::Label);

    assert_eq!(en.process("SSN 123-45-6789").unwrap(), "SSN <GOV_ID>");
    assert_eq!(es.process("SSN 123-45-6789").unwrap(), "SSN 123-45-6789");
    assert_eq!(es.process("DNI 12345678Z").unwrap(), "DNI <GOV_ID>");
}

#[test]
fn test_country_filter() {
    let options = ProcessorOptions::default().with_country(["es"]);
    let p = PiiTextProcessor::new("en", options).unwrap();
    assert!(!p.task_ids().iter().any(|t| t.as_str() == "us_ssn"));
    assert_eq!(p.process("SSN 123-45-6789").unwrap(), "SSN 123-45-6789");
}

#[test]
fn test_task_filter() {
    let options = ProcessorOptions::default()
        .with_tasks(["ip_address"])
        .unwrap();
    let p = PiiTextProcessor::new("en", options).unwrap();
    assert_eq!(
        p.process("a@b.com from 10.1.2.3").unwrap(),
        "a@b.com from <IP_ADDRESS>"
    );
}

#[test]
fn test_custom_detector_and_placeholder_config() {
    let options = ProcessorOptions::default()
        .with_registry(names_registry(&["Alice", "Bob"]))
        .with_config(json!({"transform": {
            "default_policy": "placeholder",
            "placeholder": {"PERSON": "Someone"}
        }}));
    let p = PiiTextProcessor::new("en", options).unwrap();
    assert_eq!(
        p.process("Alice met Bob.").unwrap(),
        "Someone met Someone."
    );
}

#[test]
fn test_hash_is_stable_per_value() {
    let p = builtin(
        "en",
        Policy::from_parts("hash", Some("secret".to_string())).unwrap(),
    );
    let first = p.process("a@b.com and a@b.com").unwrap();
    let parts: Vec<&str> = first.split(" and ").collect();
    assert_eq!(parts[0], parts[1]);
    assert!(parts[0].starts_with("EMAIL_ADDRESS_"));
    assert_eq!(p.process("a@b.com").unwrap(), parts[0]);
    assert_ne!(p.process("c@d.com").unwrap(), parts[0]);
}

#[test]
fn test_synthetic_replaces_email() {
    let p = builtin("en", Policy::Synthetic);
    let out = p.process("mail a@b.com").unwrap();
    assert!(out.starts_with("mail "));
    assert_ne!(out, "mail a@b.com");
    assert!(out.contains('@'));
}

#[test]
fn test_processed_chunk_reports_instances() {
    let p = PiiTextProcessor::new(
        "en",
        ProcessorOptions::default().with_registry(names_registry(&["Alice"])),
    )
    .unwrap();
    let chunk = DocumentChunk::new("Alice and Alice", lang("en"));
    let chunk_id = chunk.id().clone();
    let processed = p.process_chunk(chunk).unwrap();

    assert_eq!(processed.chunk.data, "<PERSON> and <PERSON>");
    assert_eq!(processed.chunk.id(), &chunk_id);
    assert_eq!(processed.instances.len(), 2);
    assert_eq!(processed.instances[1].start, 10);
    assert_eq!(processed.counts()[&PiiType::PERSON], 2);
}

#[test]
fn test_processor_is_reusable() {
    let p = builtin("en", Policy::Redact);
    for _ in 0..3 {
        assert_eq!(p.process("x a@b.com").unwrap(), "x <PII>");
    }
}

#[test]
fn test_pipeline_shared_across_threads() {
    let p = Arc::new(builtin("en", Policy::Label));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let p = Arc::clone(&p);
            std::thread::spawn(move || p.process(&format!("user{i}@example.com")).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), "<EMAIL_ADDRESS>");
    }
}

#[test]
fn test_language_without_tasks_fails_to_build() {
    let registry = registry_with(vec![Arc::new(NameDetector::for_languages(
        "es_names",
        &["Ana"],
        &["es"],
    ))]);
    let err = PiiTextProcessor::new("en", ProcessorOptions::default().with_registry(registry))
        .unwrap_err();
    assert!(matches!(err, PiiProcessError::PipelineBuild(_)));
}

#[test]
fn test_empty_registry_fails_to_build() {
    let options = ProcessorOptions::default().with_registry(Arc::new(StageRegistry::empty()));
    let err = PiiTextProcessor::new("en", options).unwrap_err();
    assert!(matches!(err, PiiProcessError::PipelineBuild(_)));
}
