//! Regex-based PII detector

use super::patterns::PatternDefinition;
use super::{Detector, LanguageSupport, TaskInfo};
use crate::domain::chunk::DocumentChunk;
use crate::domain::ids::{PiiType, TaskId};
use crate::domain::pii::{DetectionMethod, PiiInstance};
use anyhow::{anyhow, Result};
use regex::Regex;

/// Name of the capture group that narrows a match to the PII span
pub const PII_GROUP: &str = "pii";

/// Regex-based detection task built from a [`PatternDefinition`]
pub struct RegexDetector {
    info: TaskInfo,
    pii_type: PiiType,
    regexes: Vec<Regex>,
    confidence: f32,
}

impl RegexDetector {
    /// Create a detector from a pattern definition
    pub fn from_definition(def: &PatternDefinition) -> Result<Self> {
        let id = TaskId::new(def.name.clone()).map_err(|e| anyhow!(e))?;
        let languages = LanguageSupport::from_tags(&def.languages).map_err(|e| anyhow!(e))?;
        let regexes = def.compile()?;
        let description = def
            .description
            .clone()
            .unwrap_or_else(|| format!("{} patterns", def.category));

        Ok(Self {
            info: TaskInfo {
                id,
                pii_types: vec![def.category.clone()],
                languages,
                country: def.country.clone(),
                method: DetectionMethod::Regex,
                description,
            },
            pii_type: def.category.clone(),
            regexes,
            confidence: def.confidence,
        })
    }

    /// Set the confidence attached to every match
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Finds non-overlapping spans in a string
    ///
    /// Matches of all regexes are ordered by start, longest first, and kept
    /// greedily.
    fn detect_in_string(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        for regex in &self.regexes {
            for capture in regex.captures_iter(text) {
                let matched = capture.name(PII_GROUP).or_else(|| capture.get(0));
                if let Some(m) = matched {
                    if m.start() < m.end() {
                        spans.push((m.start(), m.end()));
                    }
                }
            }
        }

        spans.sort_by(|a, b| a.0.cmp(&b.0).then((b.1 - b.0).cmp(&(a.1 - a.0))));
        let mut kept: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
        for span in spans {
            if kept.last().map_or(true, |last| span.0 >= last.1) {
                kept.push(span);
            }
        }
        kept
    }
}

impl Detector for RegexDetector {
    fn info(&self) -> &TaskInfo {
        &self.info
    }

    fn detect(&self, chunk: &DocumentChunk) -> Result<Vec<PiiInstance>> {
        let text = chunk.data.as_str();
        Ok(self
            .detect_in_string(text)
            .into_iter()
            .map(|(start, end)| {
                let mut instance = PiiInstance::new(
                    self.pii_type.clone(),
                    &text[start..end],
                    start,
                    end,
                    self.info.id.clone(),
                )
                .with_score(self.confidence);
                if let Some(country) = &self.info.country {
                    instance = instance.with_country(country.clone());
                }
                instance
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::patterns::PatternLibrary;
    use crate::domain::ids::Language;

    fn builtin(name: &str) -> RegexDetector {
        let library = PatternLibrary::builtin().unwrap();
        let def = library
            .definitions()
            .iter()
            .find(|d| d.name == name)
            .unwrap();
        RegexDetector::from_definition(def).unwrap()
    }

    fn chunk(text: &str) -> DocumentChunk {
        DocumentChunk::new(text, Language::new("en").unwrap())
    }

    #[test]
    fn test_detect_email() {
        let detector = builtin("email_address");
        let found = detector
            .detect(&chunk("Contact: john.doe@example.com today"))
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "john.doe@example.com");
        assert_eq!(found[0].pii_type, PiiType::EMAIL_ADDRESS);
        assert_eq!(found[0].score, Some(0.95));
    }

    #[test]
    fn test_detect_phone() {
        let detector = builtin("phone_number");
        let found = detector.detect(&chunk("Call (555) 123-4567")).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].value.contains("555"));
    }

    #[test]
    fn test_named_group_narrows_span() {
        let detector = builtin("en_honorific_name");
        let text = "Please ask Dr. Watson about it";
        let found = detector.detect(&chunk(text)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "Watson");
        assert_eq!(&text[found[0].start..found[0].end], "Watson");
    }

    #[test]
    fn test_country_attached() {
        let detector = builtin("us_ssn");
        let found = detector.detect(&chunk("SSN 123-45-6789")).unwrap();
        assert_eq!(found[0].country.as_deref(), Some("us"));
    }

    #[test]
    fn test_overlapping_matches_keep_longest() {
        let def = PatternDefinition {
            name: "digits".to_string(),
            patterns: vec![r"\d{2}".to_string(), r"\d{4}".to_string()],
            confidence: 0.5,
            category: PiiType::GOV_ID,
            languages: vec![],
            country: None,
            description: None,
        };
        let detector = RegexDetector::from_definition(&def).unwrap();
        let spans = detector.detect_in_string("1234 56");
        assert_eq!(spans, vec![(0, 4), (5, 7)]);
    }

    #[test]
    fn test_no_pii() {
        let detector = builtin("email_address");
        assert!(detector.detect(&chunk("nothing here")).unwrap().is_empty());
    }
}
