//! Cumulative processing statistics

use crate::domain::ids::{Language, PiiType};
use crate::domain::result::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Index;
use std::path::Path;
use std::time::Duration;

/// Wall-clock time spent in each stage for one chunk
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    /// Detection time
    pub detect: Duration,
    /// Decision time
    pub decide: Duration,
    /// Transformation time
    pub transform: Duration,
}

impl StageTimings {
    /// Sum of all stages
    pub fn total(&self) -> Duration {
        self.detect + self.decide + self.transform
    }
}

/// Chunk counters for one language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkCounts {
    /// Chunks processed
    pub total: u64,
    /// Chunks with at least one instance
    pub with_pii: u64,
}

/// Cumulative stage time, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimeStats {
    /// Detection
    pub detect: f64,
    /// Decision
    pub decide: f64,
    /// Transformation
    pub transform: f64,
}

/// Statistics accumulated over every successfully processed chunk
///
/// Counts are keyed by language, then PII type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// Instance counts per language and type
    pub entities: BTreeMap<Language, BTreeMap<PiiType, u64>>,
    /// Chunk counters per language
    pub chunks: BTreeMap<Language, ChunkCounts>,
    /// Cumulative stage time
    pub time: StageTimeStats,
    /// When the report was created
    pub created: DateTime<Utc>,
    /// Last update
    pub updated: DateTime<Utc>,
}

impl StatsReport {
    /// Create a new empty report
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            entities: BTreeMap::new(),
            chunks: BTreeMap::new(),
            time: StageTimeStats::default(),
            created: now,
            updated: now,
        }
    }

    /// Adds empty counters for a language
    pub fn add_language(&mut self, lang: &Language) {
        self.entities.entry(lang.clone()).or_default();
        self.chunks.entry(lang.clone()).or_default();
    }

    /// Records one processed chunk
    pub fn record(
        &mut self,
        lang: &Language,
        counts: &BTreeMap<PiiType, u64>,
        timings: &StageTimings,
    ) {
        let chunks = self.chunks.entry(lang.clone()).or_default();
        chunks.total += 1;
        if counts.values().any(|&c| c > 0) {
            chunks.with_pii += 1;
        }

        let entities = self.entities.entry(lang.clone()).or_default();
        for (pii_type, count) in counts {
            *entities.entry(pii_type.clone()).or_insert(0) += count;
        }

        self.time.detect += timings.detect.as_secs_f64();
        self.time.decide += timings.decide.as_secs_f64();
        self.time.transform += timings.transform.as_secs_f64();
        self.updated = Utc::now();
    }

    /// Count for one (language, type) pair
    pub fn count(&self, lang: &str, pii_type: &str) -> u64 {
        self.entities
            .get(lang)
            .and_then(|types| types.get(pii_type))
            .copied()
            .unwrap_or(0)
    }

    /// Total instances over all languages
    pub fn total(&self) -> u64 {
        self.entities.values().flat_map(|t| t.values()).sum()
    }

    /// Total chunks over all languages
    pub fn total_chunks(&self) -> u64 {
        self.chunks.values().map(|c| c.total).sum()
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                    PII PROCESSING STATISTICS                  \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("📊 SUMMARY\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "  Chunks Processed:      {}\n",
            self.total_chunks()
        ));
        output.push_str(&format!(
            "  Chunks with PII:       {}\n",
            self.chunks.values().map(|c| c.with_pii).sum::<u64>()
        ));
        output.push_str(&format!("  PII Instances:         {}\n", self.total()));
        output.push_str(&format!(
            "  Time (detect/decide/transform): {:.3}s / {:.3}s / {:.3}s\n",
            self.time.detect, self.time.decide, self.time.transform
        ));
        output.push('\n');

        for (lang, types) in &self.entities {
            output.push_str(&format!("🔍 PII INSTANCES [{lang}]\n"));
            output.push_str("───────────────────────────────────────────────────────────────\n");

            let mut sorted: Vec<_> = types.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1));
            for (pii_type, count) in sorted {
                output.push_str(&format!("  {:30} {:>5}\n", pii_type.as_str(), count));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write report to file
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = self.format_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Default for StatsReport {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Index<&'a str> for StatsReport {
    type Output = BTreeMap<PiiType, u64>;

    /// Counts for one language
    ///
    /// # Panics
    ///
    /// Panics if the language was never added nor recorded.
    fn index(&self, lang: &'a str) -> &Self::Output {
        &self.entities[lang]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en() -> Language {
        Language::new("en").unwrap()
    }

    fn counts(pairs: &[(PiiType, u64)]) -> BTreeMap<PiiType, u64> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn test_new_report_is_empty() {
        let report = StatsReport::new();
        assert_eq!(report.total(), 0);
        assert_eq!(report.total_chunks(), 0);
        assert_eq!(report.count("en", "PERSON"), 0);
    }

    #[test]
    fn test_record_accumulates() {
        let mut report = StatsReport::new();
        let timings = StageTimings {
            detect: Duration::from_millis(5),
            ..StageTimings::default()
        };
        report.record(&en(), &counts(&[(PiiType::PERSON, 2)]), &timings);
        report.record(&en(), &counts(&[(PiiType::PERSON, 1), (PiiType::URL, 1)]), &timings);
        report.record(&en(), &BTreeMap::new(), &timings);

        assert_eq!(report["en"]["PERSON"], 3);
        assert_eq!(report.count("en", "URL"), 1);
        assert_eq!(report.chunks[&en()].total, 3);
        assert_eq!(report.chunks[&en()].with_pii, 2);
        assert!(report.time.detect > 0.0);
        assert!(report.updated >= report.created);
    }

    #[test]
    fn test_language_without_pii_is_indexable() {
        let mut report = StatsReport::new();
        report.add_language(&Language::new("es").unwrap());
        report.record(&en(), &BTreeMap::new(), &StageTimings::default());

        assert!(report["en"].is_empty());
        assert!(report["es"].is_empty());
        assert_eq!(report.chunks[&en()].total, 1);
        assert_eq!(report.chunks[&en()].with_pii, 0);
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_format_console() {
        let mut report = StatsReport::new();
        report.record(
            &en(),
            &counts(&[(PiiType::EMAIL_ADDRESS, 4)]),
            &StageTimings::default(),
        );
        let output = report.format_console();
        assert!(output.contains("PII PROCESSING STATISTICS"));
        assert!(output.contains("Chunks Processed:      1"));
        assert!(output.contains("EMAIL_ADDRESS"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        let mut report = StatsReport::new();
        report.record(&en(), &counts(&[(PiiType::PERSON, 1)]), &StageTimings::default());
        report.write_to_file(&path).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["entities"]["en"]["PERSON"], 1);
    }
}
