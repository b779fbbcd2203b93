//! Overlap-resolving decision engine

use super::DecisionEngine;
use crate::domain::chunk::DocumentChunk;
use crate::domain::pii::PiiInstance;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Which instance wins when two detections overlap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Longest span wins
    #[default]
    Longest,
    /// Highest score wins
    Score,
    /// Leftmost span wins
    First,
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::Longest => f.write_str("longest"),
            OverlapPolicy::Score => f.write_str("score"),
            OverlapPolicy::First => f.write_str("first"),
        }
    }
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "longest" => Ok(OverlapPolicy::Longest),
            "score" => Ok(OverlapPolicy::Score),
            "first" => Ok(OverlapPolicy::First),
            other => Err(format!(
                "Invalid overlap policy '{other}'. Must be one of: longest, score, first"
            )),
        }
    }
}

/// Drops low-score detections and resolves overlaps deterministically
///
/// Candidates are ranked by the overlap policy, then by the remaining
/// criteria (length, score, start, task id, type), and accepted greedily.
/// The output never overlaps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapDecider {
    policy: OverlapPolicy,
    min_score: f32,
}

impl OverlapDecider {
    /// Create a decider
    pub fn new(policy: OverlapPolicy, min_score: f32) -> Self {
        Self {
            policy,
            min_score: min_score.clamp(0.0, 1.0),
        }
    }

    /// Ranking, best first
    fn rank(&self, a: &PiiInstance, b: &PiiInstance) -> Ordering {
        let by_len = b.len().cmp(&a.len());
        let by_score = score(b).total_cmp(&score(a));
        let by_start = a.start.cmp(&b.start);
        let primary = match self.policy {
            OverlapPolicy::Longest => by_len.then(by_score).then(by_start),
            OverlapPolicy::Score => by_score.then(by_len).then(by_start),
            OverlapPolicy::First => by_start.then(by_len).then(by_score),
        };
        primary
            .then_with(|| a.detector.cmp(&b.detector))
            .then_with(|| a.pii_type.cmp(&b.pii_type))
    }
}

impl Default for OverlapDecider {
    fn default() -> Self {
        Self::new(OverlapPolicy::default(), 0.0)
    }
}

fn score(instance: &PiiInstance) -> f32 {
    instance.score.unwrap_or(0.0)
}

impl DecisionEngine for OverlapDecider {
    fn name(&self) -> &str {
        match self.policy {
            OverlapPolicy::Longest => "overlap:longest",
            OverlapPolicy::Score => "overlap:score",
            OverlapPolicy::First => "overlap:first",
        }
    }

    fn decide(
        &self,
        _chunk: &DocumentChunk,
        instances: Vec<PiiInstance>,
    ) -> anyhow::Result<Vec<PiiInstance>> {
        let mut candidates: Vec<PiiInstance> = instances
            .into_iter()
            .filter(|i| i.score.map_or(true, |s| s >= self.min_score))
            .collect();
        candidates.sort_by(|a, b| self.rank(a, b));

        let mut accepted: Vec<PiiInstance> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !accepted.iter().any(|kept| kept.overlaps(&candidate)) {
                accepted.push(candidate);
            }
        }
        accepted.sort_by_key(|i| (i.start, i.end));
        Ok(accepted)
    }
}
