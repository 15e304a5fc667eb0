//! Probe-vs-known comparison strategies.

use crate::types::Embedding;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default cosine similarity threshold for ArcFace embeddings.
pub const DEFAULT_COSINE_THRESHOLD: f32 = 0.40;
/// Default distance tolerance for dlib-style 128-d encodings.
pub const DEFAULT_EUCLIDEAN_TOLERANCE: f32 = 0.6;

/// Strategy for comparing a probe embedding against the known encodings.
pub trait Matcher {
    /// One boolean per known encoding, in order: is the probe a match for it?
    fn compare_faces(&self, known: &[Embedding], probe: &Embedding) -> Vec<bool>;
}

/// Matches when cosine similarity is at least `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct CosineMatcher {
    pub threshold: f32,
}

impl Matcher for CosineMatcher {
    fn compare_faces(&self, known: &[Embedding], probe: &Embedding) -> Vec<bool> {
        known
            .iter()
            .map(|k| probe.similarity(k) >= self.threshold)
            .collect()
    }
}

/// Matches when Euclidean distance is at most `tolerance`.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
    pub tolerance: f32,
}

impl Matcher for EuclideanMatcher {
    fn compare_faces(&self, known: &[Embedding], probe: &Embedding) -> Vec<bool> {
        known
            .iter()
            .map(|k| probe.euclidean_distance(k) <= self.tolerance)
            .collect()
    }
}

/// Which comparison the server uses, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMetric {
    Cosine,
    Euclidean,
}

impl MatchMetric {
    pub fn default_threshold(self) -> f32 {
        match self {
            MatchMetric::Cosine => DEFAULT_COSINE_THRESHOLD,
            MatchMetric::Euclidean => DEFAULT_EUCLIDEAN_TOLERANCE,
        }
    }

    pub fn matcher(self, threshold: f32) -> Box<dyn Matcher + Send + Sync> {
        match self {
            MatchMetric::Cosine => Box::new(CosineMatcher { threshold }),
            MatchMetric::Euclidean => Box::new(EuclideanMatcher { tolerance: threshold }),
        }
    }
}

impl fmt::Display for MatchMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMetric::Cosine => f.write_str("cosine"),
            MatchMetric::Euclidean => f.write_str("euclidean"),
        }
    }
}

impl FromStr for MatchMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(MatchMetric::Cosine),
            "euclidean" => Ok(MatchMetric::Euclidean),
            other => Err(format!("unknown match metric {other:?} (expected cosine or euclidean)")),
        }
    }
}
