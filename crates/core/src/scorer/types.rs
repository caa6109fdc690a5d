//! Types for the relevance scorer.

use serde::{Deserialize, Serialize};

use crate::marketplace::ExtensionRecord;

/// Per-component sub-scores. Each component is independently bounded and
/// the total score is always their sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Name match quality, 0-40.
    pub name: f32,
    /// Install count, 0-30.
    pub downloads: f32,
    /// Rating plus rating-count confidence, 0-20.
    pub rating: f32,
    /// Time since last update, 0-10.
    pub recency: f32,
}

impl ScoreBreakdown {
    /// Sum of the four components.
    pub fn total(&self) -> f32 {
        self.name + self.downloads + self.rating + self.recency
    }
}

/// An extension record with its relevance score. Immutable once computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub record: ExtensionRecord,
    /// Total relevance score in [0, 100].
    pub score: f32,
    pub breakdown: ScoreBreakdown,
}
