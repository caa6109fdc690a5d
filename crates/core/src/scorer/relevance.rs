//! Relevance scoring implementation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::marketplace::ExtensionRecord;

use super::types::{ScoreBreakdown, ScoredCandidate};

/// Install counts above this are clamped before the float transform.
const MAX_INSTALL_COUNT: u64 = 1_000_000_000_000_000;

/// Configuration for the relevance scorer.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Shape constant for the install-count curve. Larger values push the
    /// curve's knee toward higher counts.
    pub download_curve_k: f64,
    /// Shape constant for the rating-count confidence bonus. A count equal
    /// to this already yields half the bonus.
    pub rating_confidence_k: f64,
    /// Half-life of the recency decay in days.
    pub recency_half_life_days: f64,
    /// How many candidates to keep after ranking.
    pub max_results: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            download_curve_k: 6.0,
            rating_confidence_k: 2.0,
            recency_half_life_days: 90.0,
            max_results: 5,
        }
    }
}

/// Scores and ranks extension records against a query.
pub struct RelevanceScorer {
    config: ScorerConfig,
}

impl RelevanceScorer {
    /// Create a scorer with default config.
    pub fn new() -> Self {
        Self {
            config: ScorerConfig::default(),
        }
    }

    /// Create a scorer with custom config.
    pub fn with_config(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Rank records against a query, best first.
    ///
    /// Returns at most `max_results` candidates, sorted by total score
    /// descending, ties broken by install count descending, then by
    /// identifier so the ordering is fully deterministic.
    pub fn rank(&self, query: &str, records: &[ExtensionRecord]) -> Vec<ScoredCandidate> {
        self.rank_at(query, records, Utc::now())
    }

    /// Rank with an explicit "now" for the recency component.
    pub fn rank_at(
        &self,
        query: &str,
        records: &[ExtensionRecord],
        now: DateTime<Utc>,
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = records
            .iter()
            .map(|r| self.score_record(query, r, now))
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.record.install_count.cmp(&a.record.install_count))
                .then_with(|| a.record.identifier().cmp(&b.record.identifier()))
        });
        scored.truncate(self.config.max_results);

        debug!(
            query = query,
            candidates = scored.len(),
            top = scored.first().map(|c| c.record.identifier()).as_deref(),
            "Ranked search results"
        );

        scored
    }

    /// Score a single record.
    fn score_record(
        &self,
        query: &str,
        record: &ExtensionRecord,
        now: DateTime<Utc>,
    ) -> ScoredCandidate {
        let breakdown = ScoreBreakdown {
            name: self.name_score(query, record),
            downloads: self.download_score(record.install_count),
            rating: self.rating_score(record.average_rating, record.rating_count),
            recency: self.recency_score(record.last_updated.as_deref(), now),
        };

        ScoredCandidate {
            record: record.clone(),
            score: breakdown.total(),
            breakdown,
        }
    }

    /// Name match component (0-40).
    ///
    /// Tiers are mutually exclusive; only the best applicable one counts:
    /// exact match 40, whole word 30, substring 20, otherwise 0. Matching
    /// is case-insensitive against both the display name and the
    /// extension id.
    fn name_score(&self, query: &str, record: &ExtensionRecord) -> f32 {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return 0.0;
        }

        let display = record.display_name.to_lowercase();
        let ext_id = record.extension_id.to_lowercase();

        if display == query || ext_id == query {
            return 40.0;
        }

        let is_word = |text: &str| {
            text.split(|c: char| !c.is_alphanumeric())
                .any(|token| token == query)
        };
        if is_word(&display) || is_word(&ext_id) {
            return 30.0;
        }

        if display.contains(&query) || ext_id.contains(&query) {
            return 20.0;
        }

        0.0
    }

    /// Install count component (0-30).
    ///
    /// Saturating log curve: zero installs score 0, growth flattens at
    /// large counts and approaches but never reaches 30. The count is
    /// clamped before the transform so `u64::MAX` is safe.
    fn download_score(&self, install_count: u64) -> f32 {
        if install_count == 0 {
            return 0.0;
        }
        let clamped = install_count.min(MAX_INSTALL_COUNT) as f64;
        let log = (1.0 + clamped).ln();
        (30.0 * log / (log + self.config.download_curve_k)) as f32
    }

    /// Rating component (0-20).
    ///
    /// Linear map of the 0-5 average to 15 points, plus a saturating
    /// confidence bonus of up to 5 points from the rating count. Zero
    /// ratings score 0 regardless of the reported average.
    fn rating_score(&self, average_rating: f32, rating_count: u64) -> f32 {
        if rating_count == 0 {
            return 0.0;
        }
        let avg = average_rating.clamp(0.0, 5.0) as f64;
        let count = rating_count as f64;
        let base = 15.0 * avg / 5.0;
        let confidence = 5.0 * count / (count + self.config.rating_confidence_k);
        (base + confidence) as f32
    }

    /// Recency component (0-10).
    ///
    /// Exponential decay from 10 toward 0 with age since last update.
    /// Absent or unparseable timestamps contribute 0; future timestamps
    /// count as "just updated".
    fn recency_score(&self, last_updated: Option<&str>, now: DateTime<Utc>) -> f32 {
        let updated = match last_updated.and_then(parse_last_updated) {
            Some(dt) => dt,
            None => return 0.0,
        };

        let age_days = (now - updated).num_seconds().max(0) as f64 / 86_400.0;
        (10.0 * 0.5f64.powf(age_days / self.config.recency_half_life_days)) as f32
    }
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a gallery last-updated timestamp.
///
/// The gallery is not consistent about formats, so several are tried in
/// order before giving up.
pub fn parse_last_updated(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|ndt| ndt.and_utc())
        })
}
