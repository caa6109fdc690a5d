//! Relevance scoring for marketplace search results.
//!
//! Converts raw `ExtensionRecord`s into a ranked, truncated list of
//! `ScoredCandidate`s. Four independent bounded sub-scores (name match,
//! install count, rating, recency) sum to a 0-100 total.

mod relevance;
mod types;

pub use relevance::{parse_last_updated, RelevanceScorer, ScorerConfig};
pub use types::*;
