//! Relevance Retrieval — lexical overlap scaled by importance and recency.
//!
//! Each record is scored against a live query:
//!   relevance = Overlap × ImportanceFactor × RecencyMultiplier
//!
//! Records with zero relevance are dropped. The rest are ranked by
//! descending relevance, ties broken by descending `created_at` and then by
//! record id, so the order never depends on input order.

pub mod scoring;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::EngineConfig;
use crate::record::MemoryRecord;
use crate::types::RelevanceScore;
use crate::vocabulary::Vocabulary;

/// A scored retrieval result.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// The retrieved record.
    pub record: MemoryRecord,
    /// Combined relevance score.
    pub score: RelevanceScore,
    /// Per-factor breakdown.
    pub breakdown: RelevanceBreakdown,
}

/// Breakdown of a relevance score into its factors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelevanceBreakdown {
    /// Weighted count of query terms found in content, label and tags.
    pub overlap: f64,
    /// `importance / 10`.
    pub importance_factor: f64,
    /// Linear recency decay with a floor.
    pub recency_multiplier: f64,
    /// Query terms that matched at least one field.
    pub matched_terms: Vec<String>,
}

impl RelevanceBreakdown {
    /// Product of the three factors.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.overlap * self.importance_factor * self.recency_multiplier
    }
}

/// Retrieve the top-`k` records relevant to `query`.
///
/// Empty queries, empty record sets and `k == 0` all yield an empty result.
#[must_use]
pub fn retrieve(
    query: &str,
    records: &[MemoryRecord],
    k: usize,
    now: DateTime<Utc>,
    config: &EngineConfig,
    vocabulary: &Vocabulary,
) -> Vec<RetrievalResult> {
    let terms = scoring::query_terms(query);
    if terms.is_empty() || records.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut results: Vec<RetrievalResult> = records
        .iter()
        .filter_map(|record| {
            let lower_content = record
                .normalized_content(&vocabulary.boilerplate_headers)
                .to_lowercase();
            let breakdown = scoring::compute_breakdown(record, &lower_content, &terms, now, config);
            let score = RelevanceScore::new(breakdown.total());
            (!score.is_zero()).then(|| RetrievalResult {
                record: record.clone(),
                score,
                breakdown,
            })
        })
        .collect();

    results.sort_by(compare_results);
    let matched = results.len();
    results.truncate(k);

    debug!(
        terms = terms.len(),
        candidates = records.len(),
        matched,
        returned = results.len(),
        "retrieval complete"
    );
    results
}

fn compare_results(a: &RetrievalResult, b: &RetrievalResult) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.record.created_at.cmp(&a.record.created_at))
        .then_with(|| a.record.id.cmp(&b.record.id))
}
