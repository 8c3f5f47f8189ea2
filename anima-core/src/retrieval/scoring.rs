//! Per-factor scoring functions for lexical retrieval.
//!
//! relevance = Overlap · ImportanceFactor · RecencyMultiplier
//!
//! Where:
//!   Overlap           = Σ over query terms: 3·[in content] + 2·[in label] + 2·[in a tag]
//!   ImportanceFactor  = importance / 10
//!   RecencyMultiplier = max(floor, 1 − age / window)

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::record::{MAX_IMPORTANCE, MemoryRecord};
use crate::retrieval::RelevanceBreakdown;
use crate::types::age_days;

/// Weight of a query term found in content.
pub const CONTENT_WEIGHT: f64 = 3.0;
/// Weight of a query term found in the context label.
pub const LABEL_WEIGHT: f64 = 2.0;
/// Weight of a query term found in any tag.
pub const TAG_WEIGHT: f64 = 2.0;
/// Query words must be longer than this many characters.
const MIN_TERM_CHARS: usize = 3;

/// Content words of a query: lower-cased, split on anything that is not a
/// letter or digit, longer than three characters, deduplicated in order.
#[must_use]
pub fn query_terms(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let mut terms: Vec<String> = Vec::new();
    for word in lower.split(|c: char| !c.is_alphanumeric()) {
        if word.chars().count() > MIN_TERM_CHARS && !terms.iter().any(|t| t == word) {
            terms.push(word.to_string());
        }
    }
    terms
}

/// Compute the full relevance breakdown for one record.
///
/// `lower_content` is the record's normalized content, lower-cased.
#[must_use]
pub fn compute_breakdown(
    record: &MemoryRecord,
    lower_content: &str,
    terms: &[String],
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> RelevanceBreakdown {
    let lower_label = record.context_label.to_lowercase();
    let lower_tags: Vec<String> = record.tags.iter().map(|t| t.to_lowercase()).collect();

    let mut overlap = 0.0;
    let mut matched_terms = Vec::new();
    for term in terms {
        let mut term_score = 0.0;
        if lower_content.contains(term.as_str()) {
            term_score += CONTENT_WEIGHT;
        }
        if lower_label.contains(term.as_str()) {
            term_score += LABEL_WEIGHT;
        }
        if lower_tags.iter().any(|t| t.contains(term.as_str())) {
            term_score += TAG_WEIGHT;
        }
        if term_score > 0.0 {
            overlap += term_score;
            matched_terms.push(term.clone());
        }
    }

    RelevanceBreakdown {
        overlap,
        importance_factor: importance_factor(record),
        recency_multiplier: recency_multiplier(
            age_days(record.created_at, now),
            config.recency_window_days,
            config.recency_floor,
        ),
        matched_terms,
    }
}

/// `importance / 10`, with importance clamped into range.
#[must_use]
pub fn importance_factor(record: &MemoryRecord) -> f64 {
    f64::from(record.clamped_importance()) / f64::from(MAX_IMPORTANCE)
}

/// Linear decay from 1.0 (age 0) to `floor` (age ≥ window).
///
/// Total for any inputs: the floor is forced into `[0, 1]` (non-finite
/// floors become 0) and an unusable window yields the floor.
#[must_use]
pub fn recency_multiplier(age_days: f64, window_days: f64, floor: f64) -> f64 {
    let floor = if floor.is_finite() { floor.clamp(0.0, 1.0) } else { 0.0 };
    if !window_days.is_finite() || window_days <= 0.0 {
        return floor;
    }
    (1.0 - age_days / window_days).clamp(floor, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn query_terms_drop_short_words_and_duplicates() {
        assert_eq!(
            query_terms("A hazatalálás, a HAZATALÁLÁS és az otthon?"),
            vec!["hazatalálás".to_string(), "otthon".to_string()]
        );
        assert!(query_terms("a b cde").is_empty());
        assert!(query_terms("").is_empty());
    }

    #[test]
    fn four_letter_words_count() {
        assert_eq!(query_terms("home is here"), vec!["home".to_string(), "here".to_string()]);
    }

    #[test]
    fn overlap_weights_fields() {
        let now = Utc::now();
        let record = MemoryRecord::new("We walked home.", "Home talk", 10, now).with_tags(["homecoming"]);
        let terms = query_terms("home");
        let b = compute_breakdown(&record, "we walked home.", &terms, now, &EngineConfig::default());
        assert!((b.overlap - 7.0).abs() < f64::EPSILON);
        assert_eq!(b.matched_terms, vec!["home".to_string()]);
        assert!((b.importance_factor - 1.0).abs() < f64::EPSILON);
        assert!((b.recency_multiplier - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrelated_record_has_zero_overlap() {
        let now = Utc::now();
        let record = MemoryRecord::new("Weather talk.", "chat", 5, now);
        let b = compute_breakdown(&record, "weather talk.", &query_terms("hazatalálás"), now, &EngineConfig::default());
        assert!(b.overlap.abs() < f64::EPSILON);
        assert!(b.total().abs() < f64::EPSILON);
    }

    #[test]
    fn recency_decays_linearly_to_floor() {
        assert!((recency_multiplier(0.0, 30.0, 0.1) - 1.0).abs() < f64::EPSILON);
        assert!((recency_multiplier(15.0, 30.0, 0.1) - 0.5).abs() < 1e-9);
        assert!((recency_multiplier(30.0, 30.0, 0.1) - 0.1).abs() < 1e-9);
        assert!((recency_multiplier(300.0, 30.0, 0.1) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn recency_tolerates_unvalidated_bounds() {
        assert!((recency_multiplier(5.0, 30.0, 1.5) - 1.0).abs() < f64::EPSILON);
        assert!((recency_multiplier(5.0, 30.0, f64::NAN) - (1.0 - 5.0 / 30.0)).abs() < 1e-9);
        assert!((recency_multiplier(5.0, 30.0, -0.5) - (1.0 - 5.0 / 30.0)).abs() < 1e-9);
        assert!((recency_multiplier(5.0, f64::NAN, 0.1) - 0.1).abs() < f64::EPSILON);
        assert!((recency_multiplier(5.0, f64::INFINITY, 0.1) - 0.1).abs() < f64::EPSILON);
        assert!((recency_multiplier(5.0, 0.0, 0.2) - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn old_records_keep_floor_relevance() {
        let now = Utc::now();
        let record = MemoryRecord::new("home", "chat", 10, now - Duration::days(365));
        let b = compute_breakdown(&record, "home", &query_terms("home"), now, &EngineConfig::default());
        assert!((b.total() - 0.3).abs() < 1e-9);
    }
}
