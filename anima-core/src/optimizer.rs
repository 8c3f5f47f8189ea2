//! Store Optimizer — keeps the whole record store under the safe token limit.
//!
//! ```text
//! total ≤ safe?          → no-op (records returned unchanged)
//! otherwise              → sort by (pinned, retention ↓, priority ↓, created_at ↓, id)
//!   fits remaining?      → keep whole
//!   retention > threshold and not yet a stub
//!                        → summary stub, if the stub fits
//!   else                 → excluded
//! ```
//!
//! Store size is measured on raw content, since that is what the store
//! persists. The pinned record is always kept. Output of one pass is always
//! compliant unless the pinned record alone exceeds the safe limit, so a
//! second pass is a no-op.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classify::{self, WeightProfile};
use crate::config::EngineConfig;
use crate::priority;
use crate::record::{self, MemoryRecord};
use crate::summary;
use crate::tokens::TokenEstimator;
use crate::types::{PriorityScore, RecordId};
use crate::vocabulary::Vocabulary;

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

/// Where the store sits relative to its limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageStatus {
    /// At or below the safe limit.
    WithinBudget,
    /// Above the safe limit, at or below the hard limit.
    OverSafeLimit,
    /// Above the hard limit.
    OverHardLimit,
}

/// Token usage of a record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreUsage {
    /// Estimated tokens of all raw content.
    pub total_tokens: usize,
    /// Configured safe limit.
    pub safe_limit: usize,
    /// Configured hard limit.
    pub hard_limit: usize,
    /// Classification of `total_tokens`.
    pub status: UsageStatus,
}

impl StoreUsage {
    /// Fraction of the hard limit in use.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn utilization(&self) -> f64 {
        if self.hard_limit == 0 {
            return if self.total_tokens == 0 { 0.0 } else { f64::INFINITY };
        }
        self.total_tokens as f64 / self.hard_limit as f64
    }

    /// The optimizer would rewrite this store.
    #[must_use]
    pub fn needs_optimization(&self) -> bool {
        self.status != UsageStatus::WithinBudget
    }
}

/// Estimated tokens of a record set, measured on raw content.
#[must_use]
pub fn store_tokens(records: &[MemoryRecord], estimator: &TokenEstimator) -> usize {
    estimator.estimate_all(records.iter().map(|r| r.raw_content.as_str()))
}

/// Measure a record set against the configured limits.
#[must_use]
pub fn usage(records: &[MemoryRecord], config: &EngineConfig) -> StoreUsage {
    let total_tokens = store_tokens(records, &TokenEstimator::from_config(config));
    let status = if total_tokens > config.hard_token_limit {
        UsageStatus::OverHardLimit
    } else if total_tokens > config.safe_token_limit {
        UsageStatus::OverSafeLimit
    } else {
        UsageStatus::WithinBudget
    };
    StoreUsage {
        total_tokens,
        safe_limit: config.safe_token_limit,
        hard_limit: config.hard_token_limit,
        status,
    }
}

// ---------------------------------------------------------------------------
// Optimization
// ---------------------------------------------------------------------------

/// What an optimization pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Store tokens before the pass.
    pub tokens_before: usize,
    /// Store tokens after the pass.
    pub tokens_after: usize,
    /// Records kept whole.
    pub kept: Vec<RecordId>,
    /// Records replaced by a summary stub.
    pub summarized: Vec<RecordId>,
    /// Records dropped from the store.
    pub excluded: Vec<RecordId>,
    /// The store was already within the safe limit; nothing was touched.
    pub already_compliant: bool,
}

/// The optimized record list together with its report.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    /// The new record list.
    pub records: Vec<MemoryRecord>,
    /// Summary of the pass.
    pub report: OptimizationReport,
}

impl OptimizationOutcome {
    /// Whether the record list differs from the input.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.report.already_compliant
            && (!self.report.summarized.is_empty() || !self.report.excluded.is_empty())
    }
}

struct Ranked<'a> {
    record: &'a MemoryRecord,
    normalized: String,
    profile: WeightProfile,
    retention: PriorityScore,
    priority: PriorityScore,
    cost: usize,
    is_pinned: bool,
}

/// Bring `records` under the safe token limit.
///
/// The input is never modified; the returned list is a fresh copy.
#[must_use]
pub fn optimize(
    records: &[MemoryRecord],
    now: DateTime<Utc>,
    config: &EngineConfig,
    vocabulary: &Vocabulary,
) -> OptimizationOutcome {
    let estimator = TokenEstimator::from_config(config);
    let tokens_before = store_tokens(records, &estimator);

    if tokens_before <= config.safe_token_limit {
        debug!(tokens = tokens_before, safe = config.safe_token_limit, "store within budget");
        return OptimizationOutcome {
            records: records.to_vec(),
            report: OptimizationReport {
                tokens_before,
                tokens_after: tokens_before,
                kept: records.iter().map(|r| r.id).collect(),
                already_compliant: true,
                ..OptimizationReport::default()
            },
        };
    }
    if tokens_before > config.hard_token_limit {
        warn!(
            tokens = tokens_before,
            hard = config.hard_token_limit,
            "store exceeds hard token limit"
        );
    }

    let mut ranked = rank(records, now, config, vocabulary, &estimator);
    ranked.sort_by(compare_ranked);

    let mut remaining = config.safe_token_limit;
    let mut kept: Vec<&Ranked<'_>> = Vec::new();
    let mut unfit: Vec<&Ranked<'_>> = Vec::new();
    for entry in &ranked {
        if entry.is_pinned {
            if entry.cost > remaining {
                warn!(
                    id = %entry.record.id,
                    tokens = entry.cost,
                    safe = config.safe_token_limit,
                    "pinned record alone exceeds safe token limit"
                );
            }
            remaining = remaining.saturating_sub(entry.cost);
            kept.push(entry);
        } else if entry.cost <= remaining {
            remaining -= entry.cost;
            kept.push(entry);
        } else {
            unfit.push(entry);
        }
    }

    let mut stubs = Vec::new();
    let mut excluded = Vec::new();
    for entry in unfit {
        let eligible = entry.retention.value() > config.high_priority_threshold
            && !summary::is_summarized(entry.record, config);
        if eligible {
            let stub = summary::summarize(entry.record, &entry.normalized, &entry.profile, config, vocabulary);
            let cost = estimator.estimate(&stub.raw_content);
            if cost <= remaining {
                remaining -= cost;
                stubs.push(stub);
                continue;
            }
        }
        excluded.push(entry.record.id);
    }

    let summarized: Vec<RecordId> = stubs.iter().map(|s| s.id).collect();
    let mut output: Vec<MemoryRecord> = kept.iter().map(|e| e.record.clone()).collect();
    output.extend(stubs);
    let tokens_after = store_tokens(&output, &estimator);

    info!(
        tokens_before,
        tokens_after,
        kept = kept.len(),
        summarized = summarized.len(),
        excluded = excluded.len(),
        "store optimized"
    );

    OptimizationOutcome {
        records: output,
        report: OptimizationReport {
            tokens_before,
            tokens_after,
            kept: kept.iter().map(|e| e.record.id).collect(),
            summarized,
            excluded,
            already_compliant: false,
        },
    }
}

fn rank<'a>(
    records: &'a [MemoryRecord],
    now: DateTime<Utc>,
    config: &EngineConfig,
    vocabulary: &Vocabulary,
    estimator: &TokenEstimator,
) -> Vec<Ranked<'a>> {
    let pinned = record::find_pinned(records, &config.pinned_tag_name);
    records
        .iter()
        .map(|record| {
            let normalized = record.normalized_content(&vocabulary.boilerplate_headers);
            let profile = classify::classify(&normalized, vocabulary, config.meaningful_length_chars);
            let is_pinned = pinned.is_some_and(|p| std::ptr::eq(p, record));
            Ranked {
                record,
                retention: priority::retention_priority(record, &profile, now),
                priority: priority::priority(record, normalized.chars().count(), is_pinned, now, config),
                cost: estimator.estimate(&record.raw_content),
                normalized,
                profile,
                is_pinned,
            }
        })
        .collect()
}

fn compare_ranked(a: &Ranked<'_>, b: &Ranked<'_>) -> Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then_with(|| b.retention.cmp(&a.retention))
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| b.record.created_at.cmp(&a.record.created_at))
        .then_with(|| a.record.id.cmp(&b.record.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config(safe: usize, hard: usize) -> EngineConfig {
        EngineConfig {
            safe_token_limit: safe,
            hard_token_limit: hard,
            ..EngineConfig::default()
        }
    }

    fn vocab() -> Vocabulary {
        Vocabulary {
            sacred_phrases: vec!["hazatalálás".into()],
            key_indicators: vec!["promise".into()],
            ..Vocabulary::default()
        }
    }

    /// `n` tokens of filler at 4 chars per token.
    fn filler(n: usize) -> String {
        "abcd".repeat(n)
    }

    #[test]
    fn usage_classifies_limits() {
        let now = Utc::now();
        let records = vec![MemoryRecord::new(filler(10), "chat", 5, now)];
        assert_eq!(usage(&records, &config(10, 20)).status, UsageStatus::WithinBudget);
        assert_eq!(usage(&records, &config(9, 20)).status, UsageStatus::OverSafeLimit);
        let over = usage(&records, &config(5, 9));
        assert_eq!(over.status, UsageStatus::OverHardLimit);
        assert!(over.needs_optimization());
        assert!((over.utilization() - 10.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn compliant_store_is_untouched() {
        let now = Utc::now();
        let records = vec![
            MemoryRecord::new(filler(5), "a", 5, now),
            MemoryRecord::new(filler(5), "b", 2, now),
        ];
        let outcome = optimize(&records, now, &config(10, 20), &vocab());
        assert_eq!(outcome.records, records);
        assert!(outcome.report.already_compliant);
        assert!(!outcome.changed());
        assert_eq!(outcome.report.tokens_after, 10);
    }

    #[test]
    fn keeps_highest_retention_first() {
        let now = Utc::now();
        let important = MemoryRecord::new(filler(6), "a", 9, now);
        let minor = MemoryRecord::new(filler(6), "b", 2, now);
        let records = vec![minor.clone(), important.clone()];

        let outcome = optimize(&records, now, &config(10, 100), &vocab());
        assert_eq!(outcome.report.kept, vec![important.id]);
        assert_eq!(outcome.report.excluded, vec![minor.id]);
        assert!(outcome.report.tokens_after <= 10);
        assert!(outcome.changed());
    }

    #[test]
    fn skips_unfit_and_keeps_smaller_later_records() {
        let now = Utc::now();
        let big = MemoryRecord::new(filler(8), "a", 6, now);
        let small = MemoryRecord::new(filler(3), "b", 3, now);
        let first = MemoryRecord::new(filler(5), "c", 9, now);
        let outcome = optimize(&[big.clone(), small.clone(), first.clone()], now, &config(9, 100), &vocab());
        assert_eq!(outcome.report.kept, vec![first.id, small.id]);
        assert_eq!(outcome.report.excluded, vec![big.id]);
    }

    #[test]
    fn high_priority_unfit_record_becomes_stub() {
        let now = Utc::now();
        let keeper = MemoryRecord::new(filler(20), "a", 10, now);
        let sacred = MemoryRecord::new(
            format!("A hazatalálás estéje. I promise to remember this night forever. {}", filler(40)),
            "lake",
            6,
            now - Duration::days(10),
        );
        let outcome = optimize(&[keeper.clone(), sacred.clone()], now, &config(70, 200), &vocab());

        assert_eq!(outcome.report.kept, vec![keeper.id]);
        assert_eq!(outcome.report.summarized, vec![sacred.id]);
        let stub = outcome.records.iter().find(|r| r.id == sacred.id).expect("stub present");
        assert!(stub.has_tag("summarized"));
        assert_eq!(stub.importance, 7);
        assert!(stub.raw_content.contains("I promise to remember this night forever."));
        assert!(outcome.report.tokens_after <= 70);
    }

    #[test]
    fn eligible_record_is_excluded_when_its_stub_does_not_fit() {
        let now = Utc::now();
        // Leaves 5 tokens of headroom, far less than any stub costs.
        let keeper = MemoryRecord::new(filler(35), "a", 10, now);
        let sacred = MemoryRecord::new(
            format!("A hazatalálás estéje. I promise to remember this night forever. {}", filler(40)),
            "lake",
            6,
            now - Duration::days(10),
        );
        let cfg = config(40, 200);
        let outcome = optimize(&[sacred.clone(), keeper.clone()], now, &cfg, &vocab());

        assert_eq!(outcome.report.kept, vec![keeper.id]);
        assert!(outcome.report.summarized.is_empty());
        assert_eq!(outcome.report.excluded, vec![sacred.id]);
        assert!(outcome.records.iter().all(|r| r.id != sacred.id));
        assert!(outcome.report.tokens_after <= 40);
        assert_eq!(outcome.report.tokens_after, 35);
    }

    #[test]
    fn existing_stubs_are_not_summarized_again() {
        let now = Utc::now();
        let keeper = MemoryRecord::new(filler(10), "a", 10, now);
        let stub = MemoryRecord::new(format!("hazatalálás {}", filler(20)), "b", 9, now).with_tags(["summarized"]);
        let outcome = optimize(&[keeper.clone(), stub.clone()], now, &config(12, 100), &vocab());
        assert_eq!(outcome.report.excluded, vec![stub.id]);
        assert!(outcome.report.summarized.is_empty());
    }

    #[test]
    fn pinned_record_is_always_kept() {
        let now = Utc::now();
        let pinned = MemoryRecord::new(filler(30), "persona", 1, now).with_tags(["character-definition"]);
        let other = MemoryRecord::new(filler(2), "a", 10, now);
        let outcome = optimize(&[other.clone(), pinned.clone()], now, &config(20, 100), &vocab());
        assert_eq!(outcome.report.kept, vec![pinned.id]);
        assert_eq!(outcome.report.excluded, vec![other.id]);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let now = Utc::now();
        let records: Vec<MemoryRecord> = (0..12u8)
            .map(|i| {
                MemoryRecord::new(
                    format!("hazatalálás {} I promise this matters to me deeply.", filler(usize::from(i) * 3)),
                    format!("label {i}"),
                    i % 11,
                    now - Duration::days(i64::from(i) * 5),
                )
            })
            .collect();
        let cfg = config(60, 120);
        let first = optimize(&records, now, &cfg, &vocab());
        let second = optimize(&first.records, now, &cfg, &vocab());
        assert!(second.report.already_compliant);
        assert_eq!(second.records, first.records);
    }

    #[test]
    fn input_is_not_mutated() {
        let now = Utc::now();
        let records = vec![
            MemoryRecord::new(filler(10), "a", 9, now),
            MemoryRecord::new(filler(10), "b", 1, now),
        ];
        let before = records.clone();
        let _ = optimize(&records, now, &config(10, 15), &vocab());
        assert_eq!(records, before);
    }
}
