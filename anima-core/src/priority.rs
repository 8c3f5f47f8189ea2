//! Priority Ranker — query-independent composite score per record.
//!
//! ```text
//! priority = importance·w₁ + pinned + recency(Δt) + quality(len) + tags + links
//! ```
//!
//! Every term is bounded and monotonic: more importance, more recency, more
//! content, more tags or more links never lower the score. `now` is always
//! injected.
//!
//! The store optimizer uses a *retention* variant: clamped importance plus
//! the classifier bonuses and an age adjustment, clamped to `[0, 10]`.

use chrono::{DateTime, Utc};

use crate::classify::WeightProfile;
use crate::config::{EngineConfig, PriorityWeights};
use crate::record::MemoryRecord;
use crate::types::{PriorityScore, age_days};

/// Retention bonus for symbolic content.
const SYMBOLIC_BONUS: f64 = 2.0;
/// Retention bonus for meaningful content.
const MEANINGFUL_BONUS: f64 = 2.0;
/// Records younger than this get [`FRESH_BONUS`].
const FRESH_DAYS: f64 = 7.0;
const FRESH_BONUS: f64 = 1.0;
/// Records older than this get [`STALE_PENALTY`].
const STALE_DAYS: f64 = 30.0;
const STALE_PENALTY: f64 = -1.0;
/// Bounds of the retention priority.
const RETENTION_MIN: f64 = 0.0;
const RETENTION_MAX: f64 = 10.0;

/// Per-term breakdown of a priority score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriorityBreakdown {
    /// `importance × w₁`.
    pub importance: f64,
    /// Pinned-record bonus.
    pub pinned: f64,
    /// Exponential recency term.
    pub recency: f64,
    /// Content-length quality term.
    pub quality: f64,
    /// Tag count term.
    pub tags: f64,
    /// Linked conversation count term.
    pub links: f64,
}

impl PriorityBreakdown {
    /// Sum of all terms.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.importance + self.pinned + self.recency + self.quality + self.tags + self.links
    }
}

/// Compute the full breakdown for one record.
///
/// `content_chars` is the character length of the record's normalized
/// content; callers that already normalized pass it in to avoid recomputing.
#[must_use]
pub fn compute_breakdown(
    record: &MemoryRecord,
    content_chars: usize,
    is_pinned: bool,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> PriorityBreakdown {
    let weights = &config.weights;
    PriorityBreakdown {
        importance: f64::from(record.clamped_importance()) * weights.importance,
        pinned: if is_pinned { weights.pinned_bonus } else { 0.0 },
        recency: recency_score(
            age_days(record.created_at, now),
            config.recency_half_life_days,
            weights.recency_max,
        ),
        quality: quality_score(content_chars, weights),
        tags: capped_count(record.tags.len(), weights.tag_cap, weights.tag_step),
        links: capped_count(
            record.linked_conversation_ids.len(),
            weights.link_cap,
            weights.link_step,
        ),
    }
}

/// Base priority score.
#[must_use]
pub fn priority(
    record: &MemoryRecord,
    content_chars: usize,
    is_pinned: bool,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> PriorityScore {
    PriorityScore::new(compute_breakdown(record, content_chars, is_pinned, now, config).total())
}

/// Retention priority used by the store optimizer, in `[0, 10]`.
///
/// Built on clamped importance alone, not on the base priority: recency,
/// quality, tag and link terms only break ties in the optimizer's sort.
#[must_use]
pub fn retention_priority(
    record: &MemoryRecord,
    profile: &WeightProfile,
    now: DateTime<Utc>,
) -> PriorityScore {
    let age = age_days(record.created_at, now);
    let mut score = f64::from(record.clamped_importance()) + profile.class.retention_bonus();
    if profile.is_symbolic {
        score += SYMBOLIC_BONUS;
    }
    if profile.is_meaningful {
        score += MEANINGFUL_BONUS;
    }
    if age < FRESH_DAYS {
        score += FRESH_BONUS;
    } else if age > STALE_DAYS {
        score += STALE_PENALTY;
    }
    PriorityScore::new(score.clamp(RETENTION_MIN, RETENTION_MAX))
}

/// `recency_max · 0.5^(age / half_life)`.
fn recency_score(age_days: f64, half_life_days: f64, recency_max: f64) -> f64 {
    if !half_life_days.is_finite() || half_life_days <= 0.0 {
        return 0.0;
    }
    recency_max * (-age_days / half_life_days * std::f64::consts::LN_2).exp()
}

#[allow(clippy::cast_precision_loss)]
fn quality_score(content_chars: usize, weights: &PriorityWeights) -> f64 {
    let saturation = weights.quality_saturation_chars.max(1) as f64;
    weights.quality_max * (content_chars as f64 / saturation).min(1.0)
}

#[allow(clippy::cast_precision_loss)]
fn capped_count(count: usize, cap: usize, step: f64) -> f64 {
    count.min(cap) as f64 * step
}
