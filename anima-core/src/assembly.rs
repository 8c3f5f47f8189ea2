//! Context Assembler — packs memory into a token budget for one query.
//!
//! ```text
//! 1. pinned record, whole            (always; flags over_budget if it alone exceeds)
//! 2. other records → paragraphs      (blank-line split, short segments dropped)
//! 3. everything fits?   → verbatim   (records by priority, paragraphs in order)
//! 4. otherwise          → ranked     (query 3 · synonym 1 · length ≤2, greedy, stop at first misfit)
//! ```
//!
//! Paragraphs are never truncated. Cost is tracked in characters and turned
//! into tokens by the shared [`TokenEstimator`], so the reported estimate is
//! exactly the estimate of the returned text.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::normalize;
use crate::priority;
use crate::record::{self, MemoryRecord};
use crate::retrieval::scoring::query_terms;
use crate::tokens::TokenEstimator;
use crate::types::{PriorityScore, RecordId};
use crate::vocabulary::Vocabulary;

/// Separator placed between assembled pieces.
pub const PIECE_SEPARATOR: &str = "\n\n";
const SEPARATOR_CHARS: usize = 2;

/// Weight of a query term found in a paragraph.
const QUERY_TERM_WEIGHT: u32 = 3;
/// Weight of a synonym of a query term found in a paragraph.
const SYNONYM_WEIGHT: u32 = 1;

/// How the context was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyMode {
    /// Nothing beyond the pinned record (if any) was available or affordable.
    Empty,
    /// All paragraphs fit and were included in record-priority order.
    Verbatim,
    /// Paragraphs were scored against the query and packed greedily.
    Ranked,
}

/// An assembled context, ready for the generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The context text.
    pub text: String,
    /// Token estimate of `text`.
    pub token_estimate: usize,
    /// The budget was zero or the pinned record alone exceeded it.
    pub over_budget: bool,
    /// Assembly strategy used.
    pub mode: AssemblyMode,
    /// Records contributing at least one piece, in order of first appearance.
    pub included_records: Vec<RecordId>,
}

struct Prepared<'a> {
    record: &'a MemoryRecord,
    normalized: String,
    priority: PriorityScore,
}

struct Candidate<'a> {
    owner: usize,
    position: usize,
    text: &'a str,
    chars: usize,
    score: u32,
}

/// Running text plus its character count.
struct Builder {
    text: String,
    chars: usize,
    included: Vec<RecordId>,
}

impl Builder {
    fn new() -> Self {
        Self {
            text: String::new(),
            chars: 0,
            included: Vec::new(),
        }
    }

    /// Character count after appending a piece of `piece_chars` characters.
    fn chars_with(&self, piece_chars: usize) -> usize {
        if self.chars == 0 {
            piece_chars
        } else {
            self.chars + SEPARATOR_CHARS + piece_chars
        }
    }

    fn push(&mut self, piece: &str, piece_chars: usize, owner: RecordId) {
        if piece.is_empty() {
            return;
        }
        self.chars = self.chars_with(piece_chars);
        if !self.text.is_empty() {
            self.text.push_str(PIECE_SEPARATOR);
        }
        self.text.push_str(piece);
        if !self.included.contains(&owner) {
            self.included.push(owner);
        }
    }
}

/// Assemble context for `query` within `budget` tokens.
#[must_use]
pub fn assemble(
    records: &[MemoryRecord],
    query: &str,
    budget: usize,
    now: DateTime<Utc>,
    config: &EngineConfig,
    vocabulary: &Vocabulary,
) -> AssembledContext {
    let estimator = TokenEstimator::from_config(config);
    let headers = &vocabulary.boilerplate_headers;
    let mut builder = Builder::new();
    let mut over_budget = budget == 0;

    // 1. Pinned record, whole.
    let pinned = record::find_pinned(records, &config.pinned_tag_name);
    if let Some(pinned) = pinned {
        let content = pinned.normalized_content(headers);
        let chars = content.chars().count();
        builder.push(&content, chars, pinned.id);
        if estimator.estimate_chars(chars) > budget {
            warn!(
                record = %pinned.id,
                tokens = estimator.estimate_chars(chars),
                budget,
                "pinned record alone exceeds the context budget"
            );
            over_budget = true;
        }
    }
    if over_budget {
        return finish(builder, &estimator, true, AssemblyMode::Empty);
    }

    // 2. Paragraphs of every other record.
    let prepared: Vec<Prepared<'_>> = records
        .iter()
        .filter(|r| !pinned.is_some_and(|p| std::ptr::eq(p, *r)))
        .map(|record| {
            let normalized = record.normalized_content(headers);
            let chars = normalized.chars().count();
            Prepared {
                record,
                priority: priority::priority(record, chars, false, now, config),
                normalized,
            }
        })
        .collect();

    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    for (owner, p) in prepared.iter().enumerate() {
        for (position, text) in normalize::paragraphs(&p.normalized).into_iter().enumerate() {
            let chars = text.chars().count();
            if chars >= config.min_paragraph_chars {
                candidates.push(Candidate {
                    owner,
                    position,
                    text,
                    chars,
                    score: 0,
                });
            }
        }
    }
    if candidates.is_empty() {
        return finish(builder, &estimator, false, AssemblyMode::Empty);
    }

    // 3. Everything fits → verbatim.
    let total_chars = candidates
        .iter()
        .fold(builder.chars, |acc, c| if acc == 0 { c.chars } else { acc + SEPARATOR_CHARS + c.chars });
    if estimator.estimate_chars(total_chars) <= budget {
        candidates.sort_by(|a, b| {
            compare_owners(&prepared[a.owner], &prepared[b.owner]).then(a.position.cmp(&b.position))
        });
        for c in &candidates {
            builder.push(c.text, c.chars, prepared[c.owner].record.id);
        }
        debug!(paragraphs = candidates.len(), "context assembled verbatim");
        return finish(builder, &estimator, false, AssemblyMode::Verbatim);
    }

    // 4. Ranked, greedy, stop at the first paragraph that does not fit.
    let terms = query_terms(query);
    for c in &mut candidates {
        c.score = paragraph_score(c.text, c.chars, &terms, vocabulary);
    }
    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| compare_owners(&prepared[a.owner], &prepared[b.owner]))
            .then(a.position.cmp(&b.position))
    });

    let mut packed = 0usize;
    for c in &candidates {
        if estimator.estimate_chars(builder.chars_with(c.chars)) > budget {
            break;
        }
        builder.push(c.text, c.chars, prepared[c.owner].record.id);
        packed += 1;
    }
    debug!(
        paragraphs = candidates.len(),
        packed,
        budget,
        "context assembled by relevance"
    );
    let mode = if packed == 0 {
        AssemblyMode::Empty
    } else {
        AssemblyMode::Ranked
    };
    finish(builder, &estimator, false, mode)
}

/// Score one paragraph against the query terms.
///
/// Direct term hits weigh 3, synonym hits weigh 1 each, plus a length
/// bonus of at most 2.
#[must_use]
pub fn paragraph_score(paragraph: &str, chars: usize, terms: &[String], vocabulary: &Vocabulary) -> u32 {
    let lower = paragraph.to_lowercase();
    let mut score = 0;
    for term in terms {
        if lower.contains(term.as_str()) {
            score += QUERY_TERM_WEIGHT;
        }
        let synonym_hits = vocabulary
            .synonyms_of(term)
            .iter()
            .filter(|s| lower.contains(s.as_str()))
            .count();
        score += SYNONYM_WEIGHT * u32::try_from(synonym_hits).unwrap_or(u32::MAX);
    }
    score.saturating_add(length_bonus(chars))
}

/// 2 for comfortably sized paragraphs, 1 for short or long ones, 0 for extremes.
fn length_bonus(chars: usize) -> u32 {
    match chars {
        80..=600 => 2,
        40..=79 | 601..=1200 => 1,
        _ => 0,
    }
}

/// Higher priority first, then newer, then by id.
fn compare_owners(a: &Prepared<'_>, b: &Prepared<'_>) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.record.created_at.cmp(&a.record.created_at))
        .then_with(|| a.record.id.cmp(&b.record.id))
}

fn finish(
    builder: Builder,
    estimator: &TokenEstimator,
    over_budget: bool,
    mode: AssemblyMode,
) -> AssembledContext {
    let token_estimate = estimator.estimate(&builder.text);
    AssembledContext {
        text: builder.text,
        token_estimate,
        over_budget,
        mode,
        included_records: builder.included,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn para(word: &str) -> String {
        format!("This paragraph talks about {word} at some length, enough to matter.")
    }

    #[test]
    fn empty_store_yields_empty_context() {
        let ctx = assemble(&[], "anything", 100, Utc::now(), &config(), &Vocabulary::default());
        assert_eq!(ctx.text, "");
        assert_eq!(ctx.token_estimate, 0);
        assert!(!ctx.over_budget);
        assert_eq!(ctx.mode, AssemblyMode::Empty);
    }

    #[test]
    fn zero_budget_is_flagged() {
        let now = Utc::now();
        let records = vec![MemoryRecord::new(para("home"), "chat", 5, now)];
        let ctx = assemble(&records, "home", 0, now, &config(), &Vocabulary::default());
        assert!(ctx.over_budget);
        assert!(ctx.text.is_empty());
    }

    #[test]
    fn everything_fits_verbatim_in_priority_order() {
        let now = Utc::now();
        let low = MemoryRecord::new(para("rain"), "chat", 2, now);
        let high = MemoryRecord::new(para("home"), "chat", 9, now);
        let ctx = assemble(&[low.clone(), high.clone()], "home", 10_000, now, &config(), &Vocabulary::default());
        assert_eq!(ctx.mode, AssemblyMode::Verbatim);
        assert_eq!(ctx.text, format!("{}\n\n{}", para("home"), para("rain")));
        assert_eq!(ctx.included_records, vec![high.id, low.id]);
    }

    #[test]
    fn short_segments_are_dropped() {
        let now = Utc::now();
        let record = MemoryRecord::new(format!("ok.\n\n{}", para("home")), "chat", 5, now);
        let ctx = assemble(&[record], "home", 10_000, now, &config(), &Vocabulary::default());
        assert_eq!(ctx.text, para("home"));
    }

    #[test]
    fn ranked_mode_prefers_matching_paragraphs_and_respects_budget() {
        let now = Utc::now();
        let content = format!("{}\n\n{}\n\n{}", para("rain"), para("home"), para("bread"));
        let record = MemoryRecord::new(content, "chat", 5, now);
        let one_paragraph = TokenEstimator::from_config(&config()).estimate(&para("home"));

        let ctx = assemble(&[record], "home", one_paragraph + 5, now, &config(), &Vocabulary::default());
        assert_eq!(ctx.mode, AssemblyMode::Ranked);
        assert_eq!(ctx.text, para("home"));
        assert!(ctx.token_estimate <= one_paragraph + 5);
        assert!(!ctx.over_budget);
    }

    #[test]
    fn synonyms_break_ties() {
        let now = Utc::now();
        let vocab = Vocabulary {
            synonyms: [("home".to_string(), vec!["otthon".to_string()])].into_iter().collect(),
            ..Vocabulary::default()
        };
        let content = format!("{}\n\n{}", para("rain"), para("otthon"));
        let record = MemoryRecord::new(content, "chat", 5, now);
        let budget = TokenEstimator::from_config(&config()).estimate(&para("otthon"));

        let ctx = assemble(&[record], "home", budget, now, &config(), &vocab);
        assert_eq!(ctx.text, para("otthon"));
    }

    #[test]
    fn pinned_record_comes_first_even_over_budget() {
        let now = Utc::now();
        let persona = MemoryRecord::new("I am Anima. ".repeat(40), "setup", 10, now)
            .with_tags(["character-definition"]);
        let other = MemoryRecord::new(para("home"), "chat", 9, now);
        let ctx = assemble(&[other, persona.clone()], "home", 10, now, &config(), &Vocabulary::default());
        assert!(ctx.over_budget);
        assert_eq!(ctx.text, persona.normalized_content(&[]));
        assert_eq!(ctx.included_records, vec![persona.id]);
    }

    #[test]
    fn pinned_is_a_prefix_when_it_fits() {
        let now = Utc::now();
        let persona = MemoryRecord::new("I am Anima, a gentle companion.", "setup", 10, now - Duration::days(100))
            .with_tags(["character-definition"]);
        let other = MemoryRecord::new(para("home"), "chat", 9, now);
        let ctx = assemble(&[other, persona], "home", 1_000, now, &config(), &Vocabulary::default());
        assert!(ctx.text.starts_with("I am Anima, a gentle companion.\n\n"));
        assert!(!ctx.over_budget);
    }

    #[test]
    fn stops_at_first_paragraph_that_does_not_fit() {
        let now = Utc::now();
        let long = format!("home {}", "x".repeat(400));
        let short = para("home");
        let content = format!("{long}\n\n{short}");
        let record = MemoryRecord::new(content, "chat", 5, now);
        // Both match the query; `long` gets the larger length bonus and ranks first.
        let budget = TokenEstimator::from_config(&config()).estimate(&short) + 1;
        let ctx = assemble(&[record], "home", budget, now, &config(), &Vocabulary::default());
        assert!(ctx.text.is_empty());
        assert_eq!(ctx.mode, AssemblyMode::Empty);
        assert!(!ctx.over_budget);
    }

    #[test]
    fn paragraph_scoring_weights() {
        let vocab = Vocabulary {
            synonyms: [("home".to_string(), vec!["house".to_string(), "otthon".to_string()])]
                .into_iter()
                .collect(),
            ..Vocabulary::default()
        };
        let terms = vec!["home".to_string()];
        assert_eq!(paragraph_score("home", 10, &terms, &vocab), 3);
        assert_eq!(paragraph_score("house and otthon", 10, &terms, &vocab), 2);
        assert_eq!(paragraph_score("nothing", 100, &terms, &vocab), 2);
        assert_eq!(paragraph_score("nothing", 50, &[], &vocab), 1);
    }
}
