//! `MemoryEngine` — one value bundling configuration, vocabulary and token
//! estimator, so callers pass a single handle instead of threading three.
//!
//! The engine holds no record state. Every operation takes the caller's
//! snapshot and an injected `now`.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::assembly::{self, AssembledContext};
use crate::classify::{self, WeightProfile};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::normalize;
use crate::optimizer::{self, OptimizationOutcome, StoreUsage};
use crate::priority::{self, PriorityBreakdown};
use crate::record::{self, MemoryRecord};
use crate::retrieval::{self, RetrievalResult};
use crate::summary;
use crate::tokens::TokenEstimator;
use crate::types::PriorityScore;
use crate::vocabulary::Vocabulary;

/// The memory context & budget engine.
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    config: EngineConfig,
    vocabulary: Vocabulary,
    estimator: TokenEstimator,
}

impl MemoryEngine {
    /// Build an engine from a configuration and vocabulary.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AnimaError::Config`] if the configuration is invalid.
    pub fn new(config: EngineConfig, vocabulary: Vocabulary) -> Result<Self> {
        config.validate()?;
        let estimator = TokenEstimator::from_config(&config);
        info!(
            safe = config.safe_token_limit,
            hard = config.hard_token_limit,
            vocabulary_version = vocabulary.version,
            "memory engine ready"
        );
        Ok(Self {
            config,
            vocabulary,
            estimator,
        })
    }

    /// Build an engine with the vocabulary shipped in the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the built-in
    /// vocabulary fails to parse.
    pub fn with_builtin_vocabulary(config: EngineConfig) -> Result<Self> {
        Self::new(config, Vocabulary::builtin()?)
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The active vocabulary.
    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// The shared token estimator.
    #[must_use]
    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    // -- Normalizer / Classifier ---------------------------------------------

    /// Strip formatting and boilerplate from `raw`.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        normalize::normalize(raw, &self.vocabulary.boilerplate_headers)
    }

    /// Classify a record's normalized content.
    #[must_use]
    pub fn classify(&self, record: &MemoryRecord) -> WeightProfile {
        let normalized = record.normalized_content(&self.vocabulary.boilerplate_headers);
        classify::classify(&normalized, &self.vocabulary, self.config.meaningful_length_chars)
    }

    /// Whether `record` is a summary stub.
    #[must_use]
    pub fn is_summarized(&self, record: &MemoryRecord) -> bool {
        summary::is_summarized(record, &self.config)
    }

    // -- Ranking --------------------------------------------------------------

    /// The pinned character-definition record of a snapshot, if any.
    #[must_use]
    pub fn pinned<'a>(&self, records: &'a [MemoryRecord]) -> Option<&'a MemoryRecord> {
        record::find_pinned(records, &self.config.pinned_tag_name)
    }

    /// Per-term priority breakdown of `record` within `records`.
    #[must_use]
    pub fn priority_breakdown(
        &self,
        record: &MemoryRecord,
        records: &[MemoryRecord],
        now: DateTime<Utc>,
    ) -> PriorityBreakdown {
        let is_pinned = self.pinned(records).is_some_and(|p| p.id == record.id);
        let chars = record
            .normalized_content(&self.vocabulary.boilerplate_headers)
            .chars()
            .count();
        priority::compute_breakdown(record, chars, is_pinned, now, &self.config)
    }

    /// Base priority of `record` within `records`.
    #[must_use]
    pub fn priority(&self, record: &MemoryRecord, records: &[MemoryRecord], now: DateTime<Utc>) -> PriorityScore {
        PriorityScore::new(self.priority_breakdown(record, records, now).total())
    }

    /// Retention priority used by the optimizer.
    #[must_use]
    pub fn retention_priority(&self, record: &MemoryRecord, now: DateTime<Utc>) -> PriorityScore {
        priority::retention_priority(record, &self.classify(record), now)
    }

    // -- Retrieval / Assembly ------------------------------------------------

    /// Top-`k` records relevant to `query`.
    #[must_use]
    pub fn retrieve(
        &self,
        query: &str,
        records: &[MemoryRecord],
        k: usize,
        now: DateTime<Utc>,
    ) -> Vec<RetrievalResult> {
        retrieval::retrieve(query, records, k, now, &self.config, &self.vocabulary)
    }

    /// [`Self::retrieve`] with the configured default `k`.
    #[must_use]
    pub fn retrieve_default(&self, query: &str, records: &[MemoryRecord], now: DateTime<Utc>) -> Vec<RetrievalResult> {
        self.retrieve(query, records, self.config.default_top_k, now)
    }

    /// Pack context for `query` into `budget` tokens.
    #[must_use]
    pub fn assemble(
        &self,
        records: &[MemoryRecord],
        query: &str,
        budget: usize,
        now: DateTime<Utc>,
    ) -> AssembledContext {
        assembly::assemble(records, query, budget, now, &self.config, &self.vocabulary)
    }

    /// [`Self::assemble`] with the configured default budget.
    #[must_use]
    pub fn assemble_default(&self, records: &[MemoryRecord], query: &str, now: DateTime<Utc>) -> AssembledContext {
        self.assemble(records, query, self.config.default_query_budget, now)
    }

    // -- Store ----------------------------------------------------------------

    /// Token usage of a whole record set.
    #[must_use]
    pub fn usage(&self, records: &[MemoryRecord]) -> StoreUsage {
        optimizer::usage(records, &self.config)
    }

    /// Bring a record set under the safe token limit.
    #[must_use]
    pub fn optimize(&self, records: &[MemoryRecord], now: DateTime<Utc>) -> OptimizationOutcome {
        optimizer::optimize(records, now, &self.config, &self.vocabulary)
    }
}
