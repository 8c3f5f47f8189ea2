//! Configuration for the anima engine.
//!
//! A single [`EngineConfig`] is passed into every engine operation. It maps
//! directly to an `anima.toml` document; every field has a serde default so
//! a partial file is valid.

use serde::{Deserialize, Serialize};

use crate::error::{AnimaError, Result};

/// Engine configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Absolute token ceiling for the whole store (usage reporting).
    #[serde(default = "default_hard_token_limit")]
    pub hard_token_limit: usize,
    /// Store size that triggers optimization, and the optimizer's target.
    #[serde(default = "default_safe_token_limit")]
    pub safe_token_limit: usize,
    /// Token budget used by `assemble_default`.
    #[serde(default = "default_query_budget")]
    pub default_query_budget: usize,
    /// Half-life (days) of the ranker's recency term.
    #[serde(default = "default_half_life")]
    pub recency_half_life_days: f64,
    /// Tag that marks the pinned character-definition record.
    #[serde(default = "default_pinned_tag")]
    pub pinned_tag_name: String,
    /// Retention priority a record must exceed to be summarized instead of dropped.
    #[serde(default = "default_high_priority_threshold")]
    pub high_priority_threshold: f64,
    /// Characters per token, the one divisor used by the token estimator.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f64,
    /// Window (days) over which the retriever's recency multiplier decays.
    #[serde(default = "default_recency_window")]
    pub recency_window_days: f64,
    /// Lowest value the retriever's recency multiplier can reach.
    #[serde(default = "default_recency_floor")]
    pub recency_floor: f64,
    /// Number of results returned by `retrieve_default`.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    /// Paragraphs shorter than this (in characters) are dropped by the assembler.
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,
    /// Content longer than this (in characters) is always "meaningful".
    #[serde(default = "default_meaningful_length")]
    pub meaningful_length_chars: usize,
    /// Maximum key sentences copied into a summary stub.
    #[serde(default = "default_max_key_sentences")]
    pub max_key_sentences: usize,
    /// Tag added to summary stubs.
    #[serde(default = "default_summarized_tag")]
    pub summarized_tag: String,
    /// Priority ranker weights.
    #[serde(default)]
    pub weights: PriorityWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hard_token_limit: default_hard_token_limit(),
            safe_token_limit: default_safe_token_limit(),
            default_query_budget: default_query_budget(),
            recency_half_life_days: default_half_life(),
            pinned_tag_name: default_pinned_tag(),
            high_priority_threshold: default_high_priority_threshold(),
            chars_per_token: default_chars_per_token(),
            recency_window_days: default_recency_window(),
            recency_floor: default_recency_floor(),
            default_top_k: default_top_k(),
            min_paragraph_chars: default_min_paragraph_chars(),
            meaningful_length_chars: default_meaningful_length(),
            max_key_sentences: default_max_key_sentences(),
            summarized_tag: default_summarized_tag(),
            weights: PriorityWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `AnimaError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| AnimaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check the cross-field invariants the engine relies on.
    ///
    /// # Errors
    /// Returns `AnimaError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        positive("chars_per_token", self.chars_per_token)?;
        positive("recency_half_life_days", self.recency_half_life_days)?;
        positive("recency_window_days", self.recency_window_days)?;

        if self.safe_token_limit > self.hard_token_limit {
            return Err(AnimaError::Config(format!(
                "safe_token_limit ({}) exceeds hard_token_limit ({})",
                self.safe_token_limit, self.hard_token_limit
            )));
        }
        if !(0.0..=1.0).contains(&self.recency_floor) {
            return Err(AnimaError::Config(format!(
                "recency_floor must lie in [0, 1], got {}",
                self.recency_floor
            )));
        }
        if !(0.0..=10.0).contains(&self.high_priority_threshold) {
            return Err(AnimaError::Config(format!(
                "high_priority_threshold must lie in [0, 10], got {}",
                self.high_priority_threshold
            )));
        }
        if self.pinned_tag_name.trim().is_empty() {
            return Err(AnimaError::Config("pinned_tag_name is empty".to_string()));
        }
        if self.summarized_tag.trim().is_empty() {
            return Err(AnimaError::Config("summarized_tag is empty".to_string()));
        }
        self.weights.validate()
    }
}

/// Weights of the composite priority score.
///
/// Every term is bounded: recency and quality by their `*_max`, tags and
/// links by `step × cap`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityWeights {
    /// Multiplier applied to `importance` (1–10).
    #[serde(default = "default_1_0")]
    pub importance: f64,
    /// Flat bonus for the pinned record.
    #[serde(default = "default_5_0")]
    pub pinned_bonus: f64,
    /// Recency term for a record created right now.
    #[serde(default = "default_3_0")]
    pub recency_max: f64,
    /// Ceiling of the content-length quality term.
    #[serde(default = "default_2_0")]
    pub quality_max: f64,
    /// Content length (characters) at which the quality term saturates.
    #[serde(default = "default_quality_saturation")]
    pub quality_saturation_chars: usize,
    /// Bonus per tag.
    #[serde(default = "default_0_25")]
    pub tag_step: f64,
    /// Tags beyond this count add nothing.
    #[serde(default = "default_4")]
    pub tag_cap: usize,
    /// Bonus per linked conversation.
    #[serde(default = "default_0_5")]
    pub link_step: f64,
    /// Links beyond this count add nothing.
    #[serde(default = "default_4")]
    pub link_cap: usize,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            importance: 1.0,
            pinned_bonus: 5.0,
            recency_max: 3.0,
            quality_max: 2.0,
            quality_saturation_chars: 600,
            tag_step: 0.25,
            tag_cap: 4,
            link_step: 0.5,
            link_cap: 4,
        }
    }
}

impl PriorityWeights {
    fn validate(&self) -> Result<()> {
        let fields = [
            ("weights.importance", self.importance),
            ("weights.pinned_bonus", self.pinned_bonus),
            ("weights.recency_max", self.recency_max),
            ("weights.quality_max", self.quality_max),
            ("weights.tag_step", self.tag_step),
            ("weights.link_step", self.link_step),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(AnimaError::Config(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if self.quality_saturation_chars == 0 {
            return Err(AnimaError::Config(
                "weights.quality_saturation_chars must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnimaError::Config(format!(
            "{name} must be a finite positive number, got {value}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_hard_token_limit() -> usize { 12_000 }
fn default_safe_token_limit() -> usize { 9_000 }
fn default_query_budget() -> usize { 1_500 }
fn default_half_life() -> f64 { 14.0 }
fn default_pinned_tag() -> String { "character-definition".to_string() }
fn default_high_priority_threshold() -> f64 { 7.0 }
fn default_chars_per_token() -> f64 { 4.0 }
fn default_recency_window() -> f64 { 30.0 }
fn default_recency_floor() -> f64 { 0.1 }
fn default_top_k() -> usize { 5 }
fn default_min_paragraph_chars() -> usize { 20 }
fn default_meaningful_length() -> usize { 200 }
fn default_max_key_sentences() -> usize { 3 }
fn default_summarized_tag() -> String { "summarized".to_string() }
fn default_quality_saturation() -> usize { 600 }
fn default_0_25() -> f64 { 0.25 }
fn default_0_5() -> f64 { 0.5 }
fn default_1_0() -> f64 { 1.0 }
fn default_2_0() -> f64 { 2.0 }
fn default_3_0() -> f64 { 3.0 }
fn default_5_0() -> f64 { 5.0 }
fn default_4() -> usize { 4 }
