//! Token Estimator — the one place text length becomes generation cost.
//!
//! `tokens = ceil(chars / chars_per_token)`. Every budget in the engine is
//! computed through [`TokenEstimator`]; because the estimate depends only on
//! the character count, callers packing text incrementally can track
//! characters and ask for [`TokenEstimator::estimate_chars`].

use crate::config::EngineConfig;

/// Fallback divisor if a config with an unusable divisor slips through.
const FALLBACK_CHARS_PER_TOKEN: f64 = 4.0;

/// Approximate token counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenEstimator {
    chars_per_token: f64,
}

impl TokenEstimator {
    /// Estimator with an explicit divisor. Non-positive or non-finite
    /// divisors fall back to 4 characters per token.
    #[must_use]
    pub fn new(chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token.is_finite() && chars_per_token > 0.0 {
            chars_per_token
        } else {
            FALLBACK_CHARS_PER_TOKEN
        };
        Self { chars_per_token }
    }

    /// Estimator using `config.chars_per_token`.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.chars_per_token)
    }

    /// The divisor in use.
    #[must_use]
    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }

    /// Estimated tokens for `text`.
    #[must_use]
    pub fn estimate(&self, text: &str) -> usize {
        self.estimate_chars(text.chars().count())
    }

    /// Estimated tokens for a text of `chars` characters.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn estimate_chars(&self, chars: usize) -> usize {
        if chars == 0 {
            return 0;
        }
        (chars as f64 / self.chars_per_token).ceil() as usize
    }

    /// Sum of estimates over many texts.
    #[must_use]
    pub fn estimate_all<'a, I>(&self, texts: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        texts.into_iter().map(|t| self.estimate(t)).sum()
    }
}
