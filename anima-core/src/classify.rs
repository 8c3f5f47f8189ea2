//! Weight Classifier — how heavily a memory weighs emotionally.
//!
//! A pure function of normalized content and the vocabulary tables:
//!
//! ```text
//! sacred  ← any sacred phrase
//! deep    ← ≥2 deep-phrase hits
//! medium  ← 1 deep-phrase hit, or >2 medium-phrase hits
//! light   ← otherwise
//! ```
//!
//! The profile is always recomputed and never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vocabulary::{Vocabulary, count_hits};

/// Qualitative emotional intensity of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightClass {
    /// Everyday content.
    Light,
    /// Some feeling.
    Medium,
    /// Strong feeling.
    Deep,
    /// Defining, identity-level content.
    Sacred,
}

impl WeightClass {
    /// Lower-case label used in summary stubs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Deep => "deep",
            Self::Sacred => "sacred",
        }
    }

    /// Retention bonus applied by the store optimizer.
    #[must_use]
    pub fn retention_bonus(self) -> f64 {
        match self {
            Self::Sacred => 5.0,
            Self::Deep => 3.0,
            Self::Medium => 1.0,
            Self::Light => -1.0,
        }
    }
}

impl fmt::Display for WeightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifier output for one piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightProfile {
    /// Intensity class.
    pub class: WeightClass,
    /// Content mentions a symbolic noun.
    pub is_symbolic: bool,
    /// Content is long or touches a topic word.
    pub is_meaningful: bool,
}

impl WeightProfile {
    /// Profile of empty content.
    pub const EMPTY: Self = Self {
        class: WeightClass::Light,
        is_symbolic: false,
        is_meaningful: false,
    };
}

/// Classify normalized content.
///
/// `meaningful_length_chars` is the length (in characters) content must
/// exceed to count as meaningful without any topic word.
#[must_use]
pub fn classify(
    normalized: &str,
    vocabulary: &Vocabulary,
    meaningful_length_chars: usize,
) -> WeightProfile {
    if normalized.trim().is_empty() {
        return WeightProfile::EMPTY;
    }
    let lower = normalized.to_lowercase();

    let class = if count_hits(&lower, &vocabulary.sacred_phrases) > 0 {
        WeightClass::Sacred
    } else {
        let deep = count_hits(&lower, &vocabulary.deep_phrases);
        if deep >= 2 {
            WeightClass::Deep
        } else if deep == 1 || count_hits(&lower, &vocabulary.medium_phrases) > 2 {
            WeightClass::Medium
        } else {
            WeightClass::Light
        }
    };

    let is_symbolic = count_hits(&lower, &vocabulary.symbolic_nouns) > 0;
    let is_meaningful = normalized.chars().count() > meaningful_length_chars
        || count_hits(&lower, &vocabulary.topic_words) > 0;

    WeightProfile {
        class,
        is_symbolic,
        is_meaningful,
    }
}
