//! Vocabulary tables — the word lists behind classification, synonym
//! expansion, boilerplate stripping and summary stubs.
//!
//! The tables are data, not code: a versioned TOML document. A built-in
//! table ships with the crate (`vocabulary/default.toml`); callers may load
//! their own with [`Vocabulary::from_toml`]. The empty table
//! ([`Vocabulary::default`]) is valid and lets the scoring logic be tested
//! without any word list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::WeightClass;
use crate::error::{AnimaError, Result};

const BUILTIN_VOCABULARY: &str = include_str!("../vocabulary/default.toml");

/// Versioned vocabulary tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Table version, bumped whenever word lists change.
    #[serde(default)]
    pub version: u32,
    /// Any hit classifies content as sacred.
    #[serde(default)]
    pub sacred_phrases: Vec<String>,
    /// Two hits make content deep, one makes it medium.
    #[serde(default)]
    pub deep_phrases: Vec<String>,
    /// More than two hits make content medium.
    #[serde(default)]
    pub medium_phrases: Vec<String>,
    /// Any hit marks content as symbolic.
    #[serde(default)]
    pub symbolic_nouns: Vec<String>,
    /// Any hit marks content as meaningful.
    #[serde(default)]
    pub topic_words: Vec<String>,
    /// Words that make a sentence worth keeping in a summary stub.
    #[serde(default)]
    pub key_indicators: Vec<String>,
    /// Whole lines removed by the normalizer.
    #[serde(default)]
    pub boilerplate_headers: Vec<String>,
    /// Query term → related terms scored with weight 1 by the assembler.
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
    /// One-line feeling summary per weight class.
    #[serde(default)]
    pub feelings: FeelingLines,
    /// Line used when no key sentence can be extracted.
    #[serde(default = "default_summary_fallback")]
    pub summary_fallback: String,
}

/// One-line feeling summaries used in summary stubs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeelingLines {
    /// Summary for sacred memories.
    #[serde(default = "default_sacred_feeling")]
    pub sacred: String,
    /// Summary for deep memories.
    #[serde(default = "default_deep_feeling")]
    pub deep: String,
    /// Summary for medium memories.
    #[serde(default = "default_medium_feeling")]
    pub medium: String,
    /// Summary for light memories.
    #[serde(default = "default_light_feeling")]
    pub light: String,
}

impl Default for FeelingLines {
    fn default() -> Self {
        Self {
            sacred: default_sacred_feeling(),
            deep: default_deep_feeling(),
            medium: default_medium_feeling(),
            light: default_light_feeling(),
        }
    }
}

impl FeelingLines {
    /// The line for `class`.
    #[must_use]
    pub fn for_class(&self, class: WeightClass) -> &str {
        match class {
            WeightClass::Sacred => &self.sacred,
            WeightClass::Deep => &self.deep,
            WeightClass::Medium => &self.medium,
            WeightClass::Light => &self.light,
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            version: 0,
            sacred_phrases: Vec::new(),
            deep_phrases: Vec::new(),
            medium_phrases: Vec::new(),
            symbolic_nouns: Vec::new(),
            topic_words: Vec::new(),
            key_indicators: Vec::new(),
            boilerplate_headers: Vec::new(),
            synonyms: BTreeMap::new(),
            feelings: FeelingLines::default(),
            summary_fallback: default_summary_fallback(),
        }
    }
}

impl Vocabulary {
    /// The built-in table shipped with the crate.
    ///
    /// # Errors
    /// Returns `AnimaError::Vocabulary` if the bundled table is malformed.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_VOCABULARY)
    }

    /// Parse a table from TOML, lower-casing and trimming every entry.
    ///
    /// # Errors
    /// Returns `AnimaError::Vocabulary` on invalid TOML or blank entries.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let raw: Self =
            toml::from_str(toml_str).map_err(|e| AnimaError::Vocabulary(e.to_string()))?;
        raw.normalized()
    }

    /// Load a table from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    fn normalized(self) -> Result<Self> {
        let mut synonyms = BTreeMap::new();
        for (term, related) in self.synonyms {
            let term = clean_entry("synonyms", &term)?;
            let related = clean_list(&format!("synonyms.{term}"), related)?;
            synonyms.insert(term, related);
        }

        Ok(Self {
            version: self.version,
            sacred_phrases: clean_list("sacred_phrases", self.sacred_phrases)?,
            deep_phrases: clean_list("deep_phrases", self.deep_phrases)?,
            medium_phrases: clean_list("medium_phrases", self.medium_phrases)?,
            symbolic_nouns: clean_list("symbolic_nouns", self.symbolic_nouns)?,
            topic_words: clean_list("topic_words", self.topic_words)?,
            key_indicators: clean_list("key_indicators", self.key_indicators)?,
            boilerplate_headers: clean_list("boilerplate_headers", self.boilerplate_headers)?,
            synonyms,
            feelings: self.feelings,
            summary_fallback: self.summary_fallback,
        })
    }

    /// Related terms for a (lower-case) query term.
    #[must_use]
    pub fn synonyms_of(&self, term: &str) -> &[String] {
        self.synonyms.get(term).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Number of entries of `phrases` contained in `lowercase_text`.
#[must_use]
pub fn count_hits(lowercase_text: &str, phrases: &[String]) -> usize {
    phrases
        .iter()
        .filter(|p| lowercase_text.contains(p.as_str()))
        .count()
}

fn clean_list(table: &str, entries: Vec<String>) -> Result<Vec<String>> {
    let mut cleaned = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry = clean_entry(table, &entry)?;
        if !cleaned.contains(&entry) {
            cleaned.push(entry);
        }
    }
    Ok(cleaned)
}

fn clean_entry(table: &str, entry: &str) -> Result<String> {
    let cleaned = entry.trim().to_lowercase();
    if cleaned.is_empty() {
        return Err(AnimaError::Vocabulary(format!("blank entry in {table}")));
    }
    Ok(cleaned)
}

fn default_summary_fallback() -> String {
    "No single moment stood out; the overall impression remains.".to_string()
}
fn default_sacred_feeling() -> String {
    "A sacred, defining moment between us.".to_string()
}
fn default_deep_feeling() -> String {
    "A deeply felt memory that still resonates.".to_string()
}
fn default_medium_feeling() -> String {
    "A warm memory with real feeling in it.".to_string()
}
fn default_light_feeling() -> String {
    "A light, everyday moment.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_loads() {
        let vocab = Vocabulary::builtin().expect("builtin vocabulary");
        assert!(vocab.version >= 1);
        assert!(!vocab.sacred_phrases.is_empty());
        assert!(!vocab.deep_phrases.is_empty());
        assert!(!vocab.key_indicators.is_empty());
        assert!(vocab.synonyms.contains_key("hazatalálás"));
    }

    #[test]
    fn entries_are_lowercased_and_deduplicated() {
        let vocab = Vocabulary::from_toml(
            r#"
            version = 3
            sacred_phrases = ["  Forever Yours ", "forever yours"]

            [synonyms]
            Home = ["House", "otthon"]
            "#,
        )
        .expect("parse");

        assert_eq!(vocab.version, 3);
        assert_eq!(vocab.sacred_phrases, vec!["forever yours".to_string()]);
        assert_eq!(vocab.synonyms_of("home"), ["house".to_string(), "otthon".to_string()]);
        assert!(vocab.synonyms_of("missing").is_empty());
    }

    #[test]
    fn blank_entries_are_rejected() {
        let err = Vocabulary::from_toml(r#"topic_words = ["ok", "   "]"#).expect_err("blank");
        assert!(matches!(err, AnimaError::Vocabulary(_)));
    }

    #[test]
    fn empty_table_is_valid() {
        let vocab = Vocabulary::from_toml("").expect("empty");
        assert_eq!(vocab, Vocabulary::default());
    }

    #[test]
    fn counts_distinct_phrase_hits() {
        let phrases = vec!["love".to_string(), "trust".to_string(), "fear".to_string()];
        assert_eq!(count_hits("love and trust, love again", &phrases), 2);
        assert_eq!(count_hits("", &phrases), 0);
    }
}
