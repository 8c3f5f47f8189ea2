//! Summary stubs — condensed stand-ins for records the store can no longer
//! afford in full.
//!
//! A stub keeps the record's identity, label, timestamps and links, and
//! replaces its content with a fixed template:
//!
//! ```text
//! [Summarized memory: deep]
//! Feeling: A deeply felt memory that still resonates.
//! Context: evening chat
//! Key moments:
//! - I promised I would always remember the lake.
//! ```

use crate::classify::WeightProfile;
use crate::config::EngineConfig;
use crate::record::MemoryRecord;
use crate::vocabulary::{Vocabulary, count_hits};

/// Importance floor of a summary stub.
pub const STUB_MIN_IMPORTANCE: u8 = 7;
/// Sentences must be longer than this many characters to be quoted.
const MIN_KEY_SENTENCE_CHARS: usize = 20;

/// Whether `record` is already a summary stub.
#[must_use]
pub fn is_summarized(record: &MemoryRecord, config: &EngineConfig) -> bool {
    record.has_tag(&config.summarized_tag)
}

/// Build the summary stub replacing `record`.
///
/// `normalized` is the record's normalized content and `profile` its
/// classification; both are passed in because the optimizer already has them.
#[must_use]
pub fn summarize(
    record: &MemoryRecord,
    normalized: &str,
    profile: &WeightProfile,
    config: &EngineConfig,
    vocabulary: &Vocabulary,
) -> MemoryRecord {
    let sentences = key_sentences(normalized, &vocabulary.key_indicators, config.max_key_sentences);

    let mut content = format!(
        "[Summarized memory: {}]\nFeeling: {}\nContext: {}\nKey moments:",
        profile.class.label(),
        vocabulary.feelings.for_class(profile.class),
        record.context_label,
    );
    if sentences.is_empty() {
        content.push_str("\n- ");
        content.push_str(&vocabulary.summary_fallback);
    } else {
        for sentence in &sentences {
            content.push_str("\n- ");
            content.push_str(sentence);
        }
    }

    let mut tags = record.tags.clone();
    tags.insert(config.summarized_tag.clone());

    MemoryRecord {
        id: record.id,
        raw_content: content,
        context_label: record.context_label.clone(),
        importance: record.clamped_importance().max(STUB_MIN_IMPORTANCE),
        tags,
        created_at: record.created_at,
        linked_conversation_ids: record.linked_conversation_ids.clone(),
    }
}

/// Up to `max` sentences longer than 20 characters that contain a key
/// indicator, in their original order.
#[must_use]
pub fn key_sentences(normalized: &str, key_indicators: &[String], max: usize) -> Vec<String> {
    if max == 0 || key_indicators.is_empty() {
        return Vec::new();
    }
    split_sentences(normalized)
        .into_iter()
        .filter(|s| s.chars().count() > MIN_KEY_SENTENCE_CHARS)
        .filter(|s| count_hits(&s.to_lowercase(), key_indicators) > 0)
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Split on `.`, `!`, `?` (kept) and line breaks (dropped).
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        let end = match c {
            '.' | '!' | '?' => i + c.len_utf8(),
            '\n' => i,
            _ => continue,
        };
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = i + c.len_utf8();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
