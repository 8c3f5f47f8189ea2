//! Memory records — "what the companion remembers".
//!
//! A [`MemoryRecord`] is a unit of free text plus metadata. Records are
//! owned by the external store; the engine only ever borrows a snapshot and
//! produces new records (copy-on-write), never mutating its input.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize;
use crate::types::RecordId;

/// Lowest valid importance.
pub const MIN_IMPORTANCE: u8 = 1;
/// Highest valid importance.
pub const MAX_IMPORTANCE: u8 = 10;

/// A single memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Stable identifier.
    pub id: RecordId,
    /// Content exactly as stored.
    pub raw_content: String,
    /// Short label describing where the memory came from.
    pub context_label: String,
    /// Importance, 1–10. Out-of-range values are clamped wherever they are read.
    pub importance: u8,
    /// Free-form tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Conversations this memory is linked to.
    #[serde(default)]
    pub linked_conversation_ids: BTreeSet<String>,
}

impl MemoryRecord {
    /// Create a record with no tags or links.
    #[must_use]
    pub fn new(
        raw_content: impl Into<String>,
        context_label: impl Into<String>,
        importance: u8,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            raw_content: raw_content.into(),
            context_label: context_label.into(),
            importance,
            tags: BTreeSet::new(),
            created_at,
            linked_conversation_ids: BTreeSet::new(),
        }
    }

    /// Replace the identifier.
    #[must_use]
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = id;
        self
    }

    /// Add tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Add linked conversation IDs.
    #[must_use]
    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.linked_conversation_ids
            .extend(links.into_iter().map(Into::into));
        self
    }

    /// Importance clamped into `[1, 10]`.
    #[must_use]
    pub fn clamped_importance(&self) -> u8 {
        self.importance.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE)
    }

    /// Normalized content, recomputed on every call.
    #[must_use]
    pub fn normalized_content(&self, boilerplate_headers: &[String]) -> String {
        normalize::normalize(&self.raw_content, boilerplate_headers)
    }

    /// Whether the record carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Select the pinned record: the most recent record carrying `pinned_tag`.
///
/// Ties on `created_at` go to the larger [`RecordId`] so the choice never
/// depends on slice order.
#[must_use]
pub fn find_pinned<'a>(records: &'a [MemoryRecord], pinned_tag: &str) -> Option<&'a MemoryRecord> {
    records
        .iter()
        .filter(|r| r.has_tag(pinned_tag))
        .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
}
