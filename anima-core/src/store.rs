//! Collaborator seams: where records live and who consumes assembled context.
//!
//! The engine never owns records. A [`RecordStore`] hands out snapshots and
//! accepts replacement lists; a [`GenerationService`] turns an assembled
//! context plus the user's message into a reply. Two stores ship here:
//! [`InMemoryStore`] for tests and embedding, and [`JsonFileStore`], which
//! keeps the record list as one JSON document on disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::assembly::AssembledContext;
use crate::engine::MemoryEngine;
use crate::error::{AnimaError, Result};
use crate::optimizer::OptimizationReport;
use crate::record::MemoryRecord;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Source and sink of the record set.
pub trait RecordStore: Send + Sync {
    /// Snapshot of every stored record.
    ///
    /// # Errors
    ///
    /// Returns [`AnimaError::Store`] (or an I/O / serialization error) if the
    /// backing storage cannot be read.
    fn list_records(&self) -> Result<Vec<MemoryRecord>>;

    /// Replace the whole record set.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn replace_records(&self, records: Vec<MemoryRecord>) -> Result<()>;
}

/// Consumer of assembled context.
pub trait GenerationService: Send + Sync {
    /// Produce a reply to `user_message` grounded in `context`.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn generate(&self, context: &AssembledContext, user_message: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

/// Optimize the store if it is over the safe limit, writing back only when
/// the record set actually changed.
///
/// # Errors
///
/// Propagates store read/write failures.
pub fn maintain_store<S>(engine: &MemoryEngine, store: &S, now: DateTime<Utc>) -> Result<OptimizationReport>
where
    S: RecordStore + ?Sized,
{
    let records = store.list_records()?;
    let outcome = engine.optimize(&records, now);
    if outcome.changed() {
        info!(
            removed = outcome.report.excluded.len(),
            summarized = outcome.report.summarized.len(),
            "writing optimized store"
        );
        store.replace_records(outcome.records)?;
    } else {
        debug!(records = records.len(), "store unchanged");
    }
    Ok(outcome.report)
}

/// Assemble context for `user_message` from the store and hand it to the
/// generation service.
///
/// # Errors
///
/// Propagates store and generation failures.
pub fn respond<S, G>(
    engine: &MemoryEngine,
    store: &S,
    generator: &G,
    user_message: &str,
    budget: usize,
    now: DateTime<Utc>,
) -> Result<String>
where
    S: RecordStore + ?Sized,
    G: GenerationService + ?Sized,
{
    let records = store.list_records()?;
    let context = engine.assemble(&records, user_message, budget, now);
    debug!(
        tokens = context.token_estimate,
        records = context.included_records.len(),
        over_budget = context.over_budget,
        "context assembled"
    );
    generator.generate(&context, user_message)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Record store held in memory behind a read/write lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<MemoryRecord>>,
}

impl InMemoryStore {
    /// Store seeded with `records`.
    #[must_use]
    pub fn new(records: Vec<MemoryRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Append one record.
    pub fn insert(&self, record: MemoryRecord) {
        self.records.write().push(record);
    }
}

impl RecordStore for InMemoryStore {
    fn list_records(&self) -> Result<Vec<MemoryRecord>> {
        Ok(self.records.read().clone())
    }

    fn replace_records(&self, records: Vec<MemoryRecord>) -> Result<()> {
        *self.records.write() = records;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// Record store persisted as a single JSON array.
///
/// A missing file reads as an empty store. Writes go to a sibling temporary
/// file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RecordStore for JsonFileStore {
    fn list_records(&self) -> Result<Vec<MemoryRecord>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let records: Vec<MemoryRecord> =
            serde_json::from_str(&data).map_err(|e| AnimaError::Serialization(e.to_string()))?;
        debug!(path = %self.path.display(), records = records.len(), "loaded record store");
        Ok(records)
    }

    fn replace_records(&self, records: Vec<MemoryRecord>) -> Result<()> {
        if self.path.file_name().is_none() {
            return Err(AnimaError::Store(format!(
                "store path {} has no file name",
                self.path.display()
            )));
        }
        let json =
            serde_json::to_string_pretty(&records).map_err(|e| AnimaError::Serialization(e.to_string()))?;
        let temp = self.temp_path();
        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, &self.path)?;
        debug!(path = %self.path.display(), records = records.len(), "saved record store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn in_memory_store_round_trips() {
        let store = InMemoryStore::default();
        assert!(store.is_empty());
        store.insert(MemoryRecord::new("hello", "chat", 5, Utc::now()));
        assert_eq!(store.len(), 1);

        let replacement = vec![MemoryRecord::new("bye", "chat", 3, Utc::now())];
        store.replace_records(replacement.clone()).expect("replace");
        assert_eq!(store.list_records().expect("list"), replacement);
    }

    #[test]
    fn json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("memories.json"));
        assert!(store.list_records().expect("list").is_empty());
    }

    #[test]
    fn json_store_persists_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memories.json");
        let records = vec![
            MemoryRecord::new("Az első találkozás.", "first chat", 8, Utc::now())
                .with_tags(["first"])
                .with_links(["conv-1"]),
        ];
        JsonFileStore::new(&path).replace_records(records.clone()).expect("save");

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.list_records().expect("load"), records);
        assert!(!reopened.temp_path().exists());
    }

    #[test]
    fn json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memories.json");
        std::fs::write(&path, "{ not json").expect("write");
        let err = JsonFileStore::new(&path).list_records().expect_err("corrupt");
        assert!(matches!(err, AnimaError::Serialization(_)));
    }

    #[test]
    fn maintain_store_leaves_compliant_store_alone() {
        let engine = MemoryEngine::new(EngineConfig::default(), crate::Vocabulary::default()).expect("engine");
        let store = InMemoryStore::new(vec![MemoryRecord::new("small", "chat", 5, Utc::now())]);
        let report = maintain_store(&engine, &store, Utc::now()).expect("maintain");
        assert!(report.already_compliant);
        assert_eq!(store.len(), 1);
    }
}
