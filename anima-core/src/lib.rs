//! # Anima Core Library
//!
//! Memory context & budget engine for a conversational companion.
//!
//! The companion keeps a set of [`MemoryRecord`]s (free text plus importance,
//! tags, a timestamp and links to past conversations). For each turn this
//! crate decides which memory text goes into the generation prompt, and it
//! keeps the whole store under a global token budget:
//!
//! - **Normalizer** — strips markup, separators and boilerplate headers
//! - **Classifier** — weight class (light → sacred), symbolic, meaningful
//! - **Priority Ranker** — query-independent composite score
//! - **Relevance Retrieval** — lexical overlap × importance × recency
//! - **Context Assembler** — pinned definition first, then paragraphs packed
//!   into the query budget
//! - **Store Optimizer** — keeps, summarizes or drops records to stay under
//!   the safe limit
//!
//! Every operation is a pure function of a record snapshot, an
//! [`EngineConfig`], a [`Vocabulary`] and an injected `now`. Inputs are never
//! mutated.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assembly;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod optimizer;
pub mod priority;
pub mod record;
pub mod retrieval;
pub mod store;
pub mod summary;
pub mod tokens;
pub mod types;
pub mod vocabulary;

pub use assembly::{AssembledContext, AssemblyMode};
pub use classify::{WeightClass, WeightProfile};
pub use config::{EngineConfig, PriorityWeights};
pub use engine::MemoryEngine;
pub use error::{AnimaError, Result};
pub use optimizer::{OptimizationOutcome, OptimizationReport, StoreUsage, UsageStatus};
pub use priority::PriorityBreakdown;
pub use record::MemoryRecord;
pub use retrieval::{RelevanceBreakdown, RetrievalResult};
pub use store::{GenerationService, InMemoryStore, JsonFileStore, RecordStore, maintain_store, respond};
pub use tokens::TokenEstimator;
pub use types::*;
pub use vocabulary::Vocabulary;
