//! # ICHI Core
//!
//! Core business logic for the ICHI intervention classification index.
//!
//! This crate contains pure data operations over the classification taxonomy:
//! - The `ClassificationEntry` data model and code helpers
//! - The read-mostly, code-ordered classification store
//! - The query engine (validation, escaping, pagination, result envelopes)
//! - The offline hierarchy repair engine for malformed flat codes
//! - JSON dataset loading and persistence
//!
//! **No API concerns**: HTTP routing, status mapping and OpenAPI docs belong
//! in the `ichi-run` server binary; command-line handling belongs in
//! `ichi-cli`.

pub mod config;
pub mod constants;
pub mod entry;
mod error;
pub mod loader;
pub mod query;
pub mod repair;
pub mod store;

pub use entry::{ClassificationEntry, ClassKind};
pub use error::{ClassificationError, ClassificationResult};
pub use query::{ClassificationService, ListResponse, SearchResponse, SearchTerm};
pub use repair::{RepairEngine, RepairSummary};
pub use store::{ClassificationStore, SearchHit, SortField};
