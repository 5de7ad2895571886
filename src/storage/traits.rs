//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{DocumentRecord, NewRun, PageRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Page and document records are append-only: writing a record whose id (or
/// whose URL / content hash) is already stored is a constraint violation,
/// never an overwrite. Checkpoints are named JSON values that are replaced
/// on every write.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `run` - Seed, bound, forbidden set, limit and config hash of the run
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, run: &NewRun) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp and final counts
    fn complete_run(
        &mut self,
        run_id: i64,
        pages_indexed: u64,
        documents_indexed: u64,
    ) -> StorageResult<()>;

    // ===== Page Records =====

    /// Appends a page record
    fn put_page(&mut self, record: &PageRecord) -> StorageResult<()>;

    /// Gets a page record by URL id
    fn get_page(&self, id: u64) -> StorageResult<Option<PageRecord>>;

    /// Gets all page records in id order
    fn all_pages(&self) -> StorageResult<Vec<PageRecord>>;

    /// Gets total page count
    fn count_pages(&self) -> StorageResult<u64>;

    // ===== Document Records =====

    /// Appends a document record
    fn put_document(&mut self, record: &DocumentRecord) -> StorageResult<()>;

    /// Gets a document record by document id
    fn get_document(&self, id: u64) -> StorageResult<Option<DocumentRecord>>;

    /// Gets all document records in id order
    fn all_documents(&self) -> StorageResult<Vec<DocumentRecord>>;

    /// Gets total document count
    fn count_documents(&self) -> StorageResult<u64>;

    // ===== Checkpoints =====

    /// Replaces a single named checkpoint
    fn put_checkpoint(&mut self, name: &str, value: &serde_json::Value) -> StorageResult<()>;

    /// Replaces several checkpoints atomically
    fn put_checkpoints(&mut self, entries: &[(&str, serde_json::Value)]) -> StorageResult<()>;

    /// Reads a named checkpoint
    fn get_checkpoint(&self, name: &str) -> StorageResult<Option<serde_json::Value>>;
}
