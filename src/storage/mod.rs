//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the indexer, including:
//! - SQLite database initialization and schema management
//! - Append-only page and document records
//! - Named checkpoints of the index registries
//! - Run tracking and resumption support

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::index::ContentHash;
use crate::state::PageState;
use crate::url::CanonicalUrl;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Opens (or creates) a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A fetched page, written once under its URL id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: u64,
    pub url: CanonicalUrl,
    pub requested_url: String,
    pub state: PageState,
    pub status_code: Option<u16>,
    pub redirect_history: Vec<String>,
    pub content_type: Option<String>,
    pub content_hash: Option<ContentHash>,
    pub a_hrefs: Vec<CanonicalUrl>,
    pub img_srcs: Vec<CanonicalUrl>,
    pub error_message: Option<String>,
    pub visited_at: String,
}

/// Term frequencies of one distinct body, written once under its document id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: u64,
    pub content_hash: ContentHash,
    pub term_frequencies: BTreeMap<String, u32>,
}

/// Parameters of a crawl run, written when the run starts
#[derive(Debug, Clone, PartialEq)]
pub struct NewRun {
    pub seed_url: String,
    pub bound_url: String,
    pub forbidden_prefixes: Vec<String>,
    pub max_to_index: Option<u64>,
    pub config_hash: String,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub seed_url: String,
    pub bound_url: String,
    pub forbidden_prefixes: Vec<String>,
    pub max_to_index: Option<u64>,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub pages_indexed: u64,
    pub documents_indexed: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }

    #[test]
    fn test_open_storage_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");

        let storage = open_storage(&path).unwrap();
        drop(storage);
        assert!(path.exists());
    }
}
