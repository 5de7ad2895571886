//! Crawl index: identity assignment for pages and documents
//!
//! This module owns every piece of process-wide crawl state that must survive
//! a restart:
//! - The identity resolver's raw → canonical URL map
//! - The URL registry (canonical URL → page id)
//! - The document registry (content hash → document id)
//!
//! All three are held by a [`CrawlIndex`] owned by the coordinator, loaded from
//! the checkpoint table at startup and flushed after every page.

mod document_indexer;
mod registry;
mod url_indexer;

pub use document_indexer::DocumentIndexer;
pub use registry::{IdRegistry, RegistryError};
pub use url_indexer::UrlIndexer;

use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Checkpoint name of the URL registry export
pub const URL_REGISTRY_CHECKPOINT: &str = "url_registry";

/// Checkpoint name of the identity resolver export
pub const RESOLVER_CHECKPOINT: &str = "resolver";

/// Checkpoint name of the document registry export
pub const DOCUMENT_REGISTRY_CHECKPOINT: &str = "document_registry";

/// Outcome of an admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The key was new and received this id
    Admitted(u64),
    /// The key was already indexed; nothing was written
    Duplicate,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }

    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Admitted(id) => Some(*id),
            Self::Duplicate => None,
        }
    }
}

/// SHA-256 digest of a response body, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hashes raw body bytes
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The owned crawl state: both indexers
#[derive(Debug, Default)]
pub struct CrawlIndex {
    pub urls: UrlIndexer,
    pub documents: DocumentIndexer,
}

impl CrawlIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads both indexers from storage
    ///
    /// Missing or corrupt checkpoints fall back per sub-index (see
    /// [`UrlIndexer::load`] and [`DocumentIndexer::load`]).
    pub fn load(storage: &dyn Storage) -> crate::Result<Self> {
        Ok(Self {
            urls: UrlIndexer::load(storage)?,
            documents: DocumentIndexer::load(storage)?,
        })
    }

    /// Writes all three exports in a single transaction
    ///
    /// Each call serializes the full maps and replaces the previous snapshot,
    /// so the cost of a checkpoint grows with the size of the index. The
    /// coordinator checkpoints after every page; for very large sites this
    /// write dominates the per-page cost.
    pub fn checkpoint(&self, storage: &mut dyn Storage) -> crate::Result<()> {
        let mut entries = self.urls.checkpoint_entries()?;
        entries.extend(self.documents.checkpoint_entries()?);
        storage.put_checkpoints(&entries)?;

        tracing::trace!(
            "Checkpointed {} pages, {} documents",
            self.urls.len(),
            self.documents.len()
        );
        Ok(())
    }
}
