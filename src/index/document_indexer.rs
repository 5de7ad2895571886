//! Document indexer: content-level deduplication

use crate::index::registry::{IdRegistry, RegistryError};
use crate::index::url_indexer::load_checkpoint;
use crate::index::{Admission, ContentHash, DOCUMENT_REGISTRY_CHECKPOINT};
use crate::storage::{DocumentRecord, Storage};
use std::collections::{BTreeMap, HashSet};

/// Registry of distinct page bodies, keyed by content hash
#[derive(Debug, Default)]
pub struct DocumentIndexer {
    registry: IdRegistry<ContentHash>,
}

impl DocumentIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether this exact content has already been stored
    pub fn is_indexed(&self, hash: &ContentHash) -> bool {
        self.registry.contains(hash)
    }

    /// Stores a term-frequency record the first time its content hash is seen
    ///
    /// Mirrored content (same hash, different URL) is a no-op returning
    /// [`Admission::Duplicate`].
    pub fn admit_document(
        &mut self,
        hash: &ContentHash,
        term_frequencies: BTreeMap<String, u32>,
        storage: &mut dyn Storage,
    ) -> crate::Result<Admission> {
        if self.registry.contains(hash) {
            tracing::debug!("Document {} already indexed, skipping", hash);
            return Ok(Admission::Duplicate);
        }

        let id = self.registry.next_id();
        let record = DocumentRecord {
            id,
            content_hash: hash.clone(),
            term_frequencies,
        };
        storage.put_document(&record)?;

        let assigned = self.registry.add(hash.clone());
        if assigned != id {
            return Err(RegistryError::NonMonotonic {
                expected: id,
                actual: assigned,
            }
            .into());
        }

        tracing::info!(
            "Indexed document {} ({} terms)",
            id,
            record.term_frequencies.len()
        );
        Ok(Admission::Admitted(id))
    }

    /// Looks up the document id of a stored content hash
    pub fn id_of(&self, hash: &ContentHash) -> Result<u64, RegistryError> {
        self.registry.id_of(hash)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn checkpoint_entries(&self) -> crate::Result<Vec<(&'static str, serde_json::Value)>> {
        Ok(vec![(
            DOCUMENT_REGISTRY_CHECKPOINT,
            serde_json::to_value(self.registry.export())?,
        )])
    }

    pub fn save(&self, storage: &mut dyn Storage) -> crate::Result<()> {
        storage.put_checkpoints(&self.checkpoint_entries()?)?;
        Ok(())
    }

    /// Restores the registry from its checkpoint, reconciled with the document store
    pub fn load(storage: &dyn Storage) -> crate::Result<Self> {
        let mut registry = match load_checkpoint::<BTreeMap<ContentHash, u64>>(
            storage,
            DOCUMENT_REGISTRY_CHECKPOINT,
        ) {
            Some(mapping) => match IdRegistry::restore(mapping) {
                Ok(registry) => registry,
                Err(e) => {
                    tracing::warn!("Discarding document registry checkpoint: {}", e);
                    IdRegistry::new()
                }
            },
            None => IdRegistry::new(),
        };

        let mut ids: HashSet<u64> = registry.export().into_values().collect();
        for record in storage.all_documents()? {
            if registry.contains(&record.content_hash) {
                continue;
            }
            if ids.contains(&record.id) || record.id != registry.next_id() {
                return Err(RegistryError::NonMonotonic {
                    expected: registry.next_id(),
                    actual: record.id,
                }
                .into());
            }
            ids.insert(registry.add(record.content_hash));
        }

        tracing::info!("Loaded document index: {} documents", registry.len());
        Ok(Self { registry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    fn terms(words: &[(&str, u32)]) -> BTreeMap<String, u32> {
        words.iter().map(|(w, n)| (w.to_string(), *n)).collect()
    }

    #[test]
    fn test_identical_content_indexed_once() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut indexer = DocumentIndexer::new();
        let hash = ContentHash::of(b"mirrored body");

        let first = indexer
            .admit_document(&hash, terms(&[("mirrored", 1)]), &mut storage)
            .unwrap();
        let second = indexer
            .admit_document(&hash, terms(&[("mirrored", 1)]), &mut storage)
            .unwrap();

        assert_eq!(first, Admission::Admitted(0));
        assert_eq!(second, Admission::Duplicate);
        assert_eq!(storage.count_documents().unwrap(), 1);
    }

    #[test]
    fn test_distinct_content_indexed_twice() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut indexer = DocumentIndexer::new();

        indexer
            .admit_document(&ContentHash::of(b"one"), terms(&[("one", 1)]), &mut storage)
            .unwrap();
        indexer
            .admit_document(&ContentHash::of(b"two"), terms(&[("two", 2)]), &mut storage)
            .unwrap();

        assert_eq!(indexer.len(), 2);
        let docs = storage.all_documents().unwrap();
        assert_eq!(docs[1].id, 1);
        assert_eq!(docs[1].content_hash, ContentHash::of(b"two"));
        assert_eq!(docs[1].term_frequencies.get("two"), Some(&2));
    }

    #[test]
    fn test_save_and_load_continue_ids() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut indexer = DocumentIndexer::new();
        indexer
            .admit_document(&ContentHash::of(b"a"), terms(&[("a", 1)]), &mut storage)
            .unwrap();
        indexer.save(&mut storage).unwrap();

        let mut loaded = DocumentIndexer::load(&storage).unwrap();
        assert!(loaded.is_indexed(&ContentHash::of(b"a")));
        assert_eq!(loaded.id_of(&ContentHash::of(b"a")).unwrap(), 0);

        let admission = loaded
            .admit_document(&ContentHash::of(b"b"), terms(&[("b", 1)]), &mut storage)
            .unwrap();
        assert_eq!(admission, Admission::Admitted(1));
    }

    #[test]
    fn test_corrupt_checkpoint_falls_back_to_store() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut indexer = DocumentIndexer::new();
        indexer
            .admit_document(&ContentHash::of(b"a"), terms(&[("a", 1)]), &mut storage)
            .unwrap();
        storage
            .put_checkpoint(DOCUMENT_REGISTRY_CHECKPOINT, &serde_json::json!({"x": "y"}))
            .unwrap();

        let loaded = DocumentIndexer::load(&storage).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.is_indexed(&ContentHash::of(b"a")));
    }
}
