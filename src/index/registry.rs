//! Incremental id registry
//!
//! The identity-assignment primitive shared by the URL and document indexers:
//! every new key gets the next dense integer id, and an id is never changed,
//! reassigned or reused, including across export/restore.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;
use thiserror::Error;

/// Invariant violations raised by the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Key not found in registry: {0}")]
    KeyNotFound(String),

    #[error("Id {id} assigned to both {first} and {second}")]
    DuplicateId {
        id: u64,
        first: String,
        second: String,
    },

    #[error("Id assignment out of order: expected {expected}, got {actual}")]
    NonMonotonic { expected: u64, actual: u64 },
}

/// Bijective map from opaque key to a dense, monotonically increasing id
///
/// Ids start at 0 and are handed out in first-seen order.
#[derive(Debug, Clone)]
pub struct IdRegistry<K> {
    ids: HashMap<K, u64>,
    next_id: u64,
}

impl<K> Default for IdRegistry<K> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<K> IdRegistry<K>
where
    K: Clone + Eq + Hash + Ord + Display,
{
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `key` with the next free id if absent
    ///
    /// Returns the key's id, whether it was just assigned or already present.
    pub fn add(&mut self, key: K) -> u64 {
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }

        let id = self.next_id;
        self.ids.insert(key, id);
        self.next_id += 1;
        id
    }

    /// Returns true if the key has an id
    pub fn contains(&self, key: &K) -> bool {
        self.ids.contains_key(key)
    }

    /// Looks up the id of a key that must already be present
    pub fn id_of(&self, key: &K) -> Result<u64, RegistryError> {
        self.ids
            .get(key)
            .copied()
            .ok_or_else(|| RegistryError::KeyNotFound(key.to_string()))
    }

    /// The id the next new key will receive
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Number of keys registered
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Exports the key → id mapping
    pub fn export(&self) -> BTreeMap<K, u64> {
        self.ids.iter().map(|(k, id)| (k.clone(), *id)).collect()
    }

    /// Keys in id order
    pub fn keys_by_id(&self) -> Vec<(u64, &K)> {
        let mut keys: Vec<(u64, &K)> = self.ids.iter().map(|(k, id)| (*id, k)).collect();
        keys.sort_by_key(|(id, _)| *id);
        keys
    }

    /// Rebuilds a registry from a previously exported mapping
    ///
    /// New ids continue from `max + 1`. A mapping that gives the same id to
    /// two keys is rejected, since accepting it would break the bijection.
    pub fn restore(mapping: BTreeMap<K, u64>) -> Result<Self, RegistryError> {
        let mut owners: HashMap<u64, K> = HashMap::with_capacity(mapping.len());
        let mut ids = HashMap::with_capacity(mapping.len());
        let mut next_id = 0;

        for (key, id) in mapping {
            if let Some(first) = owners.get(&id) {
                return Err(RegistryError::DuplicateId {
                    id,
                    first: first.to_string(),
                    second: key.to_string(),
                });
            }
            owners.insert(id, key.clone());
            next_id = next_id.max(id + 1);
            ids.insert(key, id);
        }

        Ok(Self { ids, next_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_zero_and_increase() {
        let mut registry = IdRegistry::new();
        assert_eq!(registry.add("a".to_string()), 0);
        assert_eq!(registry.add("b".to_string()), 1);
        assert_eq!(registry.add("c".to_string()), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_add_existing_is_noop() {
        let mut registry = IdRegistry::new();
        registry.add("a".to_string());
        registry.add("b".to_string());

        assert_eq!(registry.add("a".to_string()), 0);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.next_id(), 2);
    }

    #[test]
    fn test_ids_follow_first_seen_order() {
        let mut registry = IdRegistry::new();
        let keys = ["x", "y", "x", "z", "y", "w"];
        for key in keys {
            registry.add(key.to_string());
        }

        let ordered: Vec<_> = registry
            .keys_by_id()
            .into_iter()
            .map(|(id, k)| (id, k.as_str()))
            .collect();
        assert_eq!(ordered, vec![(0, "x"), (1, "y"), (2, "z"), (3, "w")]);
    }

    #[test]
    fn test_id_of_absent_key_is_error() {
        let registry: IdRegistry<String> = IdRegistry::new();
        assert_eq!(
            registry.id_of(&"missing".to_string()),
            Err(RegistryError::KeyNotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_contains() {
        let mut registry = IdRegistry::new();
        registry.add("a".to_string());
        assert!(registry.contains(&"a".to_string()));
        assert!(!registry.contains(&"b".to_string()));
    }

    #[test]
    fn test_restore_continues_after_max() {
        let mut registry = IdRegistry::new();
        for key in ["a", "b", "c"] {
            registry.add(key.to_string());
        }

        let exported = registry.export();
        let mut restored = IdRegistry::restore(exported.clone()).unwrap();

        for (key, id) in &exported {
            assert_eq!(restored.id_of(key).unwrap(), *id);
        }

        let new_id = restored.add("d".to_string());
        assert_eq!(new_id, 3);
        assert!(!exported.values().any(|id| *id == new_id));
    }

    #[test]
    fn test_restore_with_gap_uses_max_plus_one() {
        let mut mapping = BTreeMap::new();
        mapping.insert("a".to_string(), 0);
        mapping.insert("b".to_string(), 7);

        let mut restored = IdRegistry::restore(mapping).unwrap();
        assert_eq!(restored.add("c".to_string()), 8);
    }

    #[test]
    fn test_restore_rejects_duplicate_ids() {
        let mut mapping = BTreeMap::new();
        mapping.insert("a".to_string(), 1);
        mapping.insert("b".to_string(), 1);

        let result = IdRegistry::restore(mapping);
        assert!(matches!(result, Err(RegistryError::DuplicateId { id: 1, .. })));
    }

    #[test]
    fn test_restore_empty() {
        let mut restored: IdRegistry<String> = IdRegistry::restore(BTreeMap::new()).unwrap();
        assert!(restored.is_empty());
        assert_eq!(restored.add("a".to_string()), 0);
    }
}
