//! Evidence Store
//!
//! Capacity-bounded map from parent key to its cached [`ItemSet`]. Eviction
//! removes whole parent-key entries in insertion order (oldest first); an
//! inner item set is always replaced wholesale, never mutated in place, so a
//! reader never observes a partially-loaded entry.
//!
//! Not internally synchronized: the loader serializes all access behind its
//! own locks.

use crate::types::ItemSet;
use indexmap::IndexMap;
use tracing::debug;

/// Insertion-ordered, capacity-bounded cache of item sets
pub struct EvidenceStore {
    entries: IndexMap<String, ItemSet>,
    max_entries: usize,
}

impl EvidenceStore {
    /// Create a store holding at most `max_entries` parent keys
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&self, parent_key: &str) -> Option<&ItemSet> {
        self.entries.get(parent_key)
    }

    pub fn contains(&self, parent_key: &str) -> bool {
        self.entries.contains_key(parent_key)
    }

    /// Insert or replace the item set for a parent key.
    ///
    /// If the store is at capacity, least-recently-inserted keys are evicted
    /// until the new entry fits. Re-inserting an existing key replaces its
    /// value without changing the key's insertion position.
    pub fn put(&mut self, parent_key: &str, items: ItemSet) {
        if self.entries.contains_key(parent_key) {
            self.entries.insert(parent_key.to_string(), items);
            return;
        }
        while self.entries.len() >= self.max_entries {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                debug!(parent_key = %evicted, "Evicted cache entry at capacity");
            }
        }
        self.entries.insert(parent_key.to_string(), items);
    }

    /// Remove one parent key; returns true if it was present
    pub fn evict(&mut self, parent_key: &str) -> bool {
        self.entries.shift_remove(parent_key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached parent keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over cached entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ItemSet)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChecklistItem;
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn item_set(item_id: &str) -> ItemSet {
        let mut set = HashMap::new();
        set.insert(
            item_id.to_string(),
            ChecklistItem {
                id: item_id.to_string(),
                label: "label".to_string(),
                status: "pending".to_string(),
                created_at: Utc::now(),
                evidence: HashMap::new(),
            },
        );
        set
    }

    #[test]
    fn test_put_get_evict() {
        let mut store = EvidenceStore::new(4);
        store.put("insp-1", item_set("a"));
        assert!(store.get("insp-1").is_some());
        assert!(store.get("insp-2").is_none());
        assert!(store.evict("insp-1"));
        assert!(!store.evict("insp-1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_eviction_is_insertion_ordered() {
        let mut store = EvidenceStore::new(2);
        store.put("x", item_set("a"));
        store.put("y", item_set("b"));
        store.put("z", item_set("c"));
        assert_eq!(store.len(), 2);
        assert!(store.get("x").is_none());
        assert!(store.get("y").is_some());
        assert!(store.get("z").is_some());
    }

    #[test]
    fn test_reinsert_replaces_without_eviction() {
        let mut store = EvidenceStore::new(2);
        store.put("x", item_set("a"));
        store.put("y", item_set("b"));
        store.put("x", item_set("c"));
        assert_eq!(store.len(), 2);
        assert!(store.get("x").unwrap().contains_key("c"));
        assert!(store.get("y").is_some());
    }

    #[test]
    fn test_capacity_floor_of_one() {
        let mut store = EvidenceStore::new(0);
        store.put("x", item_set("a"));
        assert_eq!(store.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_len_never_exceeds_capacity(
            keys in proptest::collection::vec("[a-z]{1,8}", 1..64),
            cap in 1usize..16,
        ) {
            let mut store = EvidenceStore::new(cap);
            for key in &keys {
                store.put(key, item_set("i"));
                prop_assert!(store.len() <= cap);
            }
        }
    }
}
