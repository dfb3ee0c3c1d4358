//! Per-parent-key load coalescing.
//!
//! Concurrent `load` calls for the same parent key must share one in-flight
//! fetch rather than issuing duplicate queries. Each key gets its own async
//! mutex: the second caller awaits the first caller's lock, then re-checks the
//! cache and finds it populated. Loads for different keys never contend.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-key async lock manager
pub struct KeyLockManager {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLockManager {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the lock for a parent key.
    ///
    /// The returned Arc can be awaited outside any internal map lock.
    pub fn get_lock(&self, parent_key: &str) -> Arc<Mutex<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(parent_key) {
                return lock.clone();
            }
        }

        let mut map = self.locks.write();
        // Double-check after acquiring the write lock (another task might have
        // created it)
        map.entry(parent_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Number of keys currently holding a lock entry
    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.read().is_empty()
    }

    /// Drop the lock entry for a key with no remaining waiters.
    ///
    /// Called after every finished load and after invalidation, so the map
    /// never grows with one entry per key ever loaded.
    pub fn release(&self, parent_key: &str) {
        let mut map = self.locks.write();
        if let Some(lock) = map.get(parent_key) {
            // Strong count 1 means only the map holds it
            if Arc::strong_count(lock) == 1 {
                map.remove(parent_key);
            }
        }
    }
}

impl Default for KeyLockManager {
    fn default() -> Self {
        Self::new()
    }
}
