//! In-memory block store for tests and ephemeral nodes.

use crate::storage::storage_trait::{BlockStore, BlockStoreError, check_key};
use crate::types::bytes::Bytes;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Block store holding every object in a process-local map.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<Vec<u8>, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Vec<u8>, Bytes>> {
        self.objects.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Vec<u8>, Bytes>> {
        self.objects.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl BlockStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>, BlockStoreError> {
        check_key(key)?;
        Ok(self.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), BlockStoreError> {
        check_key(key)?;
        let value = Bytes::new(value);
        self.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool, BlockStoreError> {
        check_key(key)?;
        Ok(self.read().contains_key(key))
    }

    fn delete(&self, key: &[u8]) -> Result<(), BlockStoreError> {
        check_key(key)?;
        self.write().remove(key);
        Ok(())
    }
}
