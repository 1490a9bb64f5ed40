//! Construction-time selection of a block store backend.

use crate::storage::fs_storage::{FsConfig, FsStore};
use crate::storage::memory_storage::MemoryStore;
use crate::storage::object_storage::{ObjectStoreConfig, RemoteObjectStore};
use crate::storage::redb_storage::{RedbConfig, RedbStore};
use crate::storage::rocksdb_storage::{RocksDbConfig, RocksDbStore};
use crate::storage::storage_trait::{BlockStore, BlockStoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Block store backend and its tuning options.
///
/// In TOML the variant is picked by the `backend` key:
///
/// ```toml
/// [block_store]
/// backend = "redb"
/// path = "blocks.redb"
/// cache_bytes = 16777216
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BlockStoreConfig {
    Rocksdb(RocksDbConfig),
    Redb(RedbConfig),
    ObjectStore(ObjectStoreConfig),
    Fs(FsConfig),
    Memory,
}

impl Default for BlockStoreConfig {
    fn default() -> Self {
        BlockStoreConfig::Rocksdb(RocksDbConfig::default())
    }
}

impl BlockStoreConfig {
    /// Returns the short backend name used in logs and config files.
    pub fn backend_name(&self) -> &'static str {
        match self {
            BlockStoreConfig::Rocksdb(_) => "rocksdb",
            BlockStoreConfig::Redb(_) => "redb",
            BlockStoreConfig::ObjectStore(_) => "object_store",
            BlockStoreConfig::Fs(_) => "fs",
            BlockStoreConfig::Memory => "memory",
        }
    }

    /// Resolves relative on-disk paths against `base`.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        let path = match &mut self {
            BlockStoreConfig::Rocksdb(c) => Some(&mut c.path),
            BlockStoreConfig::Redb(c) => Some(&mut c.path),
            BlockStoreConfig::Fs(c) => Some(&mut c.path),
            BlockStoreConfig::ObjectStore(_) | BlockStoreConfig::Memory => None,
        };
        if let Some(path) = path
            && path.is_relative()
        {
            *path = base.join(&*path);
        }
        self
    }
}

/// Opens the block store selected by `config`.
pub fn open_block_store(config: &BlockStoreConfig) -> Result<Arc<dyn BlockStore>, BlockStoreError> {
    let store: Arc<dyn BlockStore> = match config {
        BlockStoreConfig::Rocksdb(c) => Arc::new(RocksDbStore::open(c)?),
        BlockStoreConfig::Redb(c) => Arc::new(RedbStore::open(c)?),
        BlockStoreConfig::ObjectStore(c) => Arc::new(RemoteObjectStore::connect(c)?),
        BlockStoreConfig::Fs(c) => Arc::new(FsStore::open(c)?),
        BlockStoreConfig::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
