//! redb-backed block store.
//!
//! A single ordered table holds every object. Each put or delete is its
//! own write transaction, committed before the call returns.

use crate::info;
use crate::storage::storage_trait::{BlockStore, BlockStoreError, check_key};
use crate::types::bytes::Bytes;
use redb::{Database, TableDefinition};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;

/// Table holding stored objects.
const OBJECTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("objects");

/// Default page cache size in bytes.
pub const DEFAULT_CACHE_BYTES: usize = 32 * 1024 * 1024;

/// Tuning options for the redb backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedbConfig {
    /// Database file.
    pub path: PathBuf,
    /// Page cache size in bytes.
    pub cache_bytes: usize,
}

impl Default for RedbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("blocks.redb"),
            cache_bytes: DEFAULT_CACHE_BYTES,
        }
    }
}

fn io_error(e: impl Display) -> BlockStoreError {
    BlockStoreError::Io(e.to_string())
}

/// Block store backed by an embedded redb database file.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Opens (creating if missing) the database file described by `config`.
    pub fn open(config: &RedbConfig) -> Result<Self, BlockStoreError> {
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let db = Database::builder()
            .set_cache_size(config.cache_bytes)
            .create(&config.path)
            .map_err(io_error)?;

        // Create the table up front so read transactions never miss it.
        let write_txn = db.begin_write().map_err(io_error)?;
        {
            write_txn.open_table(OBJECTS).map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)?;

        info!("Opened redb block store at {}", config.path.display());
        Ok(Self { db })
    }
}

impl BlockStore for RedbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>, BlockStoreError> {
        check_key(key)?;
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(OBJECTS).map_err(io_error)?;
        let value = table.get(key).map_err(io_error)?;
        Ok(value.map(|guard| Bytes::new(guard.value())))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), BlockStoreError> {
        check_key(key)?;
        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut table = write_txn.open_table(OBJECTS).map_err(io_error)?;
            table.insert(key, value).map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)
    }

    fn has(&self, key: &[u8]) -> Result<bool, BlockStoreError> {
        check_key(key)?;
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(OBJECTS).map_err(io_error)?;
        Ok(table.get(key).map_err(io_error)?.is_some())
    }

    fn delete(&self, key: &[u8]) -> Result<(), BlockStoreError> {
        check_key(key)?;
        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut table = write_txn.open_table(OBJECTS).map_err(io_error)?;
            table.remove(key).map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)
    }
}
