//! RocksDB-backed block store.
//!
//! Objects live in a dedicated [`CF_OBJECTS`] column family so the database
//! can host other column families alongside it. Durability comes from
//! RocksDB's own write-ahead log; every put is a single atomic write.

use crate::info;
use crate::storage::storage_trait::{BlockStore, BlockStoreError, check_key};
use crate::types::bytes::Bytes;
use rocksdb::{BlockBasedOptions, Cache, ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Column family name for stored objects.
pub const CF_OBJECTS: &str = "objects";

/// Default block cache size in bytes.
pub const DEFAULT_CACHE_BYTES: usize = 64 * 1024 * 1024;

/// Tuning options for the RocksDB backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDbConfig {
    /// Database directory.
    pub path: PathBuf,
    /// LRU block cache size in bytes.
    pub cache_bytes: usize,
    /// Maximum number of open files, `-1` leaves it unbounded.
    pub max_open_files: i32,
    /// Compress SST files with LZ4.
    pub compression: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("blocks"),
            cache_bytes: DEFAULT_CACHE_BYTES,
            max_open_files: -1,
            compression: true,
        }
    }
}

fn io_error(e: rocksdb::Error) -> BlockStoreError {
    BlockStoreError::Io(e.to_string())
}

/// Block store backed by an embedded RocksDB database.
pub struct RocksDbStore {
    db: DB,
}

impl RocksDbStore {
    /// Opens (creating if missing) the database described by `config`.
    pub fn open(config: &RocksDbConfig) -> Result<Self, BlockStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);

        let mut cf_opts = Options::default();
        let mut table_opts = BlockBasedOptions::default();
        let cache = Cache::new_lru_cache(config.cache_bytes);
        table_opts.set_block_cache(&cache);
        cf_opts.set_block_based_table_factory(&table_opts);
        if config.compression {
            cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        }

        let db = DB::open_cf_descriptors(
            &opts,
            &config.path,
            vec![ColumnFamilyDescriptor::new(CF_OBJECTS, cf_opts)],
        )
        .map_err(io_error)?;

        info!("Opened RocksDB block store at {}", config.path.display());
        Ok(Self { db })
    }

    /// Opens a store at `path` with default tuning.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, BlockStoreError> {
        Self::open(&RocksDbConfig {
            path: path.as_ref().to_path_buf(),
            ..RocksDbConfig::default()
        })
    }

    fn objects(&self) -> Result<&ColumnFamily, BlockStoreError> {
        self.db
            .cf_handle(CF_OBJECTS)
            .ok_or_else(|| BlockStoreError::Io(format!("missing column family {CF_OBJECTS}")))
    }
}

impl BlockStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>, BlockStoreError> {
        check_key(key)?;
        let value = self.db.get_cf(self.objects()?, key).map_err(io_error)?;
        Ok(value.map(Bytes::from_vec))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), BlockStoreError> {
        check_key(key)?;
        self.db.put_cf(self.objects()?, key, value).map_err(io_error)
    }

    fn has(&self, key: &[u8]) -> Result<bool, BlockStoreError> {
        check_key(key)?;
        let pinned = self.db.get_pinned_cf(self.objects()?, key).map_err(io_error)?;
        Ok(pinned.is_some())
    }

    fn delete(&self, key: &[u8]) -> Result<(), BlockStoreError> {
        check_key(key)?;
        self.db.delete_cf(self.objects()?, key).map_err(io_error)
    }
}
