//! Flat-file block store, one file per object.
//!
//! Objects are written to `<root>/<shard>/<hex key>` where the shard is the
//! first [`SHARD_CHARS`] hex characters of the key. Keys whose hex form is
//! longer than [`MAX_NAME_CHARS`] are named `h<sha3 of key>` instead, which
//! keeps every filename within common filesystem limits and cannot clash with
//! a plain hex name. Writes go to a temporary
//! file first and are renamed into place, so readers never observe a torn
//! object. The root directory is guarded by an exclusive lock file for the
//! lifetime of the store.

use crate::storage::storage_trait::{BlockStore, BlockStoreError, check_key};
use crate::types::bytes::Bytes;
use crate::types::hash::Hash;
use crate::{info, warn};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of leading hex characters used to pick an object's directory.
pub const SHARD_CHARS: usize = 4;
/// Longest hex filename written as-is.
pub const MAX_NAME_CHARS: usize = 200;
const LOCK_FILE: &str = ".lock";

/// Options for the flat-file backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Root directory.
    pub path: PathBuf,
    /// Flush file contents to disk before renaming into place.
    pub sync_writes: bool,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("objects"),
            sync_writes: true,
        }
    }
}

fn io_error(e: io::Error) -> BlockStoreError {
    BlockStoreError::Io(e.to_string())
}

/// Block store keeping each object in its own file.
pub struct FsStore {
    root: PathBuf,
    sync_writes: bool,
    tmp_counter: AtomicU64,
    // Holds the exclusive directory lock until the store is dropped.
    _lock: File,
}

impl FsStore {
    /// Opens the directory described by `config`, creating it if needed.
    ///
    /// Fails with `Io` if another store already holds the directory lock.
    pub fn open(config: &FsConfig) -> Result<Self, BlockStoreError> {
        fs::create_dir_all(&config.path).map_err(io_error)?;
        let lock = acquire_dir_lock(&config.path).map_err(io_error)?;

        info!("Opened flat-file block store at {}", config.path.display());
        Ok(Self {
            root: config.path.clone(),
            sync_writes: config.sync_writes,
            tmp_counter: AtomicU64::new(0),
            _lock: lock,
        })
    }

    fn object_path(&self, key: &[u8]) -> PathBuf {
        let name = hex::encode(key);
        let shard = &name[..name.len().min(SHARD_CHARS)];
        if name.len() > MAX_NAME_CHARS {
            return self.root.join(shard).join(format!("h{}", Hash::digest(key).to_hex()));
        }
        self.root.join(shard).join(&name)
    }

    fn write_atomic(&self, path: &Path, value: &[u8]) -> io::Result<()> {
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = dir.join(format!(".tmp-{}-{}", std::process::id(), n));
        let result = (|| {
            let mut file = File::create(&tmp)?;
            file.write_all(value)?;
            if self.sync_writes {
                file.sync_all()?;
            }
            fs::rename(&tmp, path)
        })();

        if result.is_err()
            && let Err(e) = fs::remove_file(&tmp)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!("failed to remove temporary file {}: {}", tmp.display(), e);
        }
        result
    }
}

/// Creates `<dir>/.lock` and takes an exclusive lock on it.
fn acquire_dir_lock(dir: &Path) -> io::Result<File> {
    let lock_path = dir.join(LOCK_FILE);
    let file = File::create(&lock_path)?;
    file.try_lock_exclusive().map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("block store directory is in use: {}", dir.display()),
        )
    })?;
    Ok(file)
}

impl BlockStore for FsStore {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>, BlockStoreError> {
        check_key(key)?;
        match fs::read(self.object_path(key)) {
            Ok(data) => Ok(Some(Bytes::from_vec(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e)),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), BlockStoreError> {
        check_key(key)?;
        self.write_atomic(&self.object_path(key), value)
            .map_err(io_error)
    }

    fn has(&self, key: &[u8]) -> Result<bool, BlockStoreError> {
        check_key(key)?;
        match fs::metadata(self.object_path(key)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(e)),
        }
    }

    fn delete(&self, key: &[u8]) -> Result<(), BlockStoreError> {
        check_key(key)?;
        match fs::remove_file(self.object_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }
}
