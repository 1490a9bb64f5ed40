//! Node configuration loaded from TOML.
//!
//! ```toml
//! data_dir = "~/.stateledger"
//!
//! [block_store]
//! backend = "rocksdb"
//! path = "blocks"
//!
//! [mempool]
//! backend = "redis"
//! url = "redis://127.0.0.1:6379"
//! ```
//!
//! Every section is optional. Relative block store paths are resolved
//! against `data_dir`.

use crate::info;
use crate::mempool::{Mempool, MempoolConfig, MempoolError, open_mempool};
use crate::storage::{BlockStore, BlockStoreConfig, BlockStoreError, open_block_store};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default data directory, relative to the home directory.
pub const DEFAULT_DATA_DIR: &str = "~/.stateledger";

/// Errors raised while loading a configuration or opening its components.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A path starts with `~` but the home directory is unknown.
    #[error("home directory not found")]
    NoHomeDir,

    #[error(transparent)]
    BlockStore(#[from] BlockStoreError),

    #[error(transparent)]
    Mempool(#[from] MempoolError),
}

/// Top-level node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Root directory of on-disk state; `~` expands to the home directory.
    pub data_dir: PathBuf,
    pub block_store: BlockStoreConfig,
    pub mempool: MempoolConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            block_store: BlockStoreConfig::default(),
            mempool: MempoolConfig::default(),
        }
    }
}

/// Replaces a leading `~` component with the home directory.
pub fn expand_home(path: &Path) -> Result<PathBuf, ConfigError> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

impl LedgerConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Returns the data directory with `~` expanded.
    pub fn resolved_data_dir(&self) -> Result<PathBuf, ConfigError> {
        expand_home(&self.data_dir)
    }

    /// Returns the block store configuration with paths resolved.
    pub fn resolved_block_store(&self) -> Result<BlockStoreConfig, ConfigError> {
        let base = self.resolved_data_dir()?;
        Ok(self.block_store.clone().rooted_at(&base))
    }

    /// Creates the data directory and opens the configured block store and
    /// mempool.
    ///
    /// Remote backends are probed, so an unreachable service fails here
    /// rather than on first use.
    pub fn open(&self) -> Result<(Arc<dyn BlockStore>, Arc<dyn Mempool>), ConfigError> {
        let data_dir = self.resolved_data_dir()?;
        fs::create_dir_all(&data_dir).map_err(|source| ConfigError::Io {
            path: data_dir.clone(),
            source,
        })?;

        let block_store = self.resolved_block_store()?;
        let store = open_block_store(&block_store)?;
        let mempool = open_mempool(&self.mempool)?;

        info!(
            "Opened ledger in {}: block_store={} mempool={}",
            data_dir.display(),
            block_store.backend_name(),
            match self.mempool {
                MempoolConfig::Local => "local",
                MempoolConfig::Redis(_) => "redis",
            }
        );
        Ok((store, mempool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::Transaction;
    use crate::mempool::RedisConfig;
    use crate::storage::redb_storage::RedbConfig;
    use crate::storage::rocksdb_storage::RocksDbConfig;
    use tempfile::TempDir;

    #[test]
    fn empty_file_yields_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.data_dir, PathBuf::from("~/.stateledger"));
        assert_eq!(config.block_store.backend_name(), "rocksdb");
        assert_eq!(config.mempool, MempoolConfig::Local);
    }

    #[test]
    fn sections_select_backends() {
        let config = LedgerConfig::from_toml_str(
            r#"
            data_dir = "/var/lib/ledger"

            [block_store]
            backend = "redb"
            path = "chain.redb"

            [mempool]
            backend = "redis"
            url = "redis://cache:6379/2"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.resolved_block_store().unwrap(),
            BlockStoreConfig::Redb(RedbConfig {
                path: PathBuf::from("/var/lib/ledger/chain.redb"),
                ..RedbConfig::default()
            })
        );
        assert_eq!(
            config.mempool,
            MempoolConfig::Redis(RedisConfig {
                url: "redis://cache:6379/2".into(),
                ..RedisConfig::default()
            })
        );
    }

    #[test]
    fn default_block_store_lives_under_data_dir() {
        let config = LedgerConfig {
            data_dir: PathBuf::from("/srv/ledger"),
            ..LedgerConfig::default()
        };
        assert_eq!(
            config.resolved_block_store().unwrap(),
            BlockStoreConfig::Rocksdb(RocksDbConfig {
                path: PathBuf::from("/srv/ledger/blocks"),
                ..RocksDbConfig::default()
            })
        );
    }

    #[test]
    fn tilde_expands_to_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            expand_home(Path::new("~/.stateledger")).unwrap(),
            home.join(".stateledger")
        );
        assert_eq!(
            expand_home(Path::new("/abs/path")).unwrap(),
            PathBuf::from("/abs/path")
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            LedgerConfig::from_toml_str("data_dirr = \"/tmp\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            LedgerConfig::load(dir.path().join("absent.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn load_and_open_embedded_components() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("node");
        let file = dir.path().join("ledger.toml");
        fs::write(
            &file,
            format!(
                "data_dir = {:?}\n[block_store]\nbackend = \"fs\"\npath = \"objects\"\n",
                data_dir.display().to_string()
            ),
        )
        .unwrap();

        let (store, mempool) = LedgerConfig::load(&file).unwrap().open().unwrap();
        store.put(b"k", b"v").unwrap();
        assert_eq!(store.get(b"k").unwrap().unwrap().to_vec(), b"v".to_vec());
        assert!(data_dir.join("objects").is_dir());

        let tx = Transaction::new("set", b"x=1").with_hash();
        mempool.add_tx(&tx).unwrap();
        assert_eq!(mempool.gather_transactions().unwrap(), vec![tx]);
    }
}
