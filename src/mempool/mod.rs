//! Staging area for transactions awaiting inclusion in a state block.
//!
//! - [`Mempool`]: the capability contract shared by every backend
//! - [`local_mempool`]: in-process backend behind a single mutex
//! - [`remote_mempool`]: backend over a remote key/value store
//! - [`kv`]: connection and pool traits the remote backend runs on
//! - [`redis_kv`]: Redis implementation of those traits
//!
//! Every backend keeps two views consistent: the primary mapping from
//! `tx_<hash>` to serialized transaction, and the membership index of raw
//! hashes used for bulk retrieval. A hash is in the index if and only if its
//! primary key exists.

pub mod kv;
pub mod local_mempool;
pub mod redis_kv;
pub mod remote_mempool;
#[cfg(test)]
pub(crate) mod test_kv;

use crate::core::chain_object::ChainObject;
use crate::core::transaction::Transaction;
use crate::types::encoding::EncodingError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use local_mempool::LocalMempool;
pub use redis_kv::{RedisConfig, RedisPool};
pub use remote_mempool::RemoteMempool;

/// Namespace prefix of primary-store keys.
pub const TX_KEY_PREFIX: &str = "tx_";
/// Name of the membership index set.
pub const INDEX_SET: &str = "transactions";

/// Returns the primary-store key for a transaction hash.
pub fn tx_key(hash: &str) -> String {
    format!("{TX_KEY_PREFIX}{hash}")
}

/// Errors that can occur while interacting with a mempool.
#[derive(Debug, thiserror::Error)]
pub enum MempoolError {
    /// A required input was missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A stored transaction could not be decoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The primary mapping and membership index disagree.
    #[error("mempool inconsistent: {0}")]
    Consistency(String),
    /// The backing service could not be reached or failed a request.
    #[error("mempool backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Concurrency-safe set of unconfirmed transactions keyed by hash.
///
/// Reads of absent hashes are not errors. Removal is idempotent.
pub trait Mempool: Send + Sync {
    /// Returns `true` if a transaction with `hash` is staged.
    fn has_tx(&self, hash: &str) -> Result<bool, MempoolError>;

    /// Returns the staged transaction with `hash`, or `None`.
    fn get_tx(&self, hash: &str) -> Result<Option<Transaction>, MempoolError>;

    /// Returns the staged transactions among `hashes`, skipping absent ones.
    fn get_txs(&self, hashes: &[String]) -> Result<Vec<Transaction>, MempoolError>;

    /// Stages `tx` under its hash.
    ///
    /// Fails with `InvalidArgument` if the transaction's hash is empty.
    fn add_tx(&self, tx: &Transaction) -> Result<(), MempoolError>;

    /// Removes the transaction with `hash`, if staged.
    fn remove_tx(&self, hash: &str) -> Result<(), MempoolError> {
        self.remove_txs(&[hash.to_string()])
    }

    /// Removes every transaction in `hashes` that is staged.
    fn remove_txs(&self, hashes: &[String]) -> Result<(), MempoolError>;

    /// Returns every staged transaction.
    ///
    /// Fails with `Consistency` if an indexed hash has no stored transaction.
    fn gather_transactions(&self) -> Result<Vec<Transaction>, MempoolError>;
}

/// Returns the hash `tx` is staged under, rejecting an empty one.
pub(crate) fn staging_hash(tx: &Transaction) -> Result<String, MempoolError> {
    let hash = tx.hash();
    if hash.is_empty() {
        return Err(MempoolError::InvalidArgument(
            "transaction has an empty hash".into(),
        ));
    }
    Ok(hash)
}

/// Mempool backend selection.
///
/// ```toml
/// [mempool]
/// backend = "redis"
/// url = "redis://127.0.0.1:6379"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum MempoolConfig {
    #[default]
    Local,
    Redis(RedisConfig),
}

/// Opens the mempool selected by `config`.
///
/// The Redis backend is probed and fails with `BackendUnavailable` if the
/// server does not answer.
pub fn open_mempool(config: &MempoolConfig) -> Result<Arc<dyn Mempool>, MempoolError> {
    let mempool: Arc<dyn Mempool> = match config {
        MempoolConfig::Local => Arc::new(LocalMempool::new()),
        MempoolConfig::Redis(c) => Arc::new(RemoteMempool::new(RedisPool::connect(c)?)?),
    };
    Ok(mempool)
}
