//! Content-addressed block store abstraction.
//!
//! Defines the [`BlockStore`] trait shared by every persistence backend and
//! the error taxonomy backends map their native failures into.

use crate::types::bytes::Bytes;
use crate::types::encoding::EncodingError;

/// Errors that can occur while interacting with a block store.
#[derive(Debug, thiserror::Error)]
pub enum BlockStoreError {
    /// The caller passed a key or value the store cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A remote backend could not be reached or rejected the request.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// A local backend failed to read or write.
    #[error("storage i/o failed: {0}")]
    Io(String),
    /// A stored object could not be decoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Uniform get/put/has/delete over a persistence backend.
///
/// Missing keys are never an error: `get` returns `None`, `has` returns
/// `false` and `delete` succeeds. Implementations must be thread-safe
/// (`Send + Sync`) so a single store can be shared across handlers.
pub trait BlockStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>, BlockStoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), BlockStoreError>;

    /// Returns `true` if a value is stored under `key`.
    fn has(&self, key: &[u8]) -> Result<bool, BlockStoreError>;

    /// Removes the value stored under `key`, if any.
    fn delete(&self, key: &[u8]) -> Result<(), BlockStoreError>;
}

/// Rejects the empty key, which no backend can address uniformly.
pub(crate) fn check_key(key: &[u8]) -> Result<(), BlockStoreError> {
    if key.is_empty() {
        return Err(BlockStoreError::InvalidArgument("empty key".into()));
    }
    Ok(())
}
