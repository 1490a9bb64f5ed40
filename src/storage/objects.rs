//! Typed access to ledger entities held in a block store.
//!
//! Entities are stored under the UTF-8 bytes of their hash, so the key of
//! any object can be recomputed from the object itself.

use crate::core::chain_object::ChainObject;
use crate::storage::storage_trait::{BlockStore, BlockStoreError};

/// Stores `object` under its hash and returns that hash.
pub fn put_object<T: ChainObject>(
    store: &dyn BlockStore,
    object: &T,
) -> Result<String, BlockStoreError> {
    let hash = object.hash();
    store.put(hash.as_bytes(), object.serialize().as_slice())?;
    Ok(hash)
}

/// Loads and decodes the object stored under `hash`.
pub fn get_object<T: ChainObject>(
    store: &dyn BlockStore,
    hash: &str,
) -> Result<Option<T>, BlockStoreError> {
    match store.get(hash.as_bytes())? {
        Some(raw) => Ok(Some(T::deserialize(&raw)?)),
        None => Ok(None),
    }
}
