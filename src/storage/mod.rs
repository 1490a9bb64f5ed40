//! Block store subsystem.
//!
//! This module provides the content-addressed storage contract and its
//! backends:
//!
//! - [`storage_trait`]: Core [`BlockStore`](storage_trait::BlockStore) trait and error taxonomy
//! - [`rocksdb_storage`]: Embedded LSM-tree backend
//! - [`redb_storage`]: Embedded ordered on-disk backend
//! - [`object_storage`]: Remote S3-compatible backend
//! - [`fs_storage`]: Sharded flat-file backend
//! - [`memory_storage`]: In-memory backend for tests
//! - [`config`]: Tagged backend selection
//! - [`objects`]: Typed entity helpers

pub mod config;
pub mod fs_storage;
pub mod memory_storage;
pub mod object_storage;
pub mod objects;
pub mod redb_storage;
pub mod rocksdb_storage;
pub mod storage_trait;

pub use config::{BlockStoreConfig, open_block_store};
pub use storage_trait::{BlockStore, BlockStoreError};
