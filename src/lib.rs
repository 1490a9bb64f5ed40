//! State ledger library.
//!
//! Provides hash-addressed ledger entities, a transaction mempool with local
//! and remote backends, and a block store adapter over embedded and remote
//! key/value stores.

pub mod config;
pub mod core;
pub mod mempool;
pub mod network;
pub mod storage;
pub mod types;
pub mod utils;
