//! Core type definitions shared by the ledger entities and stores.
//!
//! - `Bytes`: shared, cheaply cloned byte buffer
//! - `Hash`: fixed-size 32-byte SHA3-256 digest
//! - `Cid`: content identifier of a DAG-CBOR value
//! - `encoding`: canonical binary codec and its error types
//! - `MerkleTree`: transaction-set roots

pub mod bytes;
pub mod cid;
pub mod encoding;
pub mod hash;
pub mod merkle_tree;
