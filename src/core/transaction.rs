//! Contract method invocations staged in the mempool and bound into blocks.

use crate::core::chain_object::ChainObject;
use crate::types::bytes::Bytes;
use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};
use crate::types::merkle_tree::MerkleTree;

/// A request to invoke `method` with an opaque argument payload.
///
/// Uses `Bytes` for the payload so the same transaction can sit in the
/// mempool, a gossip message and a block commit without copying.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    /// Content hash; authoritative once set and never recomputed.
    pub tx_hash: Option<String>,
    /// Contract method being invoked.
    pub method: String,
    /// Method arguments, opaque to the ledger.
    pub payload: Bytes,
}

impl Transaction {
    /// Creates a transaction without a precomputed hash.
    pub fn new(method: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            tx_hash: None,
            method: method.into(),
            payload: payload.into(),
        }
    }

    /// Returns the transaction with `tx_hash` filled from its content.
    pub fn with_hash(mut self) -> Self {
        self.set_hash();
        self
    }

    /// Stores the computed content hash in `tx_hash`.
    pub fn set_hash(&mut self) {
        self.tx_hash = Some(self.compute_hash());
    }
}

impl ChainObject for Transaction {
    const DOMAIN: &'static [u8] = b"STATELEDGER_TX";

    fn precomputed_hash(&self) -> Option<&str> {
        self.tx_hash.as_deref()
    }

    fn encode_content<S: EncodeSink>(&self, out: &mut S) {
        self.method.encode(out);
        self.payload.encode(out);
    }
}

impl Encode for Transaction {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.tx_hash.encode(out);
        self.encode_content(out);
    }
}

impl Decode for Transaction {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            tx_hash: Option::<String>::decode(input)?,
            method: String::decode(input)?,
            payload: Bytes::decode(input)?,
        })
    }
}

/// Returns `true` when the transaction carries a hash matching its content.
pub fn verify_transaction(tx: &Transaction) -> bool {
    match tx.tx_hash.as_deref() {
        Some(hash) => hash == tx.compute_hash(),
        None => false,
    }
}

/// Merkle root of the transactions' hashes, in order, as hex.
pub fn txs_hash(txs: &[Transaction]) -> String {
    let hashes: Vec<String> = txs.iter().map(|tx| tx.hash()).collect();
    MerkleTree::from_hashes(&hashes).to_hex()
}
