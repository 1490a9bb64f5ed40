//! State blocks: hash-linked records of one state transition of an image.

use crate::core::chain_object::ChainObject;
use crate::types::cid::Cid;
use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink, EncodingError};
use crate::types::merkle_tree::MerkleTree;
use crate::warn;
use serde::Serialize;

/// CID attribute under which a committed block is stored.
pub const BLOCK_ATTRIBUTE: &str = "block";

/// One state transition of an executable image.
///
/// `state_prev_diff_hash` links the block to its predecessor through the
/// diff that was applied; the genesis block (number 0) carries none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateBlock {
    /// Block hash; authoritative once set and never recomputed.
    pub block_hash: Option<String>,
    /// Position in the chain, genesis is 0.
    pub block_number: u64,
    /// Unix timestamp in seconds.
    pub block_time: u64,
    /// Content hash of the image whose execution produced this state.
    pub image_hash: String,
    /// Merkle root of the applied transactions' hashes.
    pub txs_hash: String,
    /// Hash of the diff applied on top of the previous state.
    pub state_prev_diff_hash: String,
    /// Hash of the resulting state.
    pub state_current_hash: String,
}

/// Canonical tuple addressed by a CID.
///
/// Fields are declared in DAG-CBOR canonical key order (shorter keys first).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CidTuple<'a> {
    image_hash: &'a str,
    block_number: u64,
    attribute_name: &'a str,
}

impl StateBlock {
    /// Creates the first block of an image's chain.
    pub fn genesis(image_hash: impl Into<String>, state_hash: impl Into<String>, block_time: u64) -> Self {
        Self {
            block_hash: None,
            block_number: 0,
            block_time,
            image_hash: image_hash.into(),
            txs_hash: MerkleTree::from_hashes::<&str>(&[]).to_hex(),
            state_prev_diff_hash: String::new(),
            state_current_hash: state_hash.into(),
        }
    }

    /// Returns the block with `block_hash` filled from its content.
    pub fn with_hash(mut self) -> Self {
        self.set_hash();
        self
    }

    /// Stores the computed content hash in `block_hash`.
    pub fn set_hash(&mut self) {
        self.block_hash = Some(self.compute_hash());
    }

    /// Derives the CID of the `{blockNumber, imageHash, attributeName}` view of this block.
    ///
    /// Distinct attribute names always yield distinct CIDs.
    pub fn compute_cid(&self, attribute_name: &str) -> Result<Cid, EncodingError> {
        let tuple = CidTuple {
            image_hash: &self.image_hash,
            block_number: self.block_number,
            attribute_name,
        };
        let encoded =
            serde_ipld_dagcbor::to_vec(&tuple).map_err(|e| EncodingError::Cbor(e.to_string()))?;
        Ok(Cid::for_dag_cbor(&encoded))
    }
}

impl ChainObject for StateBlock {
    const DOMAIN: &'static [u8] = b"STATELEDGER_STATE_BLOCK";

    fn precomputed_hash(&self) -> Option<&str> {
        self.block_hash.as_deref()
    }

    fn encode_content<S: EncodeSink>(&self, out: &mut S) {
        self.block_number.encode(out);
        self.block_time.encode(out);
        self.image_hash.encode(out);
        self.txs_hash.encode(out);
        self.state_prev_diff_hash.encode(out);
        self.state_current_hash.encode(out);
    }
}

impl Encode for StateBlock {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.block_hash.encode(out);
        self.encode_content(out);
    }
}

impl Decode for StateBlock {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            block_hash: Option::<String>::decode(input)?,
            block_number: u64::decode(input)?,
            block_time: u64::decode(input)?,
            image_hash: String::decode(input)?,
            txs_hash: String::decode(input)?,
            state_prev_diff_hash: String::decode(input)?,
            state_current_hash: String::decode(input)?,
        })
    }
}

/// Baseline structural check of a block.
///
/// Returns `Ok(false)` when a required field is empty or a precomputed hash
/// does not match the block's content. Fails only when the block cannot be
/// canonically encoded for addressing.
pub fn verify_block(block: &StateBlock) -> Result<bool, EncodingError> {
    block.compute_cid(BLOCK_ATTRIBUTE)?;

    if block.image_hash.is_empty()
        || block.txs_hash.is_empty()
        || block.state_current_hash.is_empty()
    {
        warn!("block {} is missing required hashes", block.block_number);
        return Ok(false);
    }

    if block.block_number > 0 && block.state_prev_diff_hash.is_empty() {
        warn!("block {} has no previous diff hash", block.block_number);
        return Ok(false);
    }

    if let Some(hash) = block.block_hash.as_deref()
        && hash != block.compute_hash()
    {
        warn!("block {} hash mismatch: stored {}", block.block_number, hash);
        return Ok(false);
    }

    Ok(true)
}
