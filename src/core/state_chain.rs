//! Assembly, link checking and persistence of successive state blocks.

use crate::core::block::{BLOCK_ATTRIBUTE, StateBlock, verify_block};
use crate::core::chain_object::ChainObject;
use crate::core::diff::Diff;
use crate::core::executor::{Executor, ExecutorError};
use crate::core::transaction::{Transaction, txs_hash};
use crate::mempool::{Mempool, MempoolError};
use crate::storage::objects::put_object;
use crate::storage::storage_trait::{BlockStore, BlockStoreError};
use crate::types::cid::Cid;
use crate::types::encoding::EncodingError;
use crate::{debug, info, warn};

/// Errors raised while building or committing a block.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Storage(#[from] BlockStoreError),
    #[error(transparent)]
    Mempool(#[from] MempoolError),
    /// The block failed structural or link verification.
    #[error("invalid block {number}: {reason}")]
    InvalidBlock { number: u64, reason: String },
}

fn invalid(block: &StateBlock, reason: impl Into<String>) -> ChainError {
    ChainError::InvalidBlock {
        number: block.block_number,
        reason: reason.into(),
    }
}

/// Builds the successor of `prev` by running `txs` on its image.
///
/// The new block keeps `prev`'s image, records the Merkle root of the
/// transactions and the hash of the diff the executor produced, and carries
/// the executor's resulting state hash. Returns the block with its hash set,
/// together with the diff it references.
pub fn build_next_block(
    prev: &StateBlock,
    txs: &[Transaction],
    executor: &dyn Executor,
    block_time: u64,
) -> Result<(StateBlock, Diff), ChainError> {
    if !verify_block(prev)? {
        return Err(invalid(prev, "previous block does not verify"));
    }
    let block_number = prev
        .block_number
        .checked_add(1)
        .ok_or_else(|| invalid(prev, "chain has reached the last block number"))?;

    let output = executor.execute(&prev.image_hash, txs)?;
    let diff = match output.state_diff.diff_hash {
        Some(_) => output.state_diff,
        None => output.state_diff.with_hash(),
    };

    let block = StateBlock {
        block_hash: None,
        block_number,
        block_time,
        image_hash: prev.image_hash.clone(),
        txs_hash: txs_hash(txs),
        state_prev_diff_hash: diff.hash(),
        state_current_hash: output.new_image_hash,
    }
    .with_hash();

    if !verify_block(&block)? {
        return Err(invalid(&block, "executor produced an incomplete state"));
    }

    debug!(
        "built block {} for image {} with {} txs",
        block.block_number,
        block.image_hash,
        txs.len()
    );
    Ok((block, diff))
}

/// Returns `true` if `next` is a valid direct successor of `prev`.
///
/// Both blocks must verify on their own, belong to the same image, be
/// numbered consecutively and not go back in time.
pub fn verify_successor(prev: &StateBlock, next: &StateBlock) -> bool {
    if !matches!(verify_block(prev), Ok(true)) || !matches!(verify_block(next), Ok(true)) {
        return false;
    }
    if next.image_hash != prev.image_hash {
        warn!("block {} belongs to a different image", next.block_number);
        return false;
    }
    if prev.block_number.checked_add(1) != Some(next.block_number) {
        warn!(
            "block {} does not follow block {}",
            next.block_number, prev.block_number
        );
        return false;
    }
    if next.block_time < prev.block_time {
        warn!("block {} is older than its predecessor", next.block_number);
        return false;
    }
    true
}

/// Persists a block with its diff and transactions, then drops the
/// transactions from the mempool.
///
/// Every object is stored under its hash, and the encoded block is also
/// stored under its `"block"` CID, which is returned. The mempool is only
/// touched once every write succeeded.
pub fn commit_block(
    store: &dyn BlockStore,
    mempool: &dyn Mempool,
    block: &StateBlock,
    diff: &Diff,
    txs: &[Transaction],
) -> Result<Cid, ChainError> {
    if !verify_block(block)? {
        return Err(invalid(block, "block does not verify"));
    }
    if block.block_number > 0 && diff.hash() != block.state_prev_diff_hash {
        return Err(invalid(block, "diff does not match the block"));
    }
    if txs_hash(txs) != block.txs_hash {
        return Err(invalid(block, "transactions do not match the block"));
    }

    put_object(store, diff)?;
    let mut hashes = Vec::with_capacity(txs.len());
    for tx in txs {
        hashes.push(put_object(store, tx)?);
    }
    let block_hash = put_object(store, block)?;

    let cid = block.compute_cid(BLOCK_ATTRIBUTE)?;
    store.put(&cid.to_bytes(), block.serialize().as_slice())?;

    mempool.remove_txs(&hashes)?;

    info!(
        "committed block: number={} hash={} cid={} transactions={}",
        block.block_number,
        block_hash,
        cid,
        txs.len()
    );
    Ok(cid)
}
