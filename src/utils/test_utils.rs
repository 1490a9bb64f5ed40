//! Fixtures shared by unit tests across the crate.

use crate::core::block::StateBlock;
use crate::core::chain_object::ChainObject;
use crate::core::diff::Diff;
use crate::core::executor::{ExecutionOutput, Executor, ExecutorError};
use crate::core::transaction::Transaction;
use crate::types::hash::Hash;

/// Transaction whose content (and therefore hash) is unique per `tag`.
pub fn sample_tx(tag: &str) -> Transaction {
    Transaction::new("set", format!("key={tag}")).with_hash()
}

pub fn hashes_of(txs: &[Transaction]) -> Vec<String> {
    txs.iter().map(|tx| tx.hash()).collect()
}

/// Hashed genesis block of an image named `image`.
pub fn sample_genesis(image: &str) -> StateBlock {
    let image_hash = Hash::digest(image.as_bytes()).to_hex();
    let state_hash = Hash::digest(format!("{image}/state-0").as_bytes()).to_hex();
    StateBlock::genesis(image_hash, state_hash, 1_700_000_000).with_hash()
}

/// Executor whose output depends only on its inputs.
///
/// The new state hash folds the image hash with every transaction hash, and
/// the diff lists the applied methods.
pub struct FixedExecutor;

impl Executor for FixedExecutor {
    fn execute(
        &self,
        image_hash: &str,
        txs: &[Transaction],
    ) -> Result<ExecutionOutput, ExecutorError> {
        let mut h = Hash::sha3();
        h.update(image_hash.as_bytes());
        for tx in txs {
            h.update(tx.hash().as_bytes());
        }
        let methods: Vec<&str> = txs.iter().map(|tx| tx.method.as_str()).collect();
        Ok(ExecutionOutput {
            new_image_hash: h.finalize().to_hex(),
            state_diff: Diff::new(methods.join(",")).with_hash(),
        })
    }
}

/// Executor that knows no images.
pub struct MissingImageExecutor;

impl Executor for MissingImageExecutor {
    fn execute(&self, image_hash: &str, _: &[Transaction]) -> Result<ExecutionOutput, ExecutorError> {
        Err(ExecutorError::ImageNotFound(image_hash.to_string()))
    }
}
