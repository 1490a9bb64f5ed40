//! Boundary to the image executor that runs transactions against a state.

use crate::core::diff::Diff;
use crate::core::transaction::Transaction;

/// Errors reported by an executor.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The executor has no image with the given hash.
    #[error("image not found: {0}")]
    ImageNotFound(String),
    /// The image ran but rejected the transactions.
    #[error("execution of image {image_hash} failed: {reason}")]
    Failed { image_hash: String, reason: String },
}

/// Result of applying a batch of transactions to an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// Hash of the state after execution.
    pub new_image_hash: String,
    /// Patch from the previous state to the new one.
    pub state_diff: Diff,
}

/// Deterministic runner for contract images.
///
/// Given the same image and transactions, implementations must return the
/// same output; blocks built from it are verified by replay.
pub trait Executor: Send + Sync {
    fn execute(
        &self,
        image_hash: &str,
        txs: &[Transaction],
    ) -> Result<ExecutionOutput, ExecutorError>;
}
