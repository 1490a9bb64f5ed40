//! Spreading staged transactions between nodes over gossip.

use crate::core::chain_object::ChainObject;
use crate::core::transaction::{Transaction, verify_transaction};
use crate::mempool::{Mempool, MempoolError};
use crate::network::gossip::{Gossip, GossipError};
use crate::types::bytes::Bytes;
use crate::types::encoding::EncodingError;
use crate::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Topic carrying serialized transactions.
pub const TOPIC_TRANSACTIONS: &str = "stateledger/transactions";

#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    /// The transaction carries a hash that does not match its content.
    #[error("transaction hash {0} does not match its content")]
    HashMismatch(String),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Mempool(#[from] MempoolError),
    #[error(transparent)]
    Gossip(#[from] GossipError),
}

fn check_hash(tx: &Transaction) -> Result<(), AnnounceError> {
    match tx.tx_hash.as_deref() {
        Some(hash) if !verify_transaction(tx) => Err(AnnounceError::HashMismatch(hash.to_string())),
        _ => Ok(()),
    }
}

/// Stages `tx` locally and publishes it to peers.
///
/// The transaction is published only after it was staged, so a node never
/// announces something it does not hold.
pub async fn announce_tx(
    mempool: &dyn Mempool,
    gossip: &dyn Gossip,
    tx: &Transaction,
) -> Result<(), AnnounceError> {
    check_hash(tx)?;
    mempool.add_tx(tx)?;
    gossip.publish(TOPIC_TRANSACTIONS, tx.serialize()).await?;
    debug!("announced tx {}", tx.hash());
    Ok(())
}

/// Decodes a gossiped transaction and stages it unless already present.
///
/// Returns `true` if the transaction was newly staged.
pub fn ingest_tx(mempool: &dyn Mempool, payload: &[u8]) -> Result<bool, AnnounceError> {
    let tx = Transaction::deserialize(payload)?;
    check_hash(&tx)?;
    if mempool.has_tx(&tx.hash())? {
        return Ok(false);
    }
    mempool.add_tx(&tx)?;
    Ok(true)
}

/// Spawns a task feeding every message of `rx` into `mempool`.
///
/// Malformed messages are logged and skipped. The task ends when the topic
/// is closed.
pub fn spawn_ingest(mempool: Arc<dyn Mempool>, mut rx: Receiver<Bytes>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(payload) => match ingest_tx(mempool.as_ref(), &payload) {
                    Ok(true) => debug!("ingested gossiped tx"),
                    Ok(false) => {}
                    Err(e) => warn!("dropping gossiped tx: {e}"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("tx ingest lagging, skipped {} messages", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("tx ingest stopped");
    })
}
