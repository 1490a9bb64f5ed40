//! In-process mempool guarded by a single mutex.
//!
//! The map's key set doubles as the membership index, so the two can never
//! disagree. Encoding and decoding happen outside the lock; it is held only
//! for the map access itself.

use crate::core::chain_object::ChainObject;
use crate::core::transaction::Transaction;
use crate::debug;
use crate::mempool::{Mempool, MempoolError, staging_hash};
use crate::types::bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Mempool holding serialized transactions in process memory.
#[derive(Default)]
pub struct LocalMempool {
    txs: Mutex<HashMap<String, Bytes>>,
}

impl LocalMempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged transactions.
    pub fn len(&self) -> usize {
        self.lock_inner().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_inner().is_empty()
    }

    fn lock_inner(&self) -> MutexGuard<'_, HashMap<String, Bytes>> {
        // Every mutation is a single map call, so a poisoned map is still consistent.
        self.txs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn decode_all(raw: Vec<Bytes>) -> Result<Vec<Transaction>, MempoolError> {
    raw.iter()
        .map(|bytes| Transaction::deserialize(bytes).map_err(MempoolError::from))
        .collect()
}

impl Mempool for LocalMempool {
    fn has_tx(&self, hash: &str) -> Result<bool, MempoolError> {
        Ok(self.lock_inner().contains_key(hash))
    }

    fn get_tx(&self, hash: &str) -> Result<Option<Transaction>, MempoolError> {
        let raw = self.lock_inner().get(hash).cloned();
        match raw {
            Some(bytes) => Ok(Some(Transaction::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_txs(&self, hashes: &[String]) -> Result<Vec<Transaction>, MempoolError> {
        let raw: Vec<Bytes> = {
            let txs = self.lock_inner();
            hashes.iter().filter_map(|h| txs.get(h).cloned()).collect()
        };
        decode_all(raw)
    }

    fn add_tx(&self, tx: &Transaction) -> Result<(), MempoolError> {
        let hash = staging_hash(tx)?;
        let bytes = tx.serialize();
        debug!("mempool: staging tx {}", hash);
        self.lock_inner().insert(hash, bytes);
        Ok(())
    }

    fn remove_txs(&self, hashes: &[String]) -> Result<(), MempoolError> {
        if hashes.is_empty() {
            return Ok(());
        }
        let mut txs = self.lock_inner();
        for hash in hashes {
            txs.remove(hash);
        }
        Ok(())
    }

    fn gather_transactions(&self) -> Result<Vec<Transaction>, MempoolError> {
        let raw: Vec<Bytes> = self.lock_inner().values().cloned().collect();
        decode_all(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{hashes_of, sample_tx};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn pool() -> LocalMempool {
        LocalMempool::new()
    }

    // ==================== Add / Get Tests ====================

    #[test]
    fn added_transaction_is_retrievable() {
        let pool = pool();
        let tx = sample_tx("a1");
        pool.add_tx(&tx).unwrap();

        assert!(pool.has_tx(&tx.hash()).unwrap());
        assert_eq!(pool.get_tx(&tx.hash()).unwrap(), Some(tx));
    }

    #[test]
    fn absent_hash_is_not_an_error() {
        let pool = pool();
        assert!(!pool.has_tx("missing").unwrap());
        assert_eq!(pool.get_tx("missing").unwrap(), None);
        assert!(pool.get_txs(&["missing".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn empty_hash_is_invalid_argument() {
        let pool = pool();
        let mut tx = sample_tx("a1");
        tx.tx_hash = Some(String::new());
        assert!(matches!(
            pool.add_tx(&tx),
            Err(MempoolError::InvalidArgument(_))
        ));
        assert!(pool.is_empty());
    }

    #[test]
    fn re_adding_replaces_rather_than_duplicates() {
        let pool = pool();
        let tx = sample_tx("a1");
        pool.add_tx(&tx).unwrap();
        pool.add_tx(&tx).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn get_txs_matches_individual_lookups() {
        let pool = pool();
        let txs: Vec<_> = ["a", "b", "c"].into_iter().map(sample_tx).collect();
        for tx in &txs {
            pool.add_tx(tx).unwrap();
        }

        let mut wanted = hashes_of(&txs[..2]);
        wanted.push("absent".into());
        let batch = pool.get_txs(&wanted).unwrap();

        let single: Vec<_> = wanted
            .iter()
            .filter_map(|h| pool.get_tx(h).unwrap())
            .collect();
        assert_eq!(batch, single);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn large_transaction_is_gathered() {
        let pool = pool();
        let big = Transaction::new("upload", vec![1u8; 65 * 1024 * 1024]).with_hash();
        let small = sample_tx("a1");
        pool.add_tx(&big).unwrap();
        pool.add_tx(&small).unwrap();

        let gathered: HashSet<String> = pool
            .gather_transactions()
            .unwrap()
            .iter()
            .map(|tx| tx.hash())
            .collect();
        assert_eq!(gathered, HashSet::from([big.hash(), small.hash()]));
    }

    // ==================== Remove / Gather Tests ====================

    #[test]
    fn gather_after_partial_remove() {
        let pool = pool();
        let (a1, a2, a3) = (sample_tx("a1"), sample_tx("a2"), sample_tx("a3"));
        for tx in [&a1, &a2, &a3] {
            pool.add_tx(tx).unwrap();
        }

        pool.remove_txs(&[a2.hash()]).unwrap();

        let gathered: HashSet<String> = pool
            .gather_transactions()
            .unwrap()
            .iter()
            .map(|tx| tx.hash())
            .collect();
        assert_eq!(gathered, HashSet::from([a1.hash(), a3.hash()]));
    }

    #[test]
    fn remove_is_idempotent() {
        let pool = pool();
        let tx = sample_tx("a1");
        pool.add_tx(&tx).unwrap();

        pool.remove_tx(&tx.hash()).unwrap();
        pool.remove_tx(&tx.hash()).unwrap();
        pool.remove_txs(&[]).unwrap();

        assert!(!pool.has_tx(&tx.hash()).unwrap());
        assert!(pool.gather_transactions().unwrap().is_empty());
    }

    // ==================== Concurrency Tests ====================

    #[test]
    fn concurrent_producers_and_consumer() {
        let pool = Arc::new(pool());
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        pool.add_tx(&sample_tx(&format!("w{worker}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let all = pool.gather_transactions().unwrap();
        assert_eq!(all.len(), 200);

        pool.remove_txs(&hashes_of(&all)).unwrap();
        assert!(pool.is_empty());
    }
}
