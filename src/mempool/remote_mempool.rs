//! Mempool over a remote key/value store.
//!
//! Each operation leases one pooled connection and issues its commands in
//! sequence. The store offers no multi-key transaction here, so the
//! two-step writes are paired with compensating actions:
//!
//! - add: write the value, then insert into the index. If the insert fails
//!   the value write is undone (the key is deleted, or its previous value
//!   restored).
//! - remove: delete the values, then remove from the index. If the removal
//!   fails the deleted values are written back.
//!
//! If the compensating write fails as well the error is `Consistency`,
//! since the primary mapping and the index may now disagree.

use crate::core::chain_object::ChainObject;
use crate::core::transaction::Transaction;
use crate::mempool::kv::{KvConnection, KvError, KvPool};
use crate::mempool::{INDEX_SET, Mempool, MempoolError, staging_hash, tx_key};
use crate::{debug, error, info, warn};

/// Mempool backed by a pooled key/value store.
pub struct RemoteMempool<P: KvPool> {
    pool: P,
}

impl<P: KvPool> RemoteMempool<P> {
    /// Wraps `pool` after a liveness probe.
    ///
    /// Fails with `BackendUnavailable` if no connection can be leased or the
    /// store does not answer a ping.
    pub fn new(pool: P) -> Result<Self, MempoolError> {
        {
            let mut conn = pool.acquire()?;
            conn.ping()?;
        }
        info!("Remote mempool is reachable");
        Ok(Self { pool })
    }

    fn decode(raw: &[u8]) -> Result<Transaction, MempoolError> {
        Ok(Transaction::deserialize(raw)?)
    }
}

fn compensation_failed(step: &str, cause: &KvError, undo: &KvError) -> MempoolError {
    error!("mempool: {} failed ({}) and could not be undone ({})", step, cause, undo);
    MempoolError::Consistency(format!(
        "{step} failed ({cause}) and compensation failed ({undo})"
    ))
}

impl<P: KvPool> Mempool for RemoteMempool<P> {
    fn has_tx(&self, hash: &str) -> Result<bool, MempoolError> {
        let mut conn = self.pool.acquire()?;
        Ok(conn.exists(&tx_key(hash))?)
    }

    fn get_tx(&self, hash: &str) -> Result<Option<Transaction>, MempoolError> {
        let raw = {
            let mut conn = self.pool.acquire()?;
            conn.get(&tx_key(hash))?
        };
        raw.as_deref().map(Self::decode).transpose()
    }

    fn get_txs(&self, hashes: &[String]) -> Result<Vec<Transaction>, MempoolError> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = hashes.iter().map(|h| tx_key(h)).collect();
        let values = {
            let mut conn = self.pool.acquire()?;
            conn.mget(&keys)?
        };
        values.iter().flatten().map(|raw| Self::decode(raw)).collect()
    }

    fn add_tx(&self, tx: &Transaction) -> Result<(), MempoolError> {
        let hash = staging_hash(tx)?;
        let key = tx_key(&hash);
        let data = tx.serialize();

        let mut conn = self.pool.acquire()?;
        let previous = conn.get(&key)?;
        conn.set(&key, &data)?;

        if let Err(cause) = conn.sadd(INDEX_SET, std::slice::from_ref(&hash)) {
            warn!("mempool: index insert for {} failed, undoing value write", hash);
            let undo = match &previous {
                Some(old) => conn.set(&key, old),
                None => conn.del(std::slice::from_ref(&key)),
            };
            return match undo {
                Ok(()) => Err(cause.into()),
                Err(undo) => Err(compensation_failed("index insert", &cause, &undo)),
            };
        }

        debug!("mempool: staged tx {}", hash);
        Ok(())
    }

    fn remove_txs(&self, hashes: &[String]) -> Result<(), MempoolError> {
        if hashes.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = hashes.iter().map(|h| tx_key(h)).collect();

        let mut conn = self.pool.acquire()?;
        let previous: Vec<(String, Vec<u8>)> = keys
            .iter()
            .cloned()
            .zip(conn.mget(&keys)?)
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();

        conn.del(&keys)?;

        if let Err(cause) = conn.srem(INDEX_SET, hashes) {
            warn!("mempool: index removal failed, restoring {} values", previous.len());
            if previous.is_empty() {
                return Err(cause.into());
            }
            return match conn.mset(&previous) {
                Ok(()) => Err(cause.into()),
                Err(undo) => Err(compensation_failed("index removal", &cause, &undo)),
            };
        }

        debug!("mempool: removed {} txs", hashes.len());
        Ok(())
    }

    fn gather_transactions(&self) -> Result<Vec<Transaction>, MempoolError> {
        let mut conn = self.pool.acquire()?;
        let members = conn.smembers(INDEX_SET)?;
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = members.iter().map(|h| tx_key(h)).collect();
        let values = conn.mget(&keys)?;
        drop(conn);

        members
            .iter()
            .zip(values)
            .map(|(hash, value)| match value {
                Some(raw) => Self::decode(&raw),
                None => Err(MempoolError::Consistency(format!(
                    "indexed tx {hash} has no stored value"
                ))),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mempool::test_kv::{MemoryKv, Op};
    use crate::utils::test_utils::{hashes_of, sample_tx};
    use std::collections::HashSet;

    fn pool() -> (RemoteMempool<MemoryKv>, MemoryKv) {
        let kv = MemoryKv::new();
        let mempool = RemoteMempool::new(kv.clone()).expect("fake kv answers ping");
        (mempool, kv)
    }

    // ==================== Construction Tests ====================

    #[test]
    fn construction_fails_fast_when_unreachable() {
        let kv = MemoryKv::new();
        kv.set_down(true);
        assert!(matches!(
            RemoteMempool::new(kv),
            Err(MempoolError::BackendUnavailable(_))
        ));

        let kv = MemoryKv::new();
        kv.fail(Op::Ping);
        assert!(matches!(
            RemoteMempool::new(kv.clone()),
            Err(MempoolError::BackendUnavailable(_))
        ));
        assert_eq!(kv.leased(), 0);
    }

    // ==================== Layout Tests ====================

    #[test]
    fn add_writes_namespaced_value_and_raw_index_member() {
        let (pool, kv) = pool();
        let tx = sample_tx("a1");
        pool.add_tx(&tx).unwrap();

        let hash = tx.hash();
        assert_eq!(kv.raw_get(&tx_key(&hash)), Some(tx.serialize().to_vec()));
        assert_eq!(kv.raw_members(INDEX_SET), vec![hash.clone()]);
        assert!(pool.has_tx(&hash).unwrap());
        assert_eq!(pool.get_tx(&hash).unwrap(), Some(tx));
    }

    #[test]
    fn gather_after_partial_remove() {
        let (pool, _kv) = pool();
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
    fn remove_is_idempotent_and_clears_both_views() {
        let (pool, kv) = pool();
        let tx = sample_tx("a1");
        pool.add_tx(&tx).unwrap();

        pool.remove_tx(&tx.hash()).unwrap();
        pool.remove_tx(&tx.hash()).unwrap();

        assert_eq!(kv.raw_get(&tx_key(&tx.hash())), None);
        assert!(kv.raw_members(INDEX_SET).is_empty());
    }

    #[test]
    fn get_txs_matches_individual_lookups() {
        let (pool, _kv) = pool();
        let txs: Vec<_> = ["a", "b", "c"].into_iter().map(sample_tx).collect();
        for tx in &txs {
            pool.add_tx(tx).unwrap();
        }

        let mut wanted = hashes_of(&txs);
        wanted.insert(1, "absent".into());
        let batch = pool.get_txs(&wanted).unwrap();
        let single: Vec<_> = wanted
            .iter()
            .filter_map(|h| pool.get_tx(h).unwrap())
            .collect();
        assert_eq!(batch, single);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn empty_inputs_skip_the_round_trip() {
        let (pool, kv) = pool();
        let before = kv.round_trips();
        assert!(pool.get_txs(&[]).unwrap().is_empty());
        pool.remove_txs(&[]).unwrap();
        assert_eq!(kv.round_trips(), before);
    }

    #[test]
    fn connections_are_released_on_every_path() {
        let (pool, kv) = pool();
        pool.add_tx(&sample_tx("a1")).unwrap();
        kv.fail(Op::SMembers);
        assert!(pool.gather_transactions().is_err());
        kv.fail(Op::SAdd);
        assert!(pool.add_tx(&sample_tx("a2")).is_err());
        assert_eq!(kv.leased(), 0);
    }

    // ==================== Consistency Tests ====================

    #[test]
    fn gather_surfaces_index_member_without_value() {
        let (pool, kv) = pool();
        pool.add_tx(&sample_tx("a1")).unwrap();
        kv.raw_sadd(INDEX_SET, "orphan");

        assert!(matches!(
            pool.gather_transactions(),
            Err(MempoolError::Consistency(_))
        ));
    }

    #[test]
    fn corrupt_value_is_an_encoding_error() {
        let (pool, kv) = pool();
        kv.raw_set(&tx_key("bad"), &[0xff, 0x00]);
        assert!(matches!(pool.get_tx("bad"), Err(MempoolError::Encoding(_))));
    }

    // ==================== Compensation Tests ====================

    #[test]
    fn failed_index_insert_removes_value_write() {
        let (pool, kv) = pool();
        let tx = sample_tx("a1");
        kv.fail(Op::SAdd);

        assert!(matches!(
            pool.add_tx(&tx),
            Err(MempoolError::BackendUnavailable(_))
        ));
        assert_eq!(kv.raw_get(&tx_key(&tx.hash())), None);
        assert!(kv.raw_members(INDEX_SET).is_empty());
    }

    #[test]
    fn failed_index_insert_restores_previous_value() {
        let (pool, kv) = pool();
        let tx = sample_tx("a1");
        pool.add_tx(&tx).unwrap();

        kv.fail(Op::SAdd);
        assert!(pool.add_tx(&tx).is_err());
        kv.heal(Op::SAdd);

        assert_eq!(kv.raw_get(&tx_key(&tx.hash())), Some(tx.serialize().to_vec()));
        assert_eq!(pool.gather_transactions().unwrap(), vec![tx]);
    }

    #[test]
    fn failed_add_compensation_is_a_consistency_error() {
        let (pool, kv) = pool();
        kv.fail(Op::SAdd);
        kv.fail(Op::Del);
        assert!(matches!(
            pool.add_tx(&sample_tx("a1")),
            Err(MempoolError::Consistency(_))
        ));
    }

    #[test]
    fn failed_index_removal_restores_values() {
        let (pool, kv) = pool();
        let (a1, a2) = (sample_tx("a1"), sample_tx("a2"));
        pool.add_tx(&a1).unwrap();
        pool.add_tx(&a2).unwrap();

        kv.fail(Op::SRem);
        assert!(matches!(
            pool.remove_txs(&hashes_of(&[a1.clone(), a2.clone()])),
            Err(MempoolError::BackendUnavailable(_))
        ));
        kv.heal(Op::SRem);

        let gathered: HashSet<String> = pool
            .gather_transactions()
            .unwrap()
            .iter()
            .map(|tx| tx.hash())
            .collect();
        assert_eq!(gathered, HashSet::from([a1.hash(), a2.hash()]));
    }

    #[test]
    fn failed_remove_compensation_is_a_consistency_error() {
        let (pool, kv) = pool();
        let tx = sample_tx("a1");
        pool.add_tx(&tx).unwrap();

        kv.fail(Op::SRem);
        kv.fail(Op::MSet);
        assert!(matches!(
            pool.remove_tx(&tx.hash()),
            Err(MempoolError::Consistency(_))
        ));
    }

    #[test]
    fn failed_delete_leaves_everything_in_place() {
        let (pool, kv) = pool();
        let tx = sample_tx("a1");
        pool.add_tx(&tx).unwrap();

        kv.fail(Op::Del);
        assert!(pool.remove_tx(&tx.hash()).is_err());
        kv.heal(Op::Del);

        assert!(pool.has_tx(&tx.hash()).unwrap());
        assert_eq!(kv.raw_members(INDEX_SET), vec![tx.hash()]);
    }
}
