//! In-memory key/value pool with failure injection, for exercising the
//! remote mempool without a server.

use crate::mempool::kv::{KvConnection, KvError, KvPool};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Commands that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Ping,
    Exists,
    Get,
    MGet,
    Set,
    MSet,
    Del,
    SAdd,
    SRem,
    SMembers,
}

impl Op {
    fn name(self) -> &'static str {
        match self {
            Op::Ping => "PING",
            Op::Exists => "EXISTS",
            Op::Get => "GET",
            Op::MGet => "MGET",
            Op::Set => "SET",
            Op::MSet => "MSET",
            Op::Del => "DEL",
            Op::SAdd => "SADD",
            Op::SRem => "SREM",
            Op::SMembers => "SMEMBERS",
        }
    }
}

#[derive(Default)]
struct State {
    strings: HashMap<String, Vec<u8>>,
    sets: HashMap<String, BTreeSet<String>>,
    failing: HashSet<Op>,
    down: bool,
    round_trips: usize,
    leased: usize,
}

/// Shared fake store; clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryKv {
    state: Arc<Mutex<State>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes every later `op` fail until [`MemoryKv::heal`].
    pub fn fail(&self, op: Op) {
        self.lock().failing.insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.lock().failing.remove(&op);
    }

    /// Refuses new connections.
    pub fn set_down(&self, down: bool) {
        self.lock().down = down;
    }

    /// Commands executed so far.
    pub fn round_trips(&self) -> usize {
        self.lock().round_trips
    }

    /// Connections currently leased and not yet dropped.
    pub fn leased(&self) -> usize {
        self.lock().leased
    }

    pub fn raw_get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().strings.get(key).cloned()
    }

    pub fn raw_set(&self, key: &str, value: &[u8]) {
        self.lock().strings.insert(key.to_string(), value.to_vec());
    }

    pub fn raw_members(&self, set: &str) -> Vec<String> {
        self.lock()
            .sets
            .get(set)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn raw_sadd(&self, set: &str, member: &str) {
        self.lock()
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
    }
}

impl KvPool for MemoryKv {
    type Conn = MemoryKvConn;

    fn acquire(&self) -> Result<MemoryKvConn, KvError> {
        let mut state = self.lock();
        if state.down {
            return Err(KvError::Connection("connection refused".into()));
        }
        state.leased += 1;
        Ok(MemoryKvConn { kv: self.clone() })
    }
}

/// Connection leased from a [`MemoryKv`].
pub struct MemoryKvConn {
    kv: MemoryKv,
}

impl Drop for MemoryKvConn {
    fn drop(&mut self) {
        self.kv.lock().leased -= 1;
    }
}

impl MemoryKvConn {
    fn run<T>(&self, op: Op, f: impl FnOnce(&mut State) -> T) -> Result<T, KvError> {
        let mut state = self.kv.lock();
        state.round_trips += 1;
        if state.failing.contains(&op) {
            return Err(KvError::Command {
                command: op.name(),
                message: "injected failure".into(),
            });
        }
        Ok(f(&mut state))
    }
}

impl KvConnection for MemoryKvConn {
    fn ping(&mut self) -> Result<(), KvError> {
        self.run(Op::Ping, |_| ())
    }

    fn exists(&mut self, key: &str) -> Result<bool, KvError> {
        self.run(Op::Exists, |s| s.strings.contains_key(key))
    }

    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        self.run(Op::Get, |s| s.strings.get(key).cloned())
    }

    fn mget(&mut self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, KvError> {
        self.run(Op::MGet, |s| {
            keys.iter().map(|k| s.strings.get(k).cloned()).collect()
        })
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.run(Op::Set, |s| {
            s.strings.insert(key.to_string(), value.to_vec());
        })
    }

    fn mset(&mut self, entries: &[(String, Vec<u8>)]) -> Result<(), KvError> {
        self.run(Op::MSet, |s| {
            for (k, v) in entries {
                s.strings.insert(k.clone(), v.clone());
            }
        })
    }

    fn del(&mut self, keys: &[String]) -> Result<(), KvError> {
        self.run(Op::Del, |s| {
            for k in keys {
                s.strings.remove(k);
            }
        })
    }

    fn sadd(&mut self, set: &str, members: &[String]) -> Result<(), KvError> {
        self.run(Op::SAdd, |s| {
            s.sets
                .entry(set.to_string())
                .or_default()
                .extend(members.iter().cloned());
        })
    }

    fn srem(&mut self, set: &str, members: &[String]) -> Result<(), KvError> {
        self.run(Op::SRem, |s| {
            if let Some(existing) = s.sets.get_mut(set) {
                for m in members {
                    existing.remove(m);
                }
            }
        })
    }

    fn smembers(&mut self, set: &str) -> Result<Vec<String>, KvError> {
        self.run(Op::SMembers, |s| {
            s.sets
                .get(set)
                .map(|m| m.iter().cloned().collect())
                .unwrap_or_default()
        })
    }
}
