//! Redis implementation of the key/value contract, pooled with r2d2.

use crate::info;
use crate::mempool::kv::{KvConnection, KvError, KvPool};
use crate::mempool::MempoolError;
use r2d2::{Pool, PooledConnection};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection options for the Redis mempool backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Server URL, e.g. `redis://127.0.0.1:6379/0`.
    pub url: String,
    /// Maximum number of pooled connections.
    pub pool_size: u32,
    /// Time to wait for a connection before failing, in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 8,
            connect_timeout_ms: 5_000,
        }
    }
}

/// r2d2 pool of Redis connections.
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool<redis::Client>,
}

impl RedisPool {
    /// Builds the pool described by `config`.
    ///
    /// Fails with `BackendUnavailable` when the URL is malformed or no
    /// connection can be established within the timeout.
    pub fn connect(config: &RedisConfig) -> Result<Self, MempoolError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| MempoolError::BackendUnavailable(format!("invalid redis url: {e}")))?;

        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .connection_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build(client)
            .map_err(|e| MempoolError::BackendUnavailable(e.to_string()))?;

        info!("Connected redis mempool pool to {}", config.url);
        Ok(Self { pool })
    }
}

impl KvPool for RedisPool {
    type Conn = RedisConnection;

    fn acquire(&self) -> Result<RedisConnection, KvError> {
        self.pool
            .get()
            .map(RedisConnection)
            .map_err(|e| KvError::Connection(e.to_string()))
    }
}

/// A Redis connection leased from a [`RedisPool`].
pub struct RedisConnection(PooledConnection<redis::Client>);

fn command_error(command: &'static str) -> impl FnOnce(redis::RedisError) -> KvError {
    move |e| KvError::Command {
        command,
        message: e.to_string(),
    }
}

impl KvConnection for RedisConnection {
    fn ping(&mut self) -> Result<(), KvError> {
        redis::cmd("PING")
            .query::<String>(&mut *self.0)
            .map(|_| ())
            .map_err(command_error("PING"))
    }

    fn exists(&mut self, key: &str) -> Result<bool, KvError> {
        redis::cmd("EXISTS")
            .arg(key)
            .query::<bool>(&mut *self.0)
            .map_err(command_error("EXISTS"))
    }

    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        redis::cmd("GET")
            .arg(key)
            .query(&mut *self.0)
            .map_err(command_error("GET"))
    }

    fn mget(&mut self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, KvError> {
        redis::cmd("MGET")
            .arg(keys)
            .query(&mut *self.0)
            .map_err(command_error("MGET"))
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), KvError> {
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query(&mut *self.0)
            .map_err(command_error("SET"))
    }

    fn mset(&mut self, entries: &[(String, Vec<u8>)]) -> Result<(), KvError> {
        let mut cmd = redis::cmd("MSET");
        for (key, value) in entries {
            cmd.arg(key).arg(value.as_slice());
        }
        cmd.query(&mut *self.0).map_err(command_error("MSET"))
    }

    fn del(&mut self, keys: &[String]) -> Result<(), KvError> {
        redis::cmd("DEL")
            .arg(keys)
            .query::<i64>(&mut *self.0)
            .map(|_| ())
            .map_err(command_error("DEL"))
    }

    fn sadd(&mut self, set: &str, members: &[String]) -> Result<(), KvError> {
        redis::cmd("SADD")
            .arg(set)
            .arg(members)
            .query::<i64>(&mut *self.0)
            .map(|_| ())
            .map_err(command_error("SADD"))
    }

    fn srem(&mut self, set: &str, members: &[String]) -> Result<(), KvError> {
        redis::cmd("SREM")
            .arg(set)
            .arg(members)
            .query::<i64>(&mut *self.0)
            .map(|_| ())
            .map_err(command_error("SREM"))
    }

    fn smembers(&mut self, set: &str) -> Result<Vec<String>, KvError> {
        redis::cmd("SMEMBERS")
            .arg(set)
            .query(&mut *self.0)
            .map_err(command_error("SMEMBERS"))
    }
}
