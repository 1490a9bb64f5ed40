//! Key/value connection contract used by the remote mempool.
//!
//! Each method is one round trip to the remote service. Connections are
//! leased from a [`KvPool`] for the span of a single mempool operation and
//! returned to the pool when dropped.

use crate::mempool::MempoolError;

/// Errors reported by a key/value backend.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// No connection could be obtained.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The server rejected or failed a command.
    #[error("command {command} failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
}

impl From<KvError> for MempoolError {
    fn from(e: KvError) -> Self {
        MempoolError::BackendUnavailable(e.to_string())
    }
}

/// One leased connection to a key/value store with string and set commands.
pub trait KvConnection {
    /// Liveness probe.
    fn ping(&mut self) -> Result<(), KvError>;

    fn exists(&mut self, key: &str) -> Result<bool, KvError>;

    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Fetches many keys at once; the result lines up with `keys`.
    fn mget(&mut self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, KvError>;

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Writes many keys in one atomic command.
    fn mset(&mut self, entries: &[(String, Vec<u8>)]) -> Result<(), KvError>;

    /// Deletes keys; missing keys are ignored.
    fn del(&mut self, keys: &[String]) -> Result<(), KvError>;

    fn sadd(&mut self, set: &str, members: &[String]) -> Result<(), KvError>;

    fn srem(&mut self, set: &str, members: &[String]) -> Result<(), KvError>;

    fn smembers(&mut self, set: &str) -> Result<Vec<String>, KvError>;
}

/// Pool handing out [`KvConnection`]s.
///
/// The returned connection goes back to the pool on drop, on every exit path.
pub trait KvPool: Send + Sync {
    type Conn: KvConnection;

    fn acquire(&self) -> Result<Self::Conn, KvError>;
}
