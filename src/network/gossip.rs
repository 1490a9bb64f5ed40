//! Topic-based publish/subscribe abstraction used to spread ledger objects.

use crate::types::bytes::Bytes;
use tokio::sync::broadcast::Receiver;

/// Errors that can occur while publishing on a gossip bus.
#[derive(Debug, thiserror::Error)]
pub enum GossipError {
    /// Topic names must be non-empty.
    #[error("invalid topic: {0:?}")]
    InvalidTopic(String),
}

/// Async gossip bus delivering opaque payloads to every subscriber of a topic.
///
/// Delivery is best effort: a payload published while a topic has no
/// subscribers is dropped, and slow subscribers may miss messages.
#[async_trait::async_trait]
pub trait Gossip: Send + Sync {
    /// Publishes `payload` on `topic`.
    ///
    /// # Errors
    /// Returns `GossipError::InvalidTopic` if `topic` is empty.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), GossipError>;

    /// Subscribes to `topic`, receiving every payload published after this call.
    fn subscribe(&self, topic: &str) -> Receiver<Bytes>;
}
