//! In-process gossip bus for tests and single-node deployments.

use crate::debug;
use crate::network::gossip::{Gossip, GossipError};
use crate::types::bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Messages buffered per topic before slow subscribers start lagging.
const TOPIC_CAPACITY: usize = 1024;

/// Gossip bus routing messages through one broadcast channel per topic.
///
/// Topics are created lazily on first use.
#[derive(Default)]
pub struct LocalGossip {
    topics: DashMap<String, Sender<Bytes>>,
}

impl LocalGossip {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: &str) -> Sender<Bytes> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }
}

#[async_trait::async_trait]
impl Gossip for LocalGossip {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), GossipError> {
        if topic.is_empty() {
            return Err(GossipError::InvalidTopic(topic.to_string()));
        }
        // A send error only means nobody is listening yet.
        match self.sender(topic).send(payload) {
            Ok(n) => debug!("gossip: delivered on {} to {} subscribers", topic, n),
            Err(_) => debug!("gossip: no subscribers on {}", topic),
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Receiver<Bytes> {
        self.sender(topic).subscribe()
    }
}
