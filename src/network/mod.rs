//! Peer-to-peer propagation of ledger objects.
//!
//! - [`gossip`]: topic-based publish/subscribe trait and error types
//! - [`local_gossip`]: in-process gossip bus over broadcast channels
//! - [`announce`]: publishing staged transactions and ingesting them from peers

pub mod announce;
pub mod gossip;
pub mod local_gossip;
