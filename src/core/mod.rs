//! Ledger entities and the rules linking them into a chain.
//!
//! - [`chain_object`]: shared hashing and serialization contract
//! - [`transaction`]: contract method invocations
//! - [`block`]: state blocks, content identifiers and block verification
//! - [`diff`]: state patches referenced by blocks
//! - [`executor`]: boundary to the image runtime
//! - [`state_chain`]: building, linking and committing successive blocks

pub mod block;
pub mod chain_object;
pub mod diff;
pub mod executor;
pub mod state_chain;
pub mod transaction;
