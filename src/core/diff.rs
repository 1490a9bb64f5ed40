//! State diffs produced by the executor and referenced from the next block.

use crate::core::chain_object::ChainObject;
use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};

/// Patch turning one image state into the next.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diff {
    /// Diff hash; authoritative once set.
    pub diff_hash: Option<String>,
    /// Patch contents, opaque to the ledger.
    pub data: String,
}

impl Diff {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            diff_hash: None,
            data: data.into(),
        }
    }

    /// Returns the diff with `diff_hash` filled from its content.
    pub fn with_hash(mut self) -> Self {
        self.diff_hash = Some(self.compute_hash());
        self
    }
}

impl ChainObject for Diff {
    const DOMAIN: &'static [u8] = b"STATELEDGER_DIFF";

    fn precomputed_hash(&self) -> Option<&str> {
        self.diff_hash.as_deref()
    }

    fn encode_content<S: EncodeSink>(&self, out: &mut S) {
        self.data.encode(out);
    }
}

impl Encode for Diff {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.diff_hash.encode(out);
        self.encode_content(out);
    }
}

impl Decode for Diff {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            diff_hash: Option::<String>::decode(input)?,
            data: String::decode(input)?,
        })
    }
}
