//! Shared contract of every hash-addressed ledger entity.

use crate::types::bytes::Bytes;
use crate::types::encoding::{Decode, Encode, EncodeSink, EncodingError, from_hex, to_hex};
use crate::types::hash::Hash;

/// A ledger entity with a canonical encoding and a content hash.
///
/// The binary form is the entity's [`Encode`] output, which includes the
/// optional precomputed hash. The content hash never covers that field:
/// it is the SHA3-256 of [`ChainObject::DOMAIN`] followed by
/// [`ChainObject::encode_content`], rendered as lowercase hex.
pub trait ChainObject: Encode + Decode {
    /// Domain separator mixed into the content hash.
    const DOMAIN: &'static [u8];

    /// Returns the precomputed hash, if one was set.
    fn precomputed_hash(&self) -> Option<&str>;

    /// Writes every hashed field in canonical order.
    fn encode_content<S: EncodeSink>(&self, out: &mut S);

    /// Computes the content hash, ignoring any precomputed value.
    fn compute_hash(&self) -> String {
        let mut h = Hash::sha3();
        h.update(Self::DOMAIN);
        self.encode_content(&mut h);
        h.finalize().to_hex()
    }

    /// Returns the precomputed hash when present, otherwise the computed one.
    fn hash(&self) -> String {
        match self.precomputed_hash() {
            Some(hash) => hash.to_string(),
            None => self.compute_hash(),
        }
    }

    fn serialize(&self) -> Bytes {
        self.to_bytes()
    }

    fn deserialize(data: &[u8]) -> Result<Self, EncodingError> {
        Ok(Self::from_bytes(data)?)
    }

    /// Hex text of the binary form, for text-only channels.
    fn serialize_text(&self) -> String {
        to_hex(self)
    }

    fn deserialize_text(text: &str) -> Result<Self, EncodingError> {
        from_hex(text)
    }
}
