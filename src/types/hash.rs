//! 32-byte SHA3-256 digest type.

use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink, read_bytes};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// SHA3-256 hash length in bytes.
pub const HASH_LEN: usize = 32;

/// Fixed-size 32-byte hash used for entity hashes, Merkle roots and CIDs.
///
/// Entities expose their hash as hex text; this type is the binary form
/// before it is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Ord, PartialOrd)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// Creates a zero-valued hash, the root of an empty Merkle tree.
    pub const fn zero() -> Hash {
        Hash([0u8; HASH_LEN])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Creates a new SHA3-256 hash builder for incremental hashing.
    pub fn sha3() -> HashBuilder {
        HashBuilder::new()
    }

    /// Hashes a single buffer in one call.
    pub fn digest(data: &[u8]) -> Hash {
        let mut h = Hash::sha3();
        h.update(data);
        h.finalize()
    }

    /// Returns the lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hash from 64 hex characters.
    ///
    /// Returns `None` for malformed text or a wrong length.
    pub fn from_hex(text: &str) -> Option<Hash> {
        let raw = hex::decode(text).ok()?;
        Self::from_slice(&raw)
    }

    /// Builds a hash from exactly [`HASH_LEN`] bytes.
    pub fn from_slice(raw: &[u8]) -> Option<Hash> {
        let arr: [u8; HASH_LEN] = raw.try_into().ok()?;
        Some(Hash(arr))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Encode for Hash {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&self.0);
    }
}

impl Decode for Hash {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let raw = read_bytes(input, HASH_LEN)?;
        Hash::from_slice(raw).ok_or(DecodeError::InvalidValue)
    }
}

/// Incremental SHA3-256 hash builder.
///
/// Implements [`EncodeSink`] so encodable types can be hashed directly
/// without intermediate byte buffers.
pub struct HashBuilder {
    hasher: Sha3_256,
}

impl HashBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Sha3_256::new(),
        }
    }

    /// Feeds data into the hash computation.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Consumes the builder and returns the final hash.
    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeSink for HashBuilder {
    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_known_sha3_vector() {
        // SHA3-256 of the empty string.
        assert_eq!(
            Hash::digest(b"").to_hex(),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn builder_chunks_match_single_digest() {
        let mut h = Hash::sha3();
        h.update(b"state");
        h.update(b"ledger");
        assert_eq!(h.finalize(), Hash::digest(b"stateledger"));
    }

    #[test]
    fn hex_round_trip_and_display_agree() {
        let hash = Hash::digest(b"x");
        assert_eq!(hash.to_string(), hash.to_hex());
        assert_eq!(Hash::from_hex(&hash.to_hex()), Some(hash));
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert_eq!(Hash::from_hex("abcd"), None);
        assert_eq!(Hash::from_hex("not hex"), None);
    }
}
