//! Content identifiers for attribute-scoped views of a state block.
//!
//! A CID is a CIDv1 over DAG-CBOR content with a SHA3-256 multihash:
//!
//! ```text
//! 0x01 | 0x71 | 0x16 | 0x20 | 32-byte digest
//! ```
//!
//! The text form is multibase base16, i.e. `f` followed by the lowercase hex
//! of those 36 bytes.

use crate::types::hash::{HASH_LEN, Hash};
use std::fmt;
use std::str::FromStr;

/// CID version byte.
pub const CID_VERSION: u8 = 0x01;
/// Multicodec for DAG-CBOR content.
pub const DAG_CBOR_CODEC: u8 = 0x71;
/// Multihash code for SHA3-256.
pub const SHA3_256_CODE: u8 = 0x16;
/// Multibase prefix for lowercase base16.
pub const BASE16_PREFIX: char = 'f';

const PREFIX: [u8; 4] = [CID_VERSION, DAG_CBOR_CODEC, SHA3_256_CODE, HASH_LEN as u8];

/// Length of the binary CID.
pub const CID_LEN: usize = PREFIX.len() + HASH_LEN;

/// Errors raised when parsing a CID from text or bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CidError {
    #[error("missing multibase prefix 'f'")]
    MissingPrefix,
    #[error("invalid base16 body")]
    InvalidHex,
    #[error("unsupported cid header {0:02x?}")]
    UnsupportedHeader(Vec<u8>),
    #[error("expected 36 bytes, got {0}")]
    InvalidLength(usize),
}

/// Content identifier of a DAG-CBOR encoded value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid {
    digest: Hash,
}

impl Cid {
    /// Derives the CID of already encoded DAG-CBOR bytes.
    pub fn for_dag_cbor(encoded: &[u8]) -> Self {
        Self {
            digest: Hash::digest(encoded),
        }
    }

    /// Returns the SHA3-256 digest carried by this CID.
    pub fn digest(&self) -> Hash {
        self.digest
    }

    /// Returns the binary CID, usable directly as a block store key.
    pub fn to_bytes(&self) -> [u8; CID_LEN] {
        let mut out = [0u8; CID_LEN];
        out[..PREFIX.len()].copy_from_slice(&PREFIX);
        out[PREFIX.len()..].copy_from_slice(self.digest.as_slice());
        out
    }

    /// Parses the binary form produced by [`Cid::to_bytes`].
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CidError> {
        if raw.len() != CID_LEN {
            return Err(CidError::InvalidLength(raw.len()));
        }
        let (header, body) = raw.split_at(PREFIX.len());
        if header != PREFIX {
            return Err(CidError::UnsupportedHeader(header.to_vec()));
        }
        let digest = Hash::from_slice(body).ok_or(CidError::InvalidLength(raw.len()))?;
        Ok(Self { digest })
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", BASE16_PREFIX, hex::encode(self.to_bytes()))
    }
}

impl FromStr for Cid {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix(BASE16_PREFIX).ok_or(CidError::MissingPrefix)?;
        let raw = hex::decode(body).map_err(|_| CidError::InvalidHex)?;
        Self::from_bytes(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_form_has_multibase_and_cid_header() {
        let cid = Cid::for_dag_cbor(b"\xa0");
        let text = cid.to_string();
        assert!(text.starts_with("f01711620"));
        assert_eq!(text.len(), 1 + CID_LEN * 2);
    }

    #[test]
    fn parses_its_own_text_and_bytes() {
        let cid = Cid::for_dag_cbor(b"content");
        assert_eq!(cid.to_string().parse::<Cid>(), Ok(cid));
        assert_eq!(Cid::from_bytes(&cid.to_bytes()), Ok(cid));
    }

    #[test]
    fn rejects_foreign_headers() {
        let mut raw = Cid::for_dag_cbor(b"x").to_bytes();
        raw[1] = 0x55;
        assert!(matches!(
            Cid::from_bytes(&raw),
            Err(CidError::UnsupportedHeader(_))
        ));
        assert_eq!("b0171".parse::<Cid>(), Err(CidError::MissingPrefix));
        assert_eq!("f0171".parse::<Cid>(), Err(CidError::InvalidLength(2)));
    }
}
