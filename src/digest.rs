//! Content digests.
//!
//! A [`Digest`] is the identifier a [`crate::store::BlockStore`] hands back for
//! a block's canonical bytes. The default hash is SHA-256, rendered with a
//! one-byte multicodec-style prefix (`0x12`, the multihash code for
//! `sha2-256`) ahead of the 32 raw hash bytes, so `Digest::as_bytes()` is
//! always 33 bytes and self-describing.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;

const SHA2_256_MULTICODEC: u8 = 0x12;
pub const DIGEST_LEN: usize = 1 + 32;

/// A sentinel digest used as the root of an empty tree's header.
pub const EMPTY_SENTINEL: Digest = Digest([0u8; DIGEST_LEN]);

// serde's blanket array impls only go up to length 32, and `DIGEST_LEN` is
// 33, so `#[derive(Serialize, Deserialize)]` on a `[u8; DIGEST_LEN]` field
// doesn't exist. Serialize/deserialize as a byte slice instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let bytes = <Vec<u8>>::deserialize(deserializer)?;
        let array: [u8; DIGEST_LEN] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| D::Error::invalid_length(v.len(), &"33 bytes"))?;
        Ok(Digest(array))
    }
}

impl Digest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Digest(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn is_empty_sentinel(&self) -> bool {
        *self == EMPTY_SENTINEL
    }

    /// Hashes `bytes` with the default hash function and wraps the result
    /// with the sha2-256 multicodec prefix.
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let hash = hasher.finalize();

        let mut out = [0u8; DIGEST_LEN];
        out[0] = SHA2_256_MULTICODEC;
        out[1..].copy_from_slice(&hash);
        Digest(out)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", hex::encode(self.0))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
