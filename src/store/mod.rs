//! The block store capability set (§4.1, §6) and its adapters.
//!
//! The tree core depends on nothing but the [`BlockStore`] trait, so an
//! embedder can swap the in-memory [`memory::MemoryStore`] shipped here for a
//! durable, disk-backed implementation without touching the builder, cursor,
//! or mutator.

pub mod cache;
pub mod memory;

use crate::digest::Digest;
use crate::error::Result;

/// Put/get of opaque byte blocks keyed by content digest.
///
/// Implementations MUST be idempotent: `put_block` on bytes already present
/// is a no-op that still returns the same digest. `get_block` on an absent
/// digest fails with [`crate::error::ProllyError::NotFound`].
pub trait BlockStore: Send + Sync {
    fn put_block(&self, bytes: &[u8]) -> Result<Digest>;
    fn get_block(&self, digest: &Digest) -> Result<Vec<u8>>;
    fn has_block(&self, digest: &Digest) -> Result<bool>;
}

pub use cache::CachingStore;
pub use memory::MemoryStore;
