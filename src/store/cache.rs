//! Read-through LRU cache in front of a [`BlockStore`] (§4.1).
//!
//! The cache stores *decoded* [`Node`] objects keyed by digest, so a cache
//! hit skips both the store round-trip and the codec. Cache insertion on
//! write is advisory per §4.1: a write whose cache insertion loses a race
//! under contention is still durable in the underlying store, so correctness
//! never depends on the cache being populated.

use super::BlockStore;
use crate::codec;
use crate::config::CacheConfig;
use crate::digest::Digest;
use crate::error::Result;
use crate::node::Node;
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hit/miss counters for the node cache, mirroring the stats the teacher's
/// multi-level cache manager tracks per cache tier.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let misses = self.misses() as f64;
        if hits + misses == 0.0 {
            0.0
        } else {
            hits / (hits + misses)
        }
    }
}

/// Wraps any [`BlockStore`] with a bounded, decoded-node LRU.
pub struct CachingStore<S> {
    inner: S,
    nodes: RwLock<LruCache<Digest, Node>>,
    config: CacheConfig,
    stats: CacheStats,
}

impl<S: BlockStore> CachingStore<S> {
    pub fn new(inner: S, config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.node_cache_size.max(1)).unwrap();
        Self {
            inner,
            nodes: RwLock::new(LruCache::new(capacity)),
            config,
            stats: CacheStats::default(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn record(&self, hit: bool) {
        if !self.config.enable_stats {
            return;
        }
        if hit {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Encodes and persists `node`, populating the cache with the decoded
    /// form so a subsequent read of the same digest skips both the store and
    /// the codec.
    pub fn put_node(&self, node: &Node) -> Result<Digest> {
        let bytes = codec::encode_node(node)?;
        let digest = self.inner.put_block(&bytes)?;
        log::trace!("put_node: wrote {} bytes under {digest}", bytes.len());
        self.nodes.write().put(digest, node.clone());
        Ok(digest)
    }

    /// Reads and decodes the node at `digest`, serving from cache when
    /// possible.
    pub fn get_node(&self, digest: &Digest) -> Result<Node> {
        if let Some(node) = self.nodes.write().get(digest).cloned() {
            self.record(true);
            log::trace!("get_node: cache hit for {digest}");
            return Ok(node);
        }
        self.record(false);
        let bytes = self.inner.get_block(digest).map_err(|e| {
            log::warn!("get_node: store miss for {digest}: {e}");
            e
        })?;
        let node = codec::decode_node(&bytes)?;
        self.nodes.write().put(*digest, node.clone());
        log::trace!("get_node: cache miss for {digest}, loaded from store");
        Ok(node)
    }

    /// Stores raw bytes (headers, configs) without touching the node cache.
    pub fn put_bytes(&self, bytes: &[u8]) -> Result<Digest> {
        self.inner.put_block(bytes)
    }

    /// Reads raw bytes (headers, configs) without touching the node cache.
    pub fn get_bytes(&self, digest: &Digest) -> Result<Vec<u8>> {
        self.inner.get_block(digest)
    }

    pub fn has(&self, digest: &Digest) -> Result<bool> {
        if self.nodes.read().contains(digest) {
            return Ok(true);
        }
        self.inner.has_block(digest)
    }
}
