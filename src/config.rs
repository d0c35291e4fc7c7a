//! Tree configuration.
//!
//! [`ChunkStrategy`] is stored as its own block (§3, Config) and referenced by
//! a tree's header by digest. [`CacheConfig`] is process-local and is never
//! persisted; it tunes the read-through cache in [`crate::store::cache`].

use serde::{Deserialize, Serialize};

/// Identifies the rolling-hash function a [`ChunkStrategy`] uses for its
/// content-defined split decision (§4.3). Pluggable per the Open Question in
/// §9; today only `BuzHash64` is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashFunctionId {
    BuzHash64 = 0,
}

/// Parameters controlling where the chunker seals a node boundary.
///
/// This struct is itself canonically encoded and stored as a block (the
/// "Config" of §3); its digest is referenced by every [`crate::TreeHeader`]
/// built with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkStrategy {
    /// Expected average serialized node size in bytes.
    pub target_node_size: u32,
    /// Hard lower bound on a non-root node's serialized size.
    pub min_node_size: u32,
    /// Hard upper bound on a non-root node's serialized size.
    pub max_node_size: u32,
    /// Scales the probability mask used by the content-defined split rule;
    /// higher values produce larger average nodes.
    pub chunking_factor: u32,
    /// Number of trailing bytes of each item's canonical encoding fed into
    /// the rolling hash window.
    pub suffix_window: u32,
    pub hash_function_id: HashFunctionId,
}

impl Default for ChunkStrategy {
    fn default() -> Self {
        Self {
            target_node_size: 4096,
            min_node_size: 1024,
            max_node_size: 16384,
            chunking_factor: 1,
            suffix_window: 64,
            hash_function_id: HashFunctionId::BuzHash64,
        }
    }
}

impl ChunkStrategy {
    pub fn with_target_node_size(mut self, target_node_size: u32) -> Self {
        self.target_node_size = target_node_size;
        self
    }

    pub fn with_min_node_size(mut self, min_node_size: u32) -> Self {
        self.min_node_size = min_node_size;
        self
    }

    pub fn with_max_node_size(mut self, max_node_size: u32) -> Self {
        self.max_node_size = max_node_size;
        self
    }

    pub fn with_chunking_factor(mut self, chunking_factor: u32) -> Self {
        self.chunking_factor = chunking_factor;
        self
    }

    pub fn with_suffix_window(mut self, suffix_window: u32) -> Self {
        self.suffix_window = suffix_window;
        self
    }

    /// Number of low bits of the rolling hash that must be zero for a
    /// boundary to be declared, at a given tree level. Higher levels get a
    /// slightly coarser mask so the tree narrows roughly logarithmically.
    pub fn mask_bits(&self, level: u8) -> u32 {
        let average_item_size = 48u32; // typical (key, value-or-digest) pair size
        let base = (self.target_node_size.max(1) / average_item_size.max(1)).max(1);
        let scaled = base.saturating_mul(self.chunking_factor.max(1));
        let bits = 32 - scaled.leading_zeros().min(32);
        bits.saturating_add(level as u32)
    }
}

/// Tunes the bounded LRU cache sitting in front of a [`crate::store::BlockStore`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Number of decoded nodes retained by the cache.
    pub node_cache_size: usize,
    /// Whether hit/miss counters are tracked.
    pub enable_stats: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            node_cache_size: 10_000,
            enable_stats: true,
        }
    }
}

impl CacheConfig {
    pub fn with_node_cache_size(mut self, node_cache_size: usize) -> Self {
        self.node_cache_size = node_cache_size;
        self
    }

    pub fn with_enable_stats(mut self, enable_stats: bool) -> Self {
        self.enable_stats = enable_stats;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strategy_has_sane_bounds() {
        let s = ChunkStrategy::default();
        assert!(s.min_node_size < s.target_node_size);
        assert!(s.target_node_size < s.max_node_size);
    }

    #[test]
    fn higher_levels_get_a_coarser_mask() {
        let s = ChunkStrategy::default();
        assert!(s.mask_bits(1) >= s.mask_bits(0));
        assert!(s.mask_bits(3) >= s.mask_bits(1));
    }
}
