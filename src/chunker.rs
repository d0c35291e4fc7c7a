//! The content-defined boundary engine (§4.3).
//!
//! A [`Chunker`] owns one level's running buffer and rolling hash. The
//! boundary decision is a pure function of the buffer accumulated so far,
//! the bytes of the item just appended, the level, and the [`ChunkStrategy`]
//! — no clock, no randomness, no cross-tree state — which is what makes I4
//! (determinism) hold.
//!
//! The rolling hash itself is *not* reset when a node is sealed: it keeps
//! rolling across the whole level's stream, the way content-defined chunking
//! is meant to work (a boundary a few bytes later than it "should" have been
//! still converges once the window has slid past the seal point). Only the
//! per-node buffer and byte count reset on seal.

use crate::config::ChunkStrategy;

/// One item fed into a level's chunker: a key plus whatever payload that
/// level carries (a value at level 0, an encoded child digest above it).
#[derive(Debug, Clone)]
pub struct ChunkItem {
    pub key: Vec<u8>,
    pub payload: Vec<u8>,
}

impl ChunkItem {
    pub fn new(key: Vec<u8>, payload: Vec<u8>) -> Self {
        Self { key, payload }
    }

    fn byte_len(&self) -> u32 {
        (self.key.len() + self.payload.len()) as u32
    }
}

/// A BuzHash-style cyclic polynomial rolling hash over a trailing byte
/// window, per the Open Question resolution in §4.3/§9. The table is
/// generated once from a fixed seed via SplitMix64, so it is itself part of
/// the deterministic specification of `hash_function_id = BuzHash64`.
struct RollingHash {
    table: [u64; 256],
    window: Vec<u8>,
    window_size: usize,
    cursor: usize,
    filled: usize,
    hash: u64,
}

impl RollingHash {
    fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            table: buzhash_table(),
            window: vec![0u8; window_size],
            window_size,
            cursor: 0,
            filled: 0,
            hash: 0,
        }
    }

    fn push_byte(&mut self, byte: u8) {
        let incoming = self.table[byte as usize];
        if self.filled < self.window_size {
            self.hash = self.hash.rotate_left(1) ^ incoming;
            self.filled += 1;
        } else {
            let outgoing = self.window[self.cursor];
            let outgoing_contribution = self.table[outgoing as usize].rotate_left(self.window_size as u32);
            self.hash = self.hash.rotate_left(1) ^ incoming ^ outgoing_contribution;
        }
        self.window[self.cursor] = byte;
        self.cursor = (self.cursor + 1) % self.window_size;
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push_byte(b);
        }
    }

    fn value(&self) -> u64 {
        self.hash
    }
}

fn buzhash_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut seed: u64 = 0x9E3779B97F4A7C15;
    for slot in table.iter_mut() {
        seed = seed.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = seed;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^= z >> 31;
        *slot = z;
    }
    table
}

/// Runs the boundary decision for a single tree level (§4.3). One
/// independent instance exists per level, created lazily by the builder as
/// higher levels receive their first item.
pub struct Chunker {
    strategy: ChunkStrategy,
    level: u8,
    hash: RollingHash,
    buffer: Vec<ChunkItem>,
    buffer_size: u32,
}

impl Chunker {
    pub fn new(strategy: ChunkStrategy, level: u8) -> Self {
        let window_size = strategy.suffix_window.max(1) as usize;
        Self {
            strategy,
            level,
            hash: RollingHash::new(window_size),
            buffer: Vec::new(),
            buffer_size: 0,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Appends `item`, rolls the hash over its bytes, and returns whether a
    /// boundary should be sealed right after this append (§4.3 rules 1-2).
    pub fn push(&mut self, item: ChunkItem) -> bool {
        self.hash.push_bytes(&item.key);
        self.hash.push_bytes(&item.payload);

        self.buffer_size += item.byte_len();
        self.buffer.push(item);

        self.is_boundary()
    }

    fn is_boundary(&self) -> bool {
        // Rule 1: hard maximum. We cannot know the next item's size in
        // advance, so we seal as soon as the buffer alone has reached the
        // cap, guaranteeing the *next* append can never push a sealed node
        // over max_node_size.
        if self.buffer_size >= self.strategy.max_node_size {
            return true;
        }

        // Rule 2: content-defined split, gated by the minimum size.
        if self.buffer_size >= self.strategy.min_node_size {
            let mask_bits = self.strategy.mask_bits(self.level);
            let mask = if mask_bits >= 64 { u64::MAX } else { (1u64 << mask_bits) - 1 };
            if self.hash.value() & mask == 0 {
                return true;
            }
        }

        false
    }

    /// Seals the current buffer unconditionally (§4.3 rule 3, end of
    /// stream), returning its items in insertion order. Also used whenever
    /// [`Chunker::push`] reports a boundary. Leaves the chunker ready to
    /// accept the next node's items; the rolling hash keeps rolling.
    pub fn seal(&mut self) -> Vec<ChunkItem> {
        self.buffer_size = 0;
        std::mem::take(&mut self.buffer)
    }
}
