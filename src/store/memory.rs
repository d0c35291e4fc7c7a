//! Reference in-memory [`BlockStore`], used by this crate's own tests and by
//! embedders who don't yet need durability (§4.1).

use super::BlockStore;
use crate::digest::Digest;
use crate::error::{ProllyError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryStore {
    blocks: RwLock<HashMap<Digest, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlockStore for MemoryStore {
    fn put_block(&self, bytes: &[u8]) -> Result<Digest> {
        let digest = Digest::of(bytes);
        let mut blocks = self.blocks.write();
        blocks.entry(digest).or_insert_with(|| bytes.to_vec());
        Ok(digest)
    }

    fn get_block(&self, digest: &Digest) -> Result<Vec<u8>> {
        self.blocks
            .read()
            .get(digest)
            .cloned()
            .ok_or(ProllyError::NotFound(*digest))
    }

    fn has_block(&self, digest: &Digest) -> Result<bool> {
        Ok(self.blocks.read().contains_key(digest))
    }
}
