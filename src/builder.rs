//! The tree builder (§4.4): streams sorted pairs through a per-level chain
//! of [`Chunker`]s into a content-addressed, multi-level tree.

use crate::cancel::CancelToken;
use crate::chunker::{ChunkItem, Chunker};
use crate::codec;
use crate::config::ChunkStrategy;
use crate::digest::{Digest, EMPTY_SENTINEL};
use crate::error::{ProllyError, Result};
use crate::node::{InternalEntry, LeafEntry, Node, TreeHeader};
use crate::store::{BlockStore, CachingStore};
use crate::tree::TreeHandle;
use std::sync::Arc;

/// Tracks the most recently sealed node so `build()` can tell whether a
/// level's final flush produced the root (no level above it was ever
/// needed) without guessing from buffer contents alone.
struct Sealed {
    first_key: Vec<u8>,
    digest: Digest,
    level: u8,
}

pub struct Builder<S> {
    store: Arc<CachingStore<S>>,
    strategy: ChunkStrategy,
    config_digest: Digest,
    chunkers: Vec<Chunker>,
    last_key: Option<Vec<u8>>,
    key_count: u64,
    last_sealed: Option<Sealed>,
}

impl<S: BlockStore> Builder<S> {
    pub fn new(store: Arc<CachingStore<S>>, strategy: ChunkStrategy, prefix: Option<Vec<u8>>) -> Result<Self> {
        let config_bytes = codec::encode_config(&strategy)?;
        let config_digest = store.put_bytes(&config_bytes)?;
        Ok(Self {
            store,
            strategy,
            config_digest,
            chunkers: Vec::new(),
            last_key: prefix,
            key_count: 0,
            last_sealed: None,
        })
    }

    fn chunker_at(&mut self, level: u8) -> &mut Chunker {
        while self.chunkers.len() <= level as usize {
            let lvl = self.chunkers.len() as u8;
            self.chunkers.push(Chunker::new(self.strategy, lvl));
        }
        &mut self.chunkers[level as usize]
    }

    /// Appends one (key, value) pair. Keys MUST be strictly ascending across
    /// calls; violation fails with [`ProllyError::UnsortedInput`].
    pub fn append(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        if let Some(last) = &self.last_key {
            if key.as_slice() <= last.as_slice() {
                return Err(ProllyError::UnsortedInput(key));
            }
        }
        self.last_key = Some(key.clone());
        self.key_count += 1;

        let boundary = self.chunker_at(0).push(ChunkItem::new(key, value));
        if boundary {
            self.seal_and_propagate(0)?;
        }
        Ok(())
    }

    pub fn append_batch(&mut self, keys: Vec<Vec<u8>>, values: Vec<Vec<u8>>) -> Result<()> {
        let cancel = CancelToken::new();
        self.append_batch_cancelable(keys, values, &cancel)
    }

    /// As [`Builder::append_batch`], but polls `cancel` before each append so
    /// a large batch can be aborted without leaving a partial tree visible
    /// (the header is only ever written by [`Builder::build`]).
    pub fn append_batch_cancelable(
        &mut self,
        keys: Vec<Vec<u8>>,
        values: Vec<Vec<u8>>,
        cancel: &CancelToken,
    ) -> Result<()> {
        if keys.len() != values.len() {
            return Err(ProllyError::codec("append_batch: keys/values length mismatch"));
        }
        for (key, value) in keys.into_iter().zip(values.into_iter()) {
            if cancel.is_canceled() {
                return Err(ProllyError::Canceled);
            }
            self.append(key, value)?;
        }
        Ok(())
    }

    fn seal_and_propagate(&mut self, level: u8) -> Result<()> {
        let items = self.chunker_at(level).seal();
        if items.is_empty() {
            return Ok(());
        }
        let first_key = items[0].key.clone();
        let node = self.build_node(level, items);
        let digest = self.store.put_node(&node)?;
        log::debug!("builder: sealed level {level} node {digest} with {} entries", node.len());

        self.last_sealed = Some(Sealed { first_key: first_key.clone(), digest, level });

        let next_level = level + 1;
        let boundary = self.chunker_at(next_level).push(ChunkItem::new(first_key, digest.as_bytes().to_vec()));
        if boundary {
            self.seal_and_propagate(next_level)?;
        }
        Ok(())
    }

    fn build_node(&self, level: u8, items: Vec<ChunkItem>) -> Node {
        if level == 0 {
            let entries = items
                .into_iter()
                .map(|it| LeafEntry { key: it.key, value: it.payload })
                .collect();
            Node::new_leaf(entries)
        } else {
            let entries = items
                .into_iter()
                .map(|it| {
                    let mut raw = [0u8; crate::digest::DIGEST_LEN];
                    raw.copy_from_slice(&it.payload);
                    InternalEntry { split_key: it.key, child_digest: Digest::from_bytes(raw) }
                })
                .collect();
            Node::new_internal(level, entries)
        }
    }

    /// Flushes every chunker end-of-stream (§4.4 rule 3), writes the header,
    /// and returns the resulting handle plus the header's digest.
    pub fn build(mut self) -> Result<(TreeHandle<S>, Digest)> {
        if self.key_count == 0 {
            let header = TreeHeader {
                root_digest: EMPTY_SENTINEL,
                config_digest: self.config_digest,
                key_count: 0,
                level_count: 0,
            };
            let header_bytes = codec::encode_header(&header)?;
            let header_digest = self.store.put_bytes(&header_bytes)?;
            let handle = TreeHandle::new(self.store, header, self.strategy);
            return Ok((handle, header_digest));
        }

        let mut level = 0u8;
        loop {
            if level as usize >= self.chunkers.len() {
                break;
            }
            let items = self.chunkers[level as usize].seal();
            if !items.is_empty() {
                let first_key = items[0].key.clone();
                let node = self.build_node(level, items);
                let digest = self.store.put_node(&node)?;
                self.last_sealed = Some(Sealed { first_key: first_key.clone(), digest, level });

                let next_level = level + 1;
                if (next_level as usize) < self.chunkers.len() {
                    self.chunkers[next_level as usize]
                        .push(ChunkItem::new(first_key, digest.as_bytes().to_vec()));
                } else {
                    break;
                }
            }
            level += 1;
        }

        let sealed = self.last_sealed.expect("key_count > 0 implies at least one sealed node");
        let header = TreeHeader {
            root_digest: sealed.digest,
            config_digest: self.config_digest,
            key_count: self.key_count,
            level_count: sealed.level + 1,
        };
        let header_bytes = codec::encode_header(&header)?;
        let header_digest = self.store.put_bytes(&header_bytes)?;
        log::debug!(
            "builder: built tree {header_digest} with {} keys across {} levels",
            header.key_count,
            header.level_count
        );

        let handle = TreeHandle::new(self.store, header, self.strategy);
        Ok((handle, header_digest))
    }
}
