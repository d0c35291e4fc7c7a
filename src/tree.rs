//! Tree handle (§4.5): the in-memory view of a built tree, and the mutation
//! session type layered over it (§4.7, §6).

use crate::cancel::CancelToken;
use crate::codec;
use crate::config::ChunkStrategy;
use crate::cursor::{Cursor, Proof};
use crate::digest::Digest;
use crate::error::{ProllyError, Result};
use crate::mutator;
use crate::node::{TreeHeader, Value};
use crate::store::{BlockStore, CachingStore};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Buffered mutation: `None` marks a delete, `Some(value)` a put. Keyed by
/// key so last-write-wins falls out of a plain map insert (§4.7).
type OpBuffer = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// `{header, config, store_ref}` (§4.5), plus the `Built`/`Mutating` session
/// state of §4.7. Cheaply clonable readers may share one handle; `rebuild`
/// takes an internal write lock on the header so reads during a rebuild see
/// either the old or the new root, never a partial one.
pub struct TreeHandle<S> {
    store: Arc<CachingStore<S>>,
    header: RwLock<TreeHeader>,
    config: ChunkStrategy,
    session: Mutex<Option<OpBuffer>>,
}

impl<S: BlockStore> TreeHandle<S> {
    pub(crate) fn new(store: Arc<CachingStore<S>>, header: TreeHeader, config: ChunkStrategy) -> Self {
        Self { store, header: RwLock::new(header), config, session: Mutex::new(None) }
    }

    /// Reads the header block at `tree_digest`, then the config block it
    /// references, caching both (§4.5).
    pub fn load(tree_digest: Digest, store: Arc<CachingStore<S>>) -> Result<Self> {
        let header_bytes = store.get_bytes(&tree_digest)?;
        let header = codec::decode_header(&header_bytes)?;
        let config_bytes = store.get_bytes(&header.config_digest)?;
        let config = codec::decode_config(&config_bytes)?;
        log::debug!("tree: loaded {tree_digest} with {} keys", header.key_count);
        Ok(Self::new(store, header, config))
    }

    pub fn header(&self) -> TreeHeader {
        self.header.read().clone()
    }

    pub fn config(&self) -> ChunkStrategy {
        self.config
    }

    pub fn tree_count(&self) -> u64 {
        self.header.read().key_count
    }

    pub fn first_key(&self) -> Result<Option<Vec<u8>>> {
        let root = self.header.read().root_digest;
        let cursor = Cursor::first(self.store.clone(), root)?;
        Ok(cursor.current().map(|(k, _)| k.to_vec()))
    }

    pub fn last_key(&self) -> Result<Option<Vec<u8>>> {
        let root = self.header.read().root_digest;
        let cursor = Cursor::last(self.store.clone(), root)?;
        Ok(cursor.current().map(|(k, _)| k.to_vec()))
    }

    /// Point lookup (§4.6 `get`); fails with `KeyNotFound` on a miss.
    pub fn get(&self, key: &[u8]) -> Result<Value> {
        let root = self.header.read().root_digest;
        let cursor = Cursor::seek(self.store.clone(), root, key)?;
        match cursor.current() {
            Some((k, v)) if k == key => Ok(v.to_vec()),
            _ => Err(ProllyError::KeyNotFound),
        }
    }

    /// Lazy, finite, non-restartable range scan over `[lo, hi)` (§4.6).
    pub fn search(&self, lo: &[u8], hi: &[u8]) -> Result<RangeIter<S>> {
        let root = self.header.read().root_digest;
        if root.is_empty_sentinel() {
            return Ok(RangeIter { cursor: None, hi: hi.to_vec() });
        }
        let cursor = Cursor::seek(self.store.clone(), root, lo)?;
        Ok(RangeIter { cursor: Some(cursor), hi: hi.to_vec() })
    }

    /// Extracts an inclusion proof for `key` (§4.6 `proof`).
    pub fn get_proof(&self, key: &[u8]) -> Result<Proof> {
        let root = self.header.read().root_digest;
        Cursor::proof(self.store.clone(), root, key)
    }

    /// Opens a mutation session (§4.7), returning a [`Mutation`] through
    /// which `put`/`delete`/`rebuild` are called. Calling `mutate` again
    /// while a session is already open keeps the buffered ops rather than
    /// discarding them.
    pub fn mutate(&self) -> Mutation<'_, S> {
        let mut session = self.session.lock();
        if session.is_none() {
            *session = Some(BTreeMap::new());
        }
        Mutation { handle: self }
    }

    /// Buffers a put. Fails with [`ProllyError::NotMutating`] unless a
    /// session is open via [`TreeHandle::mutate`].
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let mut session = self.session.lock();
        match session.as_mut() {
            Some(ops) => {
                ops.insert(key, Some(value));
                Ok(())
            }
            None => Err(ProllyError::NotMutating),
        }
    }

    /// Buffers a delete. Fails with [`ProllyError::NotMutating`] unless a
    /// session is open.
    pub fn delete(&self, key: Vec<u8>) -> Result<()> {
        let mut session = self.session.lock();
        match session.as_mut() {
            Some(ops) => {
                ops.insert(key, None);
                Ok(())
            }
            None => Err(ProllyError::NotMutating),
        }
    }

    /// Applies all buffered operations (§4.7 rebuild algorithm), installs
    /// the new header in place, and closes the session (`Mutating` ->
    /// `Built`). Fails with [`ProllyError::NotMutating`] if no session is
    /// open.
    pub fn rebuild(&self) -> Result<Digest> {
        self.rebuild_cancelable(None)
    }

    pub fn rebuild_with_cancel(&self, cancel: &CancelToken) -> Result<Digest> {
        self.rebuild_cancelable(Some(cancel))
    }

    fn rebuild_cancelable(&self, cancel: Option<&CancelToken>) -> Result<Digest> {
        let ops = {
            let mut session = self.session.lock();
            match session.take() {
                Some(ops) => ops,
                None => return Err(ProllyError::NotMutating),
            }
        };

        let old_header = self.header.read().clone();
        let (new_header, digest) =
            mutator::rebuild(self.store.clone(), &old_header, self.config, ops, cancel)?;
        log::debug!(
            "tree: rebuilt {digest} ({} keys, was {})",
            new_header.key_count,
            old_header.key_count
        );
        *self.header.write() = new_header;
        Ok(digest)
    }
}

/// A mutation session opened by [`TreeHandle::mutate`] (§4.7, §6). A thin,
/// ergonomic handle onto the tree's own checked `put`/`delete`/`rebuild` —
/// buffering state lives on the `TreeHandle` itself so independent
/// `Mutation` values referring to the same handle share one session.
pub struct Mutation<'a, S> {
    handle: &'a TreeHandle<S>,
}

impl<'a, S: BlockStore> Mutation<'a, S> {
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.handle.put(key, value)
    }

    pub fn delete(&mut self, key: Vec<u8>) -> Result<()> {
        self.handle.delete(key)
    }

    pub fn rebuild(self) -> Result<Digest> {
        self.handle.rebuild()
    }
}

/// Iterator over `[lo, hi)` returned by [`TreeHandle::search`]. Fallible:
/// once a store error surfaces the iterator yields that error and then
/// stops.
pub struct RangeIter<S> {
    cursor: Option<Cursor<S>>,
    hi: Vec<u8>,
}

impl<S: BlockStore> Iterator for RangeIter<S> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        let current = match cursor.current() {
            Some((k, v)) => (k.to_vec(), v.to_vec()),
            None => {
                self.cursor = None;
                return None;
            }
        };
        if current.0.as_slice() >= self.hi.as_slice() {
            self.cursor = None;
            return None;
        }
        match cursor.next() {
            Ok(_) => Some(Ok(current)),
            Err(e) => {
                self.cursor = None;
                Some(Err(e))
            }
        }
    }
}
