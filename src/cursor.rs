//! Root-to-leaf cursors (§4.6): seek, advance, point lookup, range scan, and
//! inclusion proof extraction over the content-addressed DAG.

use crate::codec;
use crate::digest::Digest;
use crate::error::{ProllyError, Result};
use crate::node::Node;
use crate::store::{BlockStore, CachingStore};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Frame {
    digest: Digest,
    node: Node,
    index: usize,
}

/// A stack of `(node_digest, node, entry_index)` frames from root to a leaf
/// entry (§4.6). Holds no mutable shared state beyond the read-through cache
/// it borrows, so independent cursors over the same tree may run
/// concurrently.
pub struct Cursor<S> {
    store: Arc<CachingStore<S>>,
    frames: Vec<Frame>,
    exhausted: bool,
}

impl<S: BlockStore> Cursor<S> {
    /// Descends from `root_digest` to the first entry with key >= `key`
    /// (§4.6 `seek`). An empty tree (sentinel root) always yields an
    /// exhausted cursor.
    pub fn seek(store: Arc<CachingStore<S>>, root_digest: Digest, key: &[u8]) -> Result<Self> {
        if root_digest.is_empty_sentinel() {
            return Ok(Self { store, frames: Vec::new(), exhausted: true });
        }

        let mut frames = Vec::new();
        let mut digest = root_digest;
        loop {
            let node = store.get_node(&digest)?;
            match &node {
                Node::Internal { entries, .. } => {
                    let idx = match entries.binary_search_by(|e| e.split_key.as_slice().cmp(key)) {
                        Ok(i) => i,
                        Err(0) => 0,
                        Err(i) => i - 1,
                    };
                    let child_digest = entries[idx].child_digest;
                    frames.push(Frame { digest, node, index: idx });
                    digest = child_digest;
                }
                Node::Leaf { entries } => {
                    let idx = entries
                        .binary_search_by(|e| e.key.as_slice().cmp(key))
                        .unwrap_or_else(|i| i);
                    let exhausted = idx >= entries.len();
                    frames.push(Frame { digest, node, index: idx });
                    return Ok(Self { store, frames, exhausted });
                }
            }
        }
    }

    /// Descends leftmost from the root; used by `TreeHandle::first_key`.
    pub fn first(store: Arc<CachingStore<S>>, root_digest: Digest) -> Result<Self> {
        Self::seek(store, root_digest, &[])
    }

    /// Descends rightmost from the root; used by `TreeHandle::last_key`.
    pub fn last(store: Arc<CachingStore<S>>, root_digest: Digest) -> Result<Self> {
        if root_digest.is_empty_sentinel() {
            return Ok(Self { store, frames: Vec::new(), exhausted: true });
        }
        let mut cursor = Self { store, frames: Vec::new(), exhausted: false };
        cursor.descend_rightmost(root_digest)?;
        Ok(cursor)
    }

    fn leaf_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The (key, value) the cursor currently points at, if any.
    pub fn current(&self) -> Option<(&[u8], &[u8])> {
        if self.exhausted {
            return None;
        }
        let frame = self.leaf_frame()?;
        match &frame.node {
            Node::Leaf { entries } => entries.get(frame.index).map(|e| (e.key.as_slice(), e.value.as_slice())),
            Node::Internal { .. } => None,
        }
    }

    /// Advances to the next leaf entry, popping frames and descending into a
    /// sibling subtree when the current leaf is exhausted (§4.6 `next`).
    pub fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        if self.exhausted {
            return Ok(None);
        }

        let current = {
            let frame = self.frames.last().expect("seek always pushes a leaf frame");
            match &frame.node {
                Node::Leaf { entries } => entries[frame.index].clone(),
                Node::Internal { .. } => unreachable!("leaf frame must hold a leaf node"),
            }
        };

        // Try to advance within the current leaf. Each `frame`/`entries`
        // borrow is scoped to its own block so it ends before any
        // subsequent `&mut self` call (`descend_leftmost`), which the
        // borrow checker otherwise can't see past a `while let` binding.
        let advanced = match self.frames.last_mut() {
            Some(frame) => match &frame.node {
                Node::Leaf { entries } if frame.index + 1 < entries.len() => {
                    frame.index += 1;
                    true
                }
                _ => false,
            },
            None => false,
        };
        if advanced {
            return Ok(Some((current.key, current.value)));
        }

        // Pop frames until a parent has a right sibling, then descend
        // leftmost into it.
        self.frames.pop();
        loop {
            let sibling = match self.frames.last_mut() {
                None => break,
                Some(frame) => match &frame.node {
                    Node::Internal { entries, .. } if frame.index + 1 < entries.len() => {
                        frame.index += 1;
                        Some(entries[frame.index].child_digest)
                    }
                    _ => None,
                },
            };
            match sibling {
                Some(child_digest) => {
                    self.descend_leftmost(child_digest)?;
                    return Ok(Some((current.key, current.value)));
                }
                None => {
                    self.frames.pop();
                }
            }
        }

        self.exhausted = true;
        Ok(Some((current.key, current.value)))
    }

    /// Advances to the previous leaf entry, symmetric to [`Cursor::next`].
    pub fn prev(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        if self.frames.is_empty() {
            return Ok(None);
        }

        let retreated = match self.frames.last_mut() {
            Some(frame) => match &frame.node {
                Node::Leaf { .. } if frame.index > 0 => {
                    frame.index -= 1;
                    true
                }
                _ => false,
            },
            None => false,
        };
        if retreated {
            self.exhausted = false;
            let frame = self.frames.last().unwrap();
            if let Node::Leaf { entries } = &frame.node {
                let e = &entries[frame.index];
                return Ok(Some((e.key.clone(), e.value.clone())));
            }
        }

        self.frames.pop();
        loop {
            let sibling = match self.frames.last_mut() {
                None => break,
                Some(frame) => match &frame.node {
                    Node::Internal { entries, .. } if frame.index > 0 => {
                        frame.index -= 1;
                        Some(entries[frame.index].child_digest)
                    }
                    _ => None,
                },
            };
            match sibling {
                Some(child_digest) => {
                    self.descend_rightmost(child_digest)?;
                    self.exhausted = false;
                    let frame = self.frames.last().unwrap();
                    if let Node::Leaf { entries } = &frame.node {
                        let e = &entries[frame.index];
                        return Ok(Some((e.key.clone(), e.value.clone())));
                    }
                    unreachable!("descend_rightmost always ends on a leaf frame");
                }
                None => {
                    self.frames.pop();
                }
            }
        }

        Ok(None)
    }

    fn descend_leftmost(&mut self, mut digest: Digest) -> Result<()> {
        loop {
            let node = self.store.get_node(&digest)?;
            match &node {
                Node::Internal { entries, .. } => {
                    let child_digest = entries[0].child_digest;
                    self.frames.push(Frame { digest, node, index: 0 });
                    digest = child_digest;
                }
                Node::Leaf { .. } => {
                    self.frames.push(Frame { digest, node, index: 0 });
                    return Ok(());
                }
            }
        }
    }

    fn descend_rightmost(&mut self, mut digest: Digest) -> Result<()> {
        loop {
            let node = self.store.get_node(&digest)?;
            match &node {
                Node::Internal { entries, .. } => {
                    let idx = entries.len() - 1;
                    let child_digest = entries[idx].child_digest;
                    self.frames.push(Frame { digest, node, index: idx });
                    digest = child_digest;
                }
                Node::Leaf { entries } => {
                    let idx = entries.len().saturating_sub(1);
                    self.frames.push(Frame { digest, node, index: idx });
                    return Ok(());
                }
            }
        }
    }

    /// A single frame of an inclusion proof: the node's digest, its full
    /// entry list, and the index the path took through it.
    pub fn proof(store: Arc<CachingStore<S>>, root_digest: Digest, key: &[u8]) -> Result<Proof> {
        let cursor = Self::seek(store, root_digest, key)?;
        if cursor.exhausted {
            return Err(ProllyError::KeyNotFound);
        }
        let frame = cursor.frames.last().unwrap();
        if let Node::Leaf { entries } = &frame.node {
            if entries[frame.index].key != key {
                return Err(ProllyError::KeyNotFound);
            }
        }

        let frames = cursor
            .frames
            .iter()
            .map(|f| ProofFrame { digest: f.digest, node: f.node.clone(), index: f.index })
            .collect();
        Ok(Proof { frames })
    }
}

/// One frame of an inclusion [`Proof`]: a node's digest, its full entry
/// list, and the index the claimed path took through it.
#[derive(Debug, Clone)]
pub struct ProofFrame {
    pub digest: Digest,
    pub node: Node,
    pub index: usize,
}

/// The root-to-leaf path a verifier replays to check membership (§4.6).
#[derive(Debug, Clone)]
pub struct Proof {
    pub frames: Vec<ProofFrame>,
}

impl Proof {
    /// Recomputes each frame's digest from its contents and checks that the
    /// root frame's digest equals `root_digest`, that each parent's chosen
    /// child digest matches the next frame's digest, and that the claimed
    /// `(key, value)` appears at the final frame's index.
    pub fn verify(&self, root_digest: Digest, key: &[u8], value: &[u8]) -> bool {
        if self.frames.is_empty() {
            return false;
        }

        for frame in &self.frames {
            let Ok(bytes) = codec::encode_node(&frame.node) else { return false };
            if Digest::of(&bytes) != frame.digest {
                return false;
            }
        }

        if self.frames[0].digest != root_digest {
            return false;
        }

        for window in self.frames.windows(2) {
            let (parent, child) = (&window[0], &window[1]);
            match &parent.node {
                Node::Internal { entries, .. } => {
                    let Some(entry) = entries.get(parent.index) else { return false };
                    if entry.child_digest != child.digest {
                        return false;
                    }
                }
                Node::Leaf { .. } => return false,
            }
        }

        let last = self.frames.last().unwrap();
        match &last.node {
            Node::Leaf { entries } => match entries.get(last.index) {
                Some(entry) => entry.key == key && entry.value == value,
                None => false,
            },
            Node::Internal { .. } => false,
        }
    }
}
