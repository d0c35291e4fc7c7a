//! The rebuild algorithm (§4.7 C7).
//!
//! Buffered ops are merged against the existing tree's in-order key stream
//! and the whole result is re-fed through a fresh [`Builder`]. Because the
//! rolling hash in [`crate::chunker`] is a true fixed-window hash — its value
//! at any position depends only on the trailing `suffix_window` bytes, never
//! on everything fed before it — a run of untouched keys reproduces the
//! exact boundary decisions it had before, so the resulting nodes re-encode
//! to identical bytes and [`crate::store::BlockStore::put_block`]'s
//! idempotency means no new block is written for them (I5). This trades the
//! decode-avoidance optimization in §4.7 step 3 for a single, easy-to-verify
//! code path; see DESIGN.md for the tradeoff this makes against the spec's
//! literal digest-passthrough description.

use crate::builder::Builder;
use crate::cancel::CancelToken;
use crate::config::ChunkStrategy;
use crate::cursor::Cursor;
use crate::digest::Digest;
use crate::error::{ProllyError, Result};
use crate::node::TreeHeader;
use crate::store::{BlockStore, CachingStore};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Applies `ops` (key -> `Some(value)` for a put, `None` for a delete)
/// against the tree described by `header`, returning the new header and its
/// digest. `cancel`, if given, is polled once per merged item.
pub fn rebuild<S: BlockStore>(
    store: Arc<CachingStore<S>>,
    header: &TreeHeader,
    strategy: ChunkStrategy,
    ops: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    cancel: Option<&CancelToken>,
) -> Result<(TreeHeader, Digest)> {
    let mut builder = Builder::new(store.clone(), strategy, None)?;
    let mut op_iter = ops.into_iter().peekable();

    let mut old_cursor = if header.root_digest.is_empty_sentinel() {
        None
    } else {
        Some(Cursor::first(store.clone(), header.root_digest)?)
    };
    // `Cursor::next` returns the element at the cursor's current position and
    // then advances past it (standard iterator semantics). So the old stream
    // is driven entirely through `next()`/`advance` below; seeding from
    // `current()` as well would read the first element twice.
    let mut old_current = advance(&mut old_cursor)?;

    // Each iteration first computes a pure, owned `Decision` from read-only
    // borrows of `old_current`/`op_iter`, then acts on it. Matching on
    // references into `old_current` and mutating it (`take()`) in the same
    // arm would fight the borrow checker; splitting decide-then-act avoids
    // that entirely.
    enum Decision {
        Done,
        OldOnly,
        OpOnly,
        Both(std::cmp::Ordering),
    }

    let mut touched = 0u64;
    loop {
        if let Some(token) = cancel {
            if token.is_canceled() {
                return Err(ProllyError::Canceled);
            }
        }

        let decision = match (&old_current, op_iter.peek()) {
            (None, None) => Decision::Done,
            (Some((ok, _)), Some((pk, _))) => Decision::Both(ok.as_slice().cmp(pk.as_slice())),
            (Some(_), None) => Decision::OldOnly,
            (None, Some(_)) => Decision::OpOnly,
        };

        match decision {
            Decision::Done => break,
            Decision::Both(std::cmp::Ordering::Less) | Decision::OldOnly => {
                let (k, v) = old_current.take().unwrap();
                builder.append(k, v)?;
                old_current = advance(&mut old_cursor)?;
            }
            Decision::Both(std::cmp::Ordering::Equal) => {
                let (_, new_value) = op_iter.next().unwrap();
                if let Some(value) = new_value {
                    let (k, _) = old_current.take().unwrap();
                    builder.append(k, value)?;
                }
                touched += 1;
                old_current = advance(&mut old_cursor)?;
            }
            Decision::Both(std::cmp::Ordering::Greater) | Decision::OpOnly => {
                let (key, new_value) = op_iter.next().unwrap();
                if let Some(value) = new_value {
                    builder.append(key, value)?;
                    touched += 1;
                }
            }
        }
    }

    log::debug!("mutator: rebuild touched {touched} keys");
    let (handle, digest) = builder.build()?;
    Ok((handle.header().clone(), digest))
}

fn advance<S: BlockStore>(cursor: &mut Option<Cursor<S>>) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
    match cursor {
        Some(c) => {
            let next = c.next()?;
            if next.is_none() {
                *cursor = None;
            }
            Ok(next)
        }
        None => Ok(None),
    }
}
