//! A probabilistic B-tree (prolly tree): a content-addressed, ordered
//! key-value index whose physical node boundaries are a deterministic
//! function of its contents. Two trees built from the same sorted input,
//! by any number of independent builders, produce identical root digests —
//! which is what makes set reconciliation, inclusion proofs, and structural
//! sharing between versions possible.
//!
//! The crate is organized leaves-first:
//! - [`store`] — the `BlockStore` capability the core depends on, a
//!   reference in-memory implementation, and the read-through node cache.
//! - [`digest`], [`codec`], [`config`], [`node`] — the content-addressing,
//!   canonical encoding, and data model underneath every block.
//! - [`chunker`] — the rolling-hash boundary engine.
//! - [`builder`] — streams sorted pairs into a tree.
//! - [`tree`] — the handle over a built tree: reads, and the mutation
//!   session.
//! - [`cursor`] — root-to-leaf traversal, range scans, inclusion proofs.
//! - [`mutator`] — the rebuild algorithm behind `TreeHandle::mutate`.

pub mod builder;
pub mod cancel;
pub mod chunker;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod digest;
pub mod error;
pub mod mutator;
pub mod node;
pub mod store;
pub mod tree;

pub use builder::Builder;
pub use cancel::CancelToken;
pub use config::{CacheConfig, ChunkStrategy, HashFunctionId};
pub use cursor::{Cursor, Proof, ProofFrame};
pub use digest::Digest;
pub use error::{ProllyError, Result};
pub use node::{InternalEntry, LeafEntry, Node, TreeHeader, Value};
pub use store::{BlockStore, CachingStore, MemoryStore};
pub use tree::{Mutation, RangeIter, TreeHandle};
