//! Crate-wide error type.
//!
//! Every fallible operation in this crate returns `Result<T, ProllyError>`. The
//! core never retries; a store adapter that wants retry-on-transient-failure
//! semantics implements that inside its own `BlockStore` impl and surfaces a
//! `StoreError` only once it has given up.

use crate::digest::Digest;

#[derive(Debug, thiserror::Error)]
pub enum ProllyError {
    /// A digest was not present in the block store.
    #[error("block not found for digest {0}")]
    NotFound(Digest),

    /// A point lookup found no entry for the given key.
    #[error("key not found")]
    KeyNotFound,

    /// A builder or cursor received keys that were not strictly ascending.
    #[error("unsorted input: key {0:?} did not exceed the previous key")]
    UnsortedInput(Vec<u8>),

    /// A block's bytes did not decode into a valid node, header, or config.
    #[error("codec error: {0}")]
    CodecError(String),

    /// `put`/`delete`/`rebuild` were called outside an open mutation session.
    #[error("tree handle is not in a mutating session")]
    NotMutating,

    /// A cancellation token fired while an operation was blocked on the store.
    #[error("operation canceled")]
    Canceled,

    /// An opaque failure surfaced from the underlying block store.
    #[error("store error: {0}")]
    StoreError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ProllyError {
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ProllyError::StoreError(Box::new(err))
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        ProllyError::CodecError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ProllyError>;
