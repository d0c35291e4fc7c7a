//! Cooperative cancellation (§5).
//!
//! A [`CancelToken`] is a cheap, cloneable flag checked at suspension points
//! (before/after a store call, and at each chunker step of a large batch). No
//! async runtime is required; cancellation is polled, not delivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
