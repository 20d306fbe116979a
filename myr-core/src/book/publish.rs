//! Per-instrument published book snapshot
//!
//! A market-data producer builds a complete `PriceBook` off to the
//! side and publishes it by swapping an `Arc` under a short-held lock.
//! Readers clone the `Arc` and hold an immutable snapshot for as long
//! as they need it. A reader can never observe a half-built book, and
//! a consumer that wants to merge an incremental update copies the
//! snapshot first and publishes the modified copy.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::types::{Px, Timestamp};

use super::level::PriceLevel;
use super::price_book::PriceBook;

/// Atomically swappable published snapshot for one instrument
#[derive(Debug)]
pub struct BookCell {
    slot: RwLock<Arc<PriceBook>>,
}

impl BookCell {
    /// Start with an empty book (time unset, both sides empty).
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Arc::new(PriceBook::new())),
        }
    }

    /// Publish a freshly built snapshot, returning the one it replaced.
    ///
    /// Readers holding the previous `Arc` keep a consistent view; only
    /// subsequent reads observe the new book.
    pub fn publish(&self, book: PriceBook) -> Arc<PriceBook> {
        let next = Arc::new(book);
        std::mem::replace(&mut *self.slot.write(), next)
    }

    /// Current published snapshot.
    #[inline]
    pub fn snapshot(&self) -> Arc<PriceBook> {
        self.slot.read().clone()
    }

    /// Best bid of the current snapshot, if any.
    #[inline]
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.slot.read().bid().top().ok().copied()
    }

    /// Best ask of the current snapshot, if any.
    #[inline]
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.slot.read().ask().top().ok().copied()
    }

    /// Mid price of the current snapshot, if both sides have depth.
    pub fn mid_price(&self) -> Option<Px> {
        let book = self.slot.read();
        let bid = book.bid().top().ok()?.price();
        let ask = book.ask().top().ok()?.price();
        Some(bid / 2 + ask / 2 + (bid % 2 + ask % 2) / 2)
    }

    /// Assembly time of the current snapshot.
    #[inline]
    pub fn time(&self) -> Timestamp {
        self.slot.read().time()
    }
}

impl Default for BookCell {
    fn default() -> Self {
        Self::new()
    }
}
