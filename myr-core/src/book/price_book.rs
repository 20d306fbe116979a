//! Two-sided bounded price book snapshot

use crate::core::types::Timestamp;

use super::side::{AskSide, BidSide, SIDE_MAX_SIZE};

/// One bid side, one ask side, and the time the snapshot was assembled
///
/// A book is built level-by-level by a single producer, then handed to
/// consumers as a complete value (see [`super::publish::BookCell`]).
/// Copying a book deep-copies both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceBook {
    time: Timestamp,
    bid: BidSide,
    ask: AskSide,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(time: Timestamp) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }

    /// Fixed per-side capacity, for sizing loops and validating
    /// depth-of-book requests
    #[inline(always)]
    pub const fn side_max_size() -> usize {
        SIDE_MAX_SIZE
    }

    #[inline(always)]
    pub const fn time(&self) -> Timestamp {
        self.time
    }

    /// Set the snapshot assembly time.
    ///
    /// Book time is monotonically non-decreasing on one instance; a
    /// regression is a producer bug, not a recoverable condition.
    #[inline]
    pub fn set_time(&mut self, time: Timestamp) {
        debug_assert!(
            self.time == 0 || self.time <= time,
            "book time regression: {} -> {}",
            self.time,
            time
        );
        self.time = time;
    }

    #[inline(always)]
    pub fn bid(&self) -> &BidSide {
        &self.bid
    }

    #[inline(always)]
    pub fn bid_mut(&mut self) -> &mut BidSide {
        &mut self.bid
    }

    #[inline(always)]
    pub fn ask(&self) -> &AskSide {
        &self.ask
    }

    #[inline(always)]
    pub fn ask_mut(&mut self) -> &mut AskSide {
        &mut self.ask
    }

    /// Clear both sides. Book time is untouched.
    pub fn clear(&mut self) {
        self.bid.clear();
        self.ask.clear();
    }
}
