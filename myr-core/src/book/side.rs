//! Fixed-capacity sorted side of a price book
//!
//! A side is a fixed `[PriceLevel; SIDE_MAX_SIZE]` arena plus a base
//! `offset` and live `len`. Consuming the best level advances the
//! offset (O(1), no data movement); inserts binary-search the live
//! range and shift at most nine levels. The side never allocates on
//! the update path.
//!
//! Direction is a zero-sized policy type: [`Bids`] keeps prices
//! descending (highest first), [`Asks`] ascending (lowest first), so
//! rank 0 is always the most competitive level. Dispatch is resolved
//! at compile time.
//!
//! Producer-side mutations (`add`, `update`) are only legal while the
//! offset is zero, i.e. before any consumer has popped from this
//! generation of the side.

use std::fmt;
use std::marker::PhantomData;

use crate::core::errors::{BookAccessError, BookInsertError};
use crate::core::types::{Px, Qty, Timestamp};

use super::level::PriceLevel;

/// Depth retained per side
pub const SIDE_MAX_SIZE: usize = 10;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Bids {}
    impl Sealed for super::Asks {}
}

/// Sort direction policy of a book side
pub trait SideOrder: sealed::Sealed + Copy + fmt::Debug + Default + Send + Sync + 'static {
    /// Side name for logs
    const NAME: &'static str;

    /// `true` if a level at `lhs` ranks strictly better than one at `rhs`
    fn ranks_before(lhs: Px, rhs: Px) -> bool;
}

/// Descending sort: highest price is the most competitive bid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bids;

/// Ascending sort: lowest price is the most competitive ask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Asks;

impl SideOrder for Bids {
    const NAME: &'static str = "bid";

    #[inline(always)]
    fn ranks_before(lhs: Px, rhs: Px) -> bool {
        lhs > rhs
    }
}

impl SideOrder for Asks {
    const NAME: &'static str = "ask";

    #[inline(always)]
    fn ranks_before(lhs: Px, rhs: Px) -> bool {
        lhs < rhs
    }
}

/// One sorted, bounded side of a price book
#[derive(Debug)]
pub struct BookSide<D: SideOrder> {
    /// Popped best levels in the current generation
    offset: u8,
    /// Live level count
    len: u8,
    levels: [PriceLevel; SIDE_MAX_SIZE],
    _dir: PhantomData<D>,
}

/// Buy side, best (highest) price first
pub type BidSide = BookSide<Bids>;

/// Sell side, best (lowest) price first
pub type AskSide = BookSide<Asks>;

impl<D: SideOrder> BookSide<D> {
    pub const fn new() -> Self {
        Self {
            offset: 0,
            len: 0,
            levels: [PriceLevel::new(0, 0, 0); SIDE_MAX_SIZE],
            _dir: PhantomData,
        }
    }

    /// Live level count
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live levels, best-ranked first
    #[inline]
    pub fn as_slice(&self) -> &[PriceLevel] {
        let start = self.offset as usize;
        &self.levels[start..start + self.len as usize]
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, PriceLevel> {
        self.as_slice().iter()
    }

    /// Best-ranked level
    pub fn top(&self) -> Result<&PriceLevel, BookAccessError> {
        if self.is_empty() {
            return Err(BookAccessError::Empty);
        }
        Ok(&self.levels[self.offset as usize])
    }

    /// 0-based rank access, best first
    pub fn level(&self, index: usize) -> Result<&PriceLevel, BookAccessError> {
        if index >= self.len as usize {
            return Err(BookAccessError::LevelIndexOutOfRange {
                index,
                size: self.len as usize,
            });
        }
        Ok(&self.levels[self.offset as usize + index])
    }

    /// Remove and return the best level by advancing the base offset.
    ///
    /// O(1): the remaining levels are not moved. Inserts are illegal
    /// until the side is cleared or copied (copying resets the offset).
    pub fn pop_top(&mut self) -> Result<PriceLevel, BookAccessError> {
        if self.is_empty() {
            return Err(BookAccessError::Empty);
        }
        let top = self.levels[self.offset as usize];
        self.offset += 1;
        self.len -= 1;
        debug_assert!(self.offset as usize + self.len as usize <= SIDE_MAX_SIZE);
        Ok(top)
    }

    /// Strict unique-price insert.
    ///
    /// Fails with [`BookInsertError::OutOfSlots`] when the side is
    /// full and with [`BookInsertError::DuplicatePrice`] when a level
    /// at this price already exists. Both checks run before any level
    /// is moved, so a failed add leaves the side untouched.
    pub fn add(&mut self, time: Timestamp, price: Px, qty: Qty) -> Result<(), BookInsertError> {
        debug_assert_eq!(self.offset, 0, "insert into a popped-from side");

        let len = self.len as usize;
        if len >= SIDE_MAX_SIZE {
            return Err(BookInsertError::OutOfSlots {
                capacity: SIDE_MAX_SIZE,
            });
        }

        let pos = self.insertion_point(price);
        if pos < len && self.levels[pos].price() == price {
            return Err(BookInsertError::DuplicatePrice { price });
        }

        self.levels.copy_within(pos..len, pos + 1);
        self.levels[pos] = PriceLevel::new(time, price, qty);
        self.len += 1;
        Ok(())
    }

    /// Merge-or-insert.
    ///
    /// - Price exists: quantity is accumulated into that level and its
    ///   time advanced. Equal price always means "same level"; this
    ///   holds even when the matching level is the current worst on a
    ///   full side.
    /// - New price, free slot: inserted at its sorted position.
    /// - New price, full side, ranks worse than every retained level:
    ///   dropped, returns `false`. This is the depth-of-book cutoff,
    ///   not an error.
    /// - New price, full side, ranks better than the current worst:
    ///   the worst level is evicted and the new one inserted in order.
    ///
    /// Returns `true` whenever the update was applied to a retained
    /// level.
    pub fn update(&mut self, time: Timestamp, price: Px, qty: Qty) -> bool {
        debug_assert_eq!(self.offset, 0, "update of a popped-from side");

        let len = self.len as usize;
        let pos = self.insertion_point(price);

        if pos < len && self.levels[pos].price() == price {
            let level = &mut self.levels[pos];
            level.add_qty(qty);
            level.update_time(time);
            return true;
        }

        if len >= SIDE_MAX_SIZE {
            if pos >= len {
                // Below our retained depth: ignore.
                return false;
            }
            // Evict the tail, shift [pos, len-1) down one slot.
            self.levels.copy_within(pos..len - 1, pos + 1);
            self.levels[pos] = PriceLevel::new(time, price, qty);
            return true;
        }

        self.levels.copy_within(pos..len, pos + 1);
        self.levels[pos] = PriceLevel::new(time, price, qty);
        self.len += 1;
        true
    }

    /// Reset to empty. The backing array is retained.
    #[inline]
    pub fn clear(&mut self) {
        self.offset = 0;
        self.len = 0;
    }

    /// First live index whose level does not rank before `price`.
    ///
    /// With the uniqueness invariant this is both the insertion point
    /// for a new price and the location of an existing exact match.
    #[inline]
    fn insertion_point(&self, price: Px) -> usize {
        debug_assert_eq!(self.offset, 0);
        self.levels[..self.len as usize].partition_point(|lvl| D::ranks_before(lvl.price(), price))
    }
}

impl<D: SideOrder> Default for BookSide<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: SideOrder> Clone for BookSide<D> {
    /// Value copy of the live `[offset, offset + len)` range into a
    /// fresh arena starting at offset 0.
    fn clone(&self) -> Self {
        let mut levels = [PriceLevel::default(); SIDE_MAX_SIZE];
        let live = self.as_slice();
        levels[..live.len()].copy_from_slice(live);
        Self {
            offset: 0,
            len: self.len,
            levels,
            _dir: PhantomData,
        }
    }
}

impl<D: SideOrder> PartialEq for BookSide<D> {
    /// Observable content only: offset normalization does not affect
    /// equality.
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<D: SideOrder> Eq for BookSide<D> {}

impl<'a, D: SideOrder> IntoIterator for &'a BookSide<D> {
    type Item = &'a PriceLevel;
    type IntoIter = std::slice::Iter<'a, PriceLevel>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
