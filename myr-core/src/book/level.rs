//! One aggregated price level of a book side

use std::ops::AddAssign;

use crate::core::types::{Px, Qty, Timestamp};

/// A `(time, price, quantity)` tuple
///
/// The price is fixed for the level's lifetime; updates at the same
/// price accumulate quantity and advance the timestamp. Within one
/// book side no two levels ever share a price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceLevel {
    time: Timestamp,
    price: Px,
    qty: Qty,
}

impl PriceLevel {
    #[inline]
    pub const fn new(time: Timestamp, price: Px, qty: Qty) -> Self {
        Self { time, price, qty }
    }

    #[inline(always)]
    pub const fn time(&self) -> Timestamp {
        self.time
    }

    #[inline(always)]
    pub const fn price(&self) -> Px {
        self.price
    }

    #[inline(always)]
    pub const fn qty(&self) -> Qty {
        self.qty
    }

    /// Accumulate quantity. The price is untouched: merging an
    /// incoming update into an existing slot never moves the slot.
    #[inline]
    pub fn add_qty(&mut self, qty: Qty) {
        self.qty += qty;
    }

    /// Advance the timestamp to `max(current, time)`.
    ///
    /// An unset timestamp (`0`) adopts the new one unconditionally;
    /// the stored time never regresses.
    #[inline]
    pub fn update_time(&mut self, time: Timestamp) {
        if time > self.time {
            self.time = time;
        }
    }
}

impl AddAssign<Qty> for PriceLevel {
    #[inline]
    fn add_assign(&mut self, qty: Qty) {
        self.add_qty(qty);
    }
}

impl AddAssign<&PriceLevel> for PriceLevel {
    /// Merge another level's quantity into this one. Price and time of
    /// `self` are untouched.
    #[inline]
    fn add_assign(&mut self, rhs: &PriceLevel) {
        self.add_qty(rhs.qty);
    }
}
