//! Core value types for the book/position engine
//!
//! All numeric market values are i64 fixed-point with 9 decimal places.
//! Fixed-point keeps price equality exact (the book locates levels by
//! exact price match after the caller has rounded to tick size) and
//! keeps arithmetic allocation-free in the update hot path.

use std::fmt;

/// Price in fixed-point (9 decimals).
pub type Px = i64;

/// Quantity in fixed-point (9 decimals).
pub type Qty = i64;

/// Money amount (price * quantity) in fixed-point (9 decimals).
pub type Amount = i64;

/// Nanoseconds since the Unix epoch. `0` means "unset".
pub type Timestamp = u64;

/// Fixed-point arithmetic helpers (9 decimal places)
pub mod fixed_point {
    use super::{Amount, Timestamp};

    /// Scale factor for 9 decimal places
    pub const SCALE: i64 = 1_000_000_000;

    /// Convert f64 to fixed-point i64
    #[inline(always)]
    pub fn from_f64(value: f64) -> i64 {
        (value * SCALE as f64) as i64
    }

    /// Convert fixed-point i64 to f64
    #[inline(always)]
    pub fn to_f64(value: i64) -> f64 {
        value as f64 / SCALE as f64
    }

    /// Multiply two fixed-point values without overflowing i64 midway.
    #[inline(always)]
    pub fn mul(lhs: i64, rhs: i64) -> Amount {
        ((lhs as i128 * rhs as i128) / SCALE as i128) as i64
    }

    /// Divide two fixed-point values. Caller guarantees `rhs != 0`.
    #[inline(always)]
    pub fn div(lhs: i64, rhs: i64) -> i64 {
        ((lhs as i128 * SCALE as i128) / rhs as i128) as i64
    }

    /// Current wall-clock time as a `Timestamp`.
    #[inline]
    pub fn now_ns() -> Timestamp {
        use std::time::SystemTime;
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

/// Instrument identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SecurityId(pub u64);

impl fmt::Display for SecurityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sec:{}", self.0)
    }
}

/// Unique identifier for an order
///
/// u128 instead of String for zero-allocation copy semantics.
/// Layout: [timestamp:64][random:32][counter:32], unique across
/// threads and process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct OrderId(pub u128);

impl OrderId {
    #[inline(always)]
    pub const fn new(id: u128) -> Self {
        Self(id)
    }

    /// Generate a fresh OrderId
    #[inline]
    pub fn generate() -> Self {
        use rand::Rng;

        thread_local! {
            static COUNTER: std::cell::Cell<u32> = const { std::cell::Cell::new(0) };
        }

        let timestamp = fixed_point::now_ns();
        let random_part = rand::thread_rng().gen::<u32>();
        let counter = COUNTER.with(|c| {
            let val = c.get();
            c.set(val.wrapping_add(1));
            val
        });

        Self(((timestamp as u128) << 64) | ((random_part as u128) << 32) | counter as u128)
    }

    #[inline(always)]
    pub const fn as_u128(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl From<u128> for OrderId {
    #[inline(always)]
    fn from(id: u128) -> Self {
        Self(id)
    }
}

/// Order side (Buy or Sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    /// The opposite side
    #[inline(always)]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Direction of a position (long or short)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PositionSide {
    Long = 0,
    Short = 1,
}

impl PositionSide {
    /// Side of the order that opens this position
    #[inline(always)]
    pub const fn open_order_side(self) -> Side {
        match self {
            PositionSide::Long => Side::Buy,
            PositionSide::Short => Side::Sell,
        }
    }

    /// Side of the order that closes this position
    #[inline(always)]
    pub const fn close_order_side(self) -> Side {
        self.open_order_side().opposite()
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "long"),
            PositionSide::Short => write!(f, "short"),
        }
    }
}

/// Time-in-force for an order request
///
/// Passive (resting) orders go out as `Day`/`Gtc`; aggressive
/// (marketable) orders go out as `Ioc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimeInForce {
    Day = 0,
    Gtc = 1,
    Ioc = 2,
}

/// Normalized order status as reported by the routing adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OrderStatus {
    Pending = 0,
    Open = 1,
    PartiallyFilled = 2,
    Filled = 3,
    Cancelled = 4,
    Rejected = 5,
}

impl OrderStatus {
    /// Terminal states: the order can no longer trade
    #[inline(always)]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}
