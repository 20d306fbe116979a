//! Domain-specific error types for the book/position core
//!
//! The book keeps two distinct error kinds on purpose:
//!
//! - [`BookAccessError`] marks a caller bug (reading a level that was
//!   never checked against `len()`); it must propagate, never be
//!   swallowed.
//! - [`BookInsertError`] marks an expected, data-dependent rejection
//!   (duplicate price, no free slot); the feed adapter logs it and
//!   drops that single update.
//!
//! Collapsing the two would force callers to treat defects and normal
//! rejections the same way.

use thiserror::Error;

use super::types::{OrderId, Px, SecurityId};

/// Out-of-range access on a book side, a caller bug
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BookAccessError {
    /// Pop or top on a side with no live levels
    #[error("price book side is empty")]
    Empty,

    /// Rank index at or beyond the live level count
    #[error("price book level index {index} is out of range (size {size})")]
    LevelIndexOutOfRange { index: usize, size: usize },
}

/// Rejected strict insert, expected and recoverable
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum BookInsertError {
    /// All fixed slots are occupied
    #[error("price book side is out of price level slots (capacity {capacity})")]
    OutOfSlots { capacity: usize },

    /// A level at this price already exists; use `update` to merge
    #[error("price level {price} is not unique on this side")]
    DuplicatePrice { price: Px },
}

/// Order-routing failures reported by the gateway adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The adapter refused the request
    #[error("order request rejected by gateway: {reason}")]
    Rejected { reason: String },

    /// The adapter lost its session with the trading system
    #[error("gateway is disconnected from the trading system")]
    Disconnected,
}

/// Position lifecycle and protocol-desynchronization faults
#[derive(Debug, Error)]
pub enum PositionError {
    /// An order we believe is outstanding is gone from the trading
    /// system without a fill or a cancel we requested. Bookkeeping and
    /// the broker's order book disagree; retrying risks duplicate
    /// orders, so this is fatal for the position.
    #[error("{security}: order {order_id} canceled by trading system without request")]
    OrderVanished {
        security: SecurityId,
        order_id: OrderId,
    },

    /// Close requested on a position that has not finished opening
    #[error("{security}: position is not opened")]
    NotOpened { security: SecurityId },

    /// The opening order was rejected; the position cannot be opened
    #[error("{security}: failed to open position")]
    OpenFailed { security: SecurityId },

    /// The closing order was rejected; the position cannot be closed
    #[error("{security}: failed to close position")]
    CloseFailed { security: SecurityId },

    /// Intention re-entered its own state or re-entered OpenPassive
    #[error("{security}: invalid intention transition to {intention}")]
    InvalidTransition {
        security: SecurityId,
        intention: &'static str,
    },

    /// Price needed from the published book but the side is empty
    #[error("{security}: no published book level to price the order")]
    NoPublishedBook { security: SecurityId },

    /// The routing adapter failed a send or cancel
    #[error("gateway failure: {0}")]
    Gateway(#[from] GatewayError),
}

/// Construction-time configuration validation failures
///
/// Raised before a strategy ever runs, so a misconfigured stop can
/// never watch a live position.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error(
        "trailing stop activation threshold {activate} must be >= closing threshold {close}"
    )]
    TrailingThresholdOrder { activate: f64, close: f64 },

    #[error("take profit closing share {share} must be <= 1.0")]
    TakeProfitShareRange { share: f64 },

    #[error("{name} must not be negative (got {value})")]
    NegativeThreshold { name: &'static str, value: f64 },

    #[error("position quantity must be positive (got {qty})")]
    NonPositiveQty { qty: f64 },
}
