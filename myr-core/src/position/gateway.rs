//! Order routing contract
//!
//! The position machine knows nothing about FIX tags or broker ticker
//! ids. Outbound it emits an [`OrderRequest`]; inbound it consumes the
//! normalized [`OrderUpdate`] tuple the adapter builds from its status
//! callbacks. Order types are abstracted to "passive" (a resting limit
//! at an explicit price) versus "aggressive" (marketable, no price).

use crate::core::errors::GatewayError;
use crate::core::types::{OrderId, OrderStatus, Px, Qty, SecurityId, Side, TimeInForce, Timestamp};

/// Outbound order intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRequest {
    pub security: SecurityId,
    pub side: Side,
    pub qty: Qty,
    /// Resting limit price; `None` sends the order marketable.
    pub price: Option<Px>,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    #[inline(always)]
    pub const fn is_aggressive(&self) -> bool {
        self.price.is_none()
    }
}

/// One execution reported inside a status callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeInfo {
    pub price: Px,
    pub qty: Qty,
    pub time: Timestamp,
}

/// Normalized order-status callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub broker_order_id: u64,
    pub status: OrderStatus,
    pub remaining_qty: Qty,
    pub trade: Option<TradeInfo>,
}

/// Order routing adapter seam
///
/// Implementations wrap a broker session. The core only requires that
/// `send` hands back the id it will use in later [`OrderUpdate`]s and
/// that `cancel` is idempotent for unknown ids.
pub trait OrderGateway: Send {
    fn send(&mut self, request: OrderRequest) -> Result<OrderId, GatewayError>;

    fn cancel(&mut self, security: SecurityId, order_id: OrderId) -> Result<(), GatewayError>;
}
