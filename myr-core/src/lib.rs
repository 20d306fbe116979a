//! Myr Core - Order Book and Position Engine
//!
//! Building blocks for a passive-first trading strategy:
//!
//! - a bounded two-sided price book with fixed per-side capacity and
//!   allocation-free updates, published whole as immutable snapshots
//! - a position lifecycle driven by intention transitions
//!   (open passively, escalate aggressively, hold, close), reconciled
//!   against live order state after every gateway callback
//! - protective stop algorithms (stop-loss, trailing stop,
//!   take-profit) racing to claim the close of a position, first
//!   signal wins
//!
//! ## Core Modules
//! - `core`: value types (fixed-point prices, ids, enums) and errors
//! - `book`: price levels, book sides, snapshot publication, registry
//! - `position`: the intention state machine and the gateway seam
//! - `stops`: stop-loss / trailing-stop / take-profit algorithms
//! - `settings`: deserializable, validated configuration
//! - `testing`: deterministic gateway double for lifecycle tests

pub mod book;
pub mod core;
pub mod position;
pub mod settings;
pub mod stops;
pub mod testing;
pub mod utils;

pub use crate::core::{
    fixed_point, Amount, BookAccessError, BookInsertError, GatewayError, OrderId, OrderStatus,
    PositionError, PositionSide, Px, Qty, SecurityId, SettingsError, Side, TimeInForce, Timestamp,
};

pub use book::{BookCell, BookRegistry, PriceBook, PriceLevel, SIDE_MAX_SIZE};
pub use position::{CloseReason, Intention, OrderGateway, OrderRequest, OrderUpdate, Position};
pub use stops::{StopAlgo, StopLoss, TakeProfit, TrailingStop};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::book::{BookCell, BookRegistry, PriceBook, PriceLevel, SIDE_MAX_SIZE};
    pub use crate::core::{
        fixed_point, Amount, OrderId, OrderStatus, PositionSide, Px, Qty, SecurityId, Side,
        TimeInForce, Timestamp,
    };
    pub use crate::position::{
        CloseReason, Intention, OrderGateway, OrderRequest, OrderUpdate, Position, TradeInfo,
    };
    pub use crate::stops::{
        StopAlgo, StopLoss, StopLossParams, TakeProfit, TakeProfitParams, TrailingStop,
        TrailingStopParams,
    };
    pub use crate::utils::init_logger;
}
