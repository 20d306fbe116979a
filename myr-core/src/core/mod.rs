//! Core value types and error taxonomy
//!
//! - fixed-point numeric model (`Px`, `Qty`, `Amount`, 9 decimals)
//! - identifiers (`SecurityId`, `OrderId`)
//! - order/position enums (`Side`, `PositionSide`, `TimeInForce`,
//!   `OrderStatus`)
//! - the two-kind book error split plus position and settings errors

pub mod errors;
pub mod types;

pub use errors::{
    BookAccessError, BookInsertError, GatewayError, PositionError, SettingsError,
};
pub use types::{
    fixed_point, Amount, OrderId, OrderStatus, PositionSide, Px, Qty, SecurityId, Side,
    TimeInForce, Timestamp,
};
