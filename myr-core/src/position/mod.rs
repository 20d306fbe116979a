//! Position lifecycle: intentions, orders, and gateway callbacks
//!
//! A [`Position`] is driven by [`Intention`] transitions from the
//! strategy. Each transition and each [`gateway::OrderUpdate`] runs
//! the reconciliation in [`Position::sync`], which sends, cancels, or
//! faults as the intention requires. Order routing goes through the
//! [`gateway::OrderGateway`] seam so the machine is broker-agnostic.

pub mod gateway;
pub mod intention;
pub mod position;

pub use gateway::{OrderGateway, OrderRequest, OrderUpdate, TradeInfo};
pub use intention::{CloseReason, Intention};
pub use position::Position;
