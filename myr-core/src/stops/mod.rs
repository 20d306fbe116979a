//! Protective stop algorithms
//!
//! Each algorithm watches one opened position and, on signal, claims
//! the close by compare-and-setting the position's close reason. The
//! first claim wins; losers stand down permanently for that position.
//! The winner escalates the position to `CloseAggressive` and keeps
//! re-driving it on every subsequent run until the close completes.
//!
//! All three algorithms work on planned P&L (unrealized profit of the
//! open quantity against the current book top), not raw price, so one
//! threshold scale covers every instrument.

pub mod stop_loss;
pub mod take_profit;
pub mod trailing_stop;

pub use stop_loss::{StopLoss, StopLossParams};
pub use take_profit::{TakeProfit, TakeProfitParams};
pub use trailing_stop::{TrailingStop, TrailingStopParams};

use tracing::info;

use crate::core::errors::PositionError;
use crate::position::gateway::OrderGateway;
use crate::position::intention::{CloseReason, Intention};
use crate::position::Position;

/// A stop algorithm attached to a position
///
/// `run` is called after every book update and order event for the
/// watched position. It must be idempotent: a signal that already
/// claimed the close re-drives the escalation, never doubles it.
pub trait StopAlgo: Send {
    fn name(&self) -> &'static str;

    fn run(
        &mut self,
        position: &mut Position,
        gateway: &mut dyn OrderGateway,
    ) -> Result<(), PositionError>;
}

/// Claim the close for `reason` and escalate.
///
/// Loses silently if another algorithm owns the close. Re-entry by the
/// owner (reason already set to `reason`) re-syncs the position so a
/// stuck close keeps moving.
pub(crate) fn on_hit(
    name: &'static str,
    reason: CloseReason,
    position: &mut Position,
    gateway: &mut dyn OrderGateway,
) -> Result<(), PositionError> {
    if !position.try_set_close_reason(reason) {
        return Ok(());
    }

    if position.intention() == Intention::CloseAggressive {
        return position.sync(gateway);
    }

    info!(
        algo = name,
        security = %position.security(),
        %reason,
        planned_pnl = position.planned_pnl().map(crate::core::fixed_point::to_f64).ok(),
        "stop hit, closing position"
    );
    position.set_intention(Intention::CloseAggressive, gateway)
}
