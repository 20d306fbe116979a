//! Stop-loss on planned P&L

use tracing::debug;

use crate::core::errors::{PositionError, SettingsError};
use crate::core::types::{fixed_point, Amount};
use crate::position::gateway::OrderGateway;
use crate::position::intention::CloseReason;
use crate::position::Position;

use super::{on_hit, StopAlgo};

/// Validated stop-loss configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopLossParams {
    max_loss_per_lot: Amount,
}

impl StopLossParams {
    pub fn new(max_loss_per_lot: Amount) -> Result<Self, SettingsError> {
        if max_loss_per_lot < 0 {
            return Err(SettingsError::NegativeThreshold {
                name: "max loss per lot",
                value: fixed_point::to_f64(max_loss_per_lot),
            });
        }
        Ok(Self { max_loss_per_lot })
    }

    #[inline(always)]
    pub const fn max_loss_per_lot(&self) -> Amount {
        self.max_loss_per_lot
    }
}

/// Closes the position once the unrealized loss reaches
/// `max_loss_per_lot * opened_qty`
#[derive(Debug)]
pub struct StopLoss {
    params: StopLossParams,
}

impl StopLoss {
    pub fn new(params: StopLossParams) -> Self {
        Self { params }
    }

    fn activate(&self, position: &Position) -> Result<bool, PositionError> {
        let max_loss = -fixed_point::mul(self.params.max_loss_per_lot, position.opened_qty());
        let planned_pnl = position.planned_pnl()?;
        if max_loss < planned_pnl {
            return Ok(false);
        }
        debug!(
            security = %position.security(),
            planned_pnl = fixed_point::to_f64(planned_pnl),
            max_loss = fixed_point::to_f64(max_loss),
            "stop-loss threshold reached"
        );
        Ok(true)
    }
}

impl StopAlgo for StopLoss {
    fn name(&self) -> &'static str {
        "stop-loss"
    }

    fn run(
        &mut self,
        position: &mut Position,
        gateway: &mut dyn OrderGateway,
    ) -> Result<(), PositionError> {
        if !position.is_opened() || position.is_completed() {
            return Ok(());
        }

        match position.close_reason() {
            // Our own earlier signal: keep driving the close.
            CloseReason::StopLoss => {}
            // A trailing stop in progress outranks a loss check.
            CloseReason::TrailingStop => return Ok(()),
            _ => {
                if !self.activate(position)? {
                    return Ok(());
                }
            }
        }

        on_hit(self.name(), CloseReason::StopLoss, position, gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::price_book::PriceBook;
    use crate::book::publish::BookCell;
    use crate::core::fixed_point::SCALE;
    use crate::core::types::{PositionSide, SecurityId, Timestamp};
    use crate::position::Intention;
    use crate::testing::SimGateway;
    use std::sync::Arc;

    fn publish(cell: &BookCell, time: Timestamp, bid: f64, ask: f64) {
        let mut book = PriceBook::with_time(time);
        book.bid_mut()
            .add(time, fixed_point::from_f64(bid), SCALE)
            .unwrap();
        book.ask_mut()
            .add(time, fixed_point::from_f64(ask), SCALE)
            .unwrap();
        cell.publish(book);
    }

    /// Long one lot opened at 100.
    fn opened_long() -> (Position, SimGateway, Arc<BookCell>) {
        let cell = Arc::new(BookCell::new());
        publish(&cell, 1, 100.0, 101.0);
        let mut position =
            Position::new(SecurityId(1), PositionSide::Long, SCALE, cell.clone(), 1);
        let mut gw = SimGateway::new();
        position.sync(&mut gw).unwrap();
        let id = gw.last_order_id().unwrap();
        position
            .on_order_status(gw.filled(id, 100 * SCALE), &mut gw)
            .unwrap();
        assert_eq!(position.intention(), Intention::Hold);
        (position, gw, cell)
    }

    #[test]
    fn test_params_reject_negative_threshold() {
        assert!(matches!(
            StopLossParams::new(-SCALE),
            Err(SettingsError::NegativeThreshold { .. })
        ));
        assert!(StopLossParams::new(0).is_ok());
    }

    #[test]
    fn test_no_signal_above_threshold() {
        let (mut position, mut gw, cell) = opened_long();
        let mut stop = StopLoss::new(StopLossParams::new(2 * SCALE).unwrap());

        // Down 1 per lot, threshold is 2.
        publish(&cell, 2, 99.0, 100.0);
        stop.run(&mut position, &mut gw).unwrap();

        assert_eq!(position.intention(), Intention::Hold);
        assert_eq!(position.close_reason(), CloseReason::None);
    }

    #[test]
    fn test_signal_at_threshold_escalates() {
        let (mut position, mut gw, cell) = opened_long();
        let mut stop = StopLoss::new(StopLossParams::new(2 * SCALE).unwrap());

        publish(&cell, 2, 98.0, 99.0);
        stop.run(&mut position, &mut gw).unwrap();

        assert_eq!(position.close_reason(), CloseReason::StopLoss);
        assert_eq!(position.intention(), Intention::CloseAggressive);
        let request = gw.last_request().unwrap();
        assert!(request.is_aggressive());
    }

    #[test]
    fn test_defers_to_trailing_stop_in_progress() {
        let (mut position, mut gw, cell) = opened_long();
        let mut stop = StopLoss::new(StopLossParams::new(SCALE).unwrap());

        position.try_set_close_reason(CloseReason::TrailingStop);
        let sent_before = gw.sent_count();

        // Deep under water, but the trailing stop owns the close.
        publish(&cell, 2, 90.0, 91.0);
        stop.run(&mut position, &mut gw).unwrap();

        assert_eq!(position.close_reason(), CloseReason::TrailingStop);
        assert_eq!(gw.sent_count(), sent_before);
    }

    #[test]
    fn test_rerun_after_own_signal_is_idempotent() {
        let (mut position, mut gw, cell) = opened_long();
        let mut stop = StopLoss::new(StopLossParams::new(SCALE).unwrap());

        publish(&cell, 2, 98.0, 99.0);
        stop.run(&mut position, &mut gw).unwrap();
        let sent_after_signal = gw.sent_count();

        stop.run(&mut position, &mut gw).unwrap();
        stop.run(&mut position, &mut gw).unwrap();

        assert_eq!(gw.sent_count(), sent_after_signal);
        assert_eq!(position.intention(), Intention::CloseAggressive);
    }

    #[test]
    fn test_ignores_unopened_position() {
        let cell = Arc::new(BookCell::new());
        publish(&cell, 1, 90.0, 91.0);
        let mut position = Position::new(SecurityId(1), PositionSide::Long, SCALE, cell, 1);
        let mut gw = SimGateway::new();
        let mut stop = StopLoss::new(StopLossParams::new(SCALE).unwrap());

        stop.run(&mut position, &mut gw).unwrap();
        assert_eq!(position.close_reason(), CloseReason::None);
        assert_eq!(gw.sent_count(), 0);
    }
}
