//! Trailing stop on planned P&L
//!
//! Arms once profit reaches the activation threshold, then follows the
//! profit high-water mark down. The signal fires when profit falls
//! back to the closing threshold. A one-shot low-water mark suppresses
//! duplicate evaluation while profit is not making new lows.

use tracing::debug;

use crate::core::errors::{PositionError, SettingsError};
use crate::core::types::{fixed_point, Amount};
use crate::position::gateway::OrderGateway;
use crate::position::intention::CloseReason;
use crate::position::Position;

use super::{on_hit, StopAlgo};

/// Validated trailing-stop configuration
///
/// Both thresholds are profit per lot. Activation must not be below
/// closing, or the stop would fire the moment it arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingStopParams {
    profit_per_lot_to_activate: Amount,
    profit_per_lot_to_close: Amount,
}

impl TrailingStopParams {
    pub fn new(
        profit_per_lot_to_activate: Amount,
        profit_per_lot_to_close: Amount,
    ) -> Result<Self, SettingsError> {
        if profit_per_lot_to_activate < 0 {
            return Err(SettingsError::NegativeThreshold {
                name: "profit per lot to activate",
                value: fixed_point::to_f64(profit_per_lot_to_activate),
            });
        }
        if profit_per_lot_to_close < 0 {
            return Err(SettingsError::NegativeThreshold {
                name: "profit per lot to close",
                value: fixed_point::to_f64(profit_per_lot_to_close),
            });
        }
        if profit_per_lot_to_activate < profit_per_lot_to_close {
            return Err(SettingsError::TrailingThresholdOrder {
                activate: fixed_point::to_f64(profit_per_lot_to_activate),
                close: fixed_point::to_f64(profit_per_lot_to_close),
            });
        }
        Ok(Self {
            profit_per_lot_to_activate,
            profit_per_lot_to_close,
        })
    }

    #[inline(always)]
    pub const fn profit_per_lot_to_activate(&self) -> Amount {
        self.profit_per_lot_to_activate
    }

    #[inline(always)]
    pub const fn profit_per_lot_to_close(&self) -> Amount {
        self.profit_per_lot_to_close
    }
}

#[derive(Debug)]
pub struct TrailingStop {
    params: TrailingStopParams,
    is_activated: bool,
    /// Profit high-water mark while accumulating
    max_profit: Option<Amount>,
    /// Profit low-water mark since the last evaluation
    min_profit: Option<Amount>,
}

impl TrailingStop {
    pub fn new(params: TrailingStopParams) -> Self {
        Self {
            params,
            is_activated: false,
            max_profit: None,
            min_profit: None,
        }
    }

    #[inline(always)]
    pub fn is_activated(&self) -> bool {
        self.is_activated
    }

    fn activate(&mut self, position: &Position, planned_pnl: Amount) -> bool {
        if self.is_activated {
            return true;
        }

        let profit_to_activate =
            fixed_point::mul(self.params.profit_per_lot_to_activate, position.opened_qty());
        self.is_activated = planned_pnl >= profit_to_activate;

        // Only a new profit high moves the mark.
        if let Some(max_profit) = self.max_profit {
            if planned_pnl <= max_profit {
                return self.is_activated;
            }
        }

        if self.is_activated {
            debug!(
                security = %position.security(),
                planned_pnl = fixed_point::to_f64(planned_pnl),
                profit_to_activate = fixed_point::to_f64(profit_to_activate),
                "trailing stop armed"
            );
        }

        self.max_profit = Some(planned_pnl);
        self.is_activated
    }

    fn check_signal(&mut self, position: &Position) -> Result<bool, PositionError> {
        debug_assert!(position.close_reason() != CloseReason::TrailingStop);

        let planned_pnl = position.planned_pnl()?;
        if !self.activate(position, planned_pnl) {
            debug_assert!(self.min_profit.is_none());
            return Ok(false);
        }

        let profit_to_close =
            fixed_point::mul(self.params.profit_per_lot_to_close, position.opened_qty());

        // Not a new low since the last evaluation.
        if let Some(min_profit) = self.min_profit {
            if planned_pnl >= min_profit {
                return Ok(false);
            }
        }

        let is_signal = planned_pnl <= profit_to_close;
        self.min_profit = Some(planned_pnl);
        Ok(is_signal)
    }
}

impl StopAlgo for TrailingStop {
    fn name(&self) -> &'static str {
        "trailing-stop"
    }

    fn run(
        &mut self,
        position: &mut Position,
        gateway: &mut dyn OrderGateway,
    ) -> Result<(), PositionError> {
        if !position.is_opened() || position.is_completed() {
            debug_assert!(position.is_opened() || !self.is_activated);
            return Ok(());
        }

        match position.close_reason() {
            // A stop-loss in progress outranks us.
            CloseReason::StopLoss => return Ok(()),
            // Our own earlier signal: keep driving the close.
            CloseReason::TrailingStop => {
                debug_assert!(self.is_activated);
            }
            _ => {
                if !self.check_signal(position)? {
                    return Ok(());
                }
            }
        }

        on_hit(self.name(), CloseReason::TrailingStop, position, gateway)
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
        (position, gw, cell)
    }

    fn stop(activate: f64, close: f64) -> TrailingStop {
        TrailingStop::new(
            TrailingStopParams::new(fixed_point::from_f64(activate), fixed_point::from_f64(close))
                .unwrap(),
        )
    }

    #[test]
    fn test_params_reject_activate_below_close() {
        assert!(matches!(
            TrailingStopParams::new(SCALE, 2 * SCALE),
            Err(SettingsError::TrailingThresholdOrder { .. })
        ));
        assert!(TrailingStopParams::new(2 * SCALE, SCALE).is_ok());
        assert!(TrailingStopParams::new(SCALE, SCALE).is_ok());
    }

    #[test]
    fn test_params_reject_negative() {
        assert!(matches!(
            TrailingStopParams::new(-SCALE, -2 * SCALE),
            Err(SettingsError::NegativeThreshold { .. })
        ));
    }

    #[test]
    fn test_does_not_arm_below_activation() {
        let (mut position, mut gw, cell) = opened_long();
        let mut trailing = stop(3.0, 1.0);

        // +1 profit, activation needs +3.
        publish(&cell, 2, 101.0, 102.0);
        trailing.run(&mut position, &mut gw).unwrap();
        assert!(!trailing.is_activated());

        // Falling back through the close threshold while unarmed does
        // nothing.
        publish(&cell, 3, 100.5, 101.5);
        trailing.run(&mut position, &mut gw).unwrap();
        assert!(!trailing.is_activated());
        assert_eq!(position.close_reason(), CloseReason::None);
        assert_eq!(position.intention(), Intention::Hold);
    }

    #[test]
    fn test_arms_then_fires_on_retrace() {
        let (mut position, mut gw, cell) = opened_long();
        let mut trailing = stop(3.0, 1.0);

        // +3 arms the stop but profit is above the close threshold.
        publish(&cell, 2, 103.0, 104.0);
        trailing.run(&mut position, &mut gw).unwrap();
        assert!(trailing.is_activated());
        assert_eq!(position.close_reason(), CloseReason::None);

        // Retrace to +2: still above close threshold.
        publish(&cell, 3, 102.0, 103.0);
        trailing.run(&mut position, &mut gw).unwrap();
        assert_eq!(position.close_reason(), CloseReason::None);

        // Retrace to +0.5: at or below close threshold, signal.
        publish(&cell, 4, 100.5, 101.5);
        trailing.run(&mut position, &mut gw).unwrap();
        assert_eq!(position.close_reason(), CloseReason::TrailingStop);
        assert_eq!(position.intention(), Intention::CloseAggressive);
        assert!(gw.last_request().unwrap().is_aggressive());
    }

    #[test]
    fn test_stays_armed_once_activated() {
        let (mut position, mut gw, cell) = opened_long();
        let mut trailing = stop(3.0, 0.0);

        publish(&cell, 2, 103.0, 104.0);
        trailing.run(&mut position, &mut gw).unwrap();
        assert!(trailing.is_activated());

        // Profit dips below the activation threshold but not to the
        // close threshold; the stop stays armed.
        publish(&cell, 3, 101.0, 102.0);
        trailing.run(&mut position, &mut gw).unwrap();
        assert!(trailing.is_activated());
        assert_eq!(position.close_reason(), CloseReason::None);
    }

    #[test]
    fn test_defers_to_stop_loss_in_progress() {
        let (mut position, mut gw, cell) = opened_long();
        let mut trailing = stop(1.0, 0.0);

        publish(&cell, 2, 103.0, 104.0);
        trailing.run(&mut position, &mut gw).unwrap();
        assert!(trailing.is_activated());

        position.try_set_close_reason(CloseReason::StopLoss);
        let sent_before = gw.sent_count();

        publish(&cell, 3, 99.0, 100.0);
        trailing.run(&mut position, &mut gw).unwrap();

        assert_eq!(position.close_reason(), CloseReason::StopLoss);
        assert_eq!(gw.sent_count(), sent_before);
    }

    #[test]
    fn test_low_water_mark_suppresses_repeat_evaluation() {
        let (mut position, mut gw, cell) = opened_long();
        let mut trailing = stop(3.0, 1.0);

        publish(&cell, 2, 103.0, 104.0);
        trailing.run(&mut position, &mut gw).unwrap();

        // First evaluation at +2 records the low-water mark.
        publish(&cell, 3, 102.0, 103.0);
        trailing.run(&mut position, &mut gw).unwrap();
        assert_eq!(trailing.min_profit, Some(fixed_point::from_f64(2.0)));

        // Bouncing back up does not move the mark.
        publish(&cell, 4, 102.5, 103.5);
        trailing.run(&mut position, &mut gw).unwrap();
        assert_eq!(trailing.min_profit, Some(fixed_point::from_f64(2.0)));
    }
}
