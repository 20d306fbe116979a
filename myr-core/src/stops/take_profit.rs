//! Take-profit with a trailing exit
//!
//! Arms once profit reaches the activation threshold, then trails the
//! profit high-water mark: the exit level is the mark minus a share of
//! it, so the giveback grows with the peak. Fires when profit falls to
//! the exit level, locking in most of the move instead of exiting at a
//! fixed target.

use tracing::debug;

use crate::core::errors::{PositionError, SettingsError};
use crate::core::types::{fixed_point, Amount};
use crate::position::gateway::OrderGateway;
use crate::position::intention::CloseReason;
use crate::position::Position;

use super::{on_hit, StopAlgo};

/// Validated take-profit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeProfitParams {
    profit_per_lot_to_activate: Amount,
    /// Share of the profit high-water mark given back before the exit
    /// fires, fixed-point in `[0, 1]`
    profit_share_to_close: Amount,
}

impl TakeProfitParams {
    pub fn new(
        profit_per_lot_to_activate: Amount,
        profit_share_to_close: Amount,
    ) -> Result<Self, SettingsError> {
        if profit_per_lot_to_activate < 0 {
            return Err(SettingsError::NegativeThreshold {
                name: "profit per lot to activate",
                value: fixed_point::to_f64(profit_per_lot_to_activate),
            });
        }
        if profit_share_to_close < 0 {
            return Err(SettingsError::NegativeThreshold {
                name: "profit share to close",
                value: fixed_point::to_f64(profit_share_to_close),
            });
        }
        if profit_share_to_close > fixed_point::SCALE {
            return Err(SettingsError::TakeProfitShareRange {
                share: fixed_point::to_f64(profit_share_to_close),
            });
        }
        Ok(Self {
            profit_per_lot_to_activate,
            profit_share_to_close,
        })
    }

    #[inline(always)]
    pub const fn profit_per_lot_to_activate(&self) -> Amount {
        self.profit_per_lot_to_activate
    }

    #[inline(always)]
    pub const fn profit_share_to_close(&self) -> Amount {
        self.profit_share_to_close
    }
}

#[derive(Debug)]
pub struct TakeProfit {
    params: TakeProfitParams,
    is_activated: bool,
    /// Profit high-water mark once armed
    max_profit: Option<Amount>,
    /// Profit low-water mark since the last new high
    min_profit: Option<Amount>,
}

impl TakeProfit {
    pub fn new(params: TakeProfitParams) -> Self {
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
        let profit_to_activate =
            fixed_point::mul(self.params.profit_per_lot_to_activate, position.opened_qty());

        if !self.is_activated {
            self.is_activated = planned_pnl >= profit_to_activate;
            if !self.is_activated {
                if let Some(max_profit) = self.max_profit {
                    if planned_pnl <= max_profit {
                        return false;
                    }
                }
            } else {
                debug!(
                    security = %position.security(),
                    planned_pnl = fixed_point::to_f64(planned_pnl),
                    profit_to_activate = fixed_point::to_f64(profit_to_activate),
                    "take profit armed"
                );
            }
        } else if let Some(max_profit) = self.max_profit {
            if planned_pnl <= max_profit {
                return true;
            }
        }

        // New profit high: move the mark and re-open the evaluation
        // window.
        self.max_profit = Some(planned_pnl);
        self.min_profit = None;

        self.is_activated
    }

    fn check_signal(&mut self, position: &Position) -> Result<bool, PositionError> {
        let planned_pnl = position.planned_pnl()?;
        if !self.activate(position, planned_pnl) {
            debug_assert!(self.min_profit.is_none());
            return Ok(false);
        }

        // max_profit is always set once armed.
        let max_profit = self.max_profit.unwrap_or(planned_pnl);
        let offset = fixed_point::mul(max_profit, self.params.profit_share_to_close);
        let profit_to_close = max_profit - offset;

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

impl StopAlgo for TakeProfit {
    fn name(&self) -> &'static str {
        "take-profit"
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
            CloseReason::None => {
                if !self.check_signal(position)? {
                    return Ok(());
                }
            }
            // Our own earlier signal: keep driving the close.
            CloseReason::TakeProfit => {}
            // Any other algorithm owns the close.
            _ => return Ok(()),
        }

        on_hit(self.name(), CloseReason::TakeProfit, position, gateway)
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

    /// Activate at +2 per lot, give back a quarter of the peak.
    fn take_profit() -> TakeProfit {
        TakeProfit::new(
            TakeProfitParams::new(fixed_point::from_f64(2.0), fixed_point::from_f64(0.25))
                .unwrap(),
        )
    }

    #[test]
    fn test_params_reject_share_above_one() {
        assert!(matches!(
            TakeProfitParams::new(SCALE, fixed_point::from_f64(1.5)),
            Err(SettingsError::TakeProfitShareRange { .. })
        ));
        assert!(TakeProfitParams::new(SCALE, SCALE).is_ok());
        assert!(matches!(
            TakeProfitParams::new(SCALE, -1),
            Err(SettingsError::NegativeThreshold { .. })
        ));
    }

    #[test]
    fn test_not_armed_below_activation() {
        let (mut position, mut gw, cell) = opened_long();
        let mut tp = take_profit();

        publish(&cell, 2, 101.0, 102.0);
        tp.run(&mut position, &mut gw).unwrap();
        assert!(!tp.is_activated());
        assert_eq!(position.close_reason(), CloseReason::None);
    }

    #[test]
    fn test_trails_peak_then_fires() {
        let (mut position, mut gw, cell) = opened_long();
        let mut tp = take_profit();

        // +3 arms; exit level is 3 - 3*0.25 = 2.25.
        publish(&cell, 2, 103.0, 104.0);
        tp.run(&mut position, &mut gw).unwrap();
        assert!(tp.is_activated());
        assert_eq!(position.close_reason(), CloseReason::None);

        // New high +4 moves the exit level to 3.0.
        publish(&cell, 3, 104.0, 105.0);
        tp.run(&mut position, &mut gw).unwrap();
        assert_eq!(position.close_reason(), CloseReason::None);

        // Retrace to +2.9, at or below the exit level: signal.
        publish(&cell, 4, 102.9, 103.9);
        tp.run(&mut position, &mut gw).unwrap();
        assert_eq!(position.close_reason(), CloseReason::TakeProfit);
        assert_eq!(position.intention(), Intention::CloseAggressive);
        assert!(gw.last_request().unwrap().is_aggressive());
    }

    #[test]
    fn test_retrace_above_exit_level_holds() {
        let (mut position, mut gw, cell) = opened_long();
        let mut tp = take_profit();

        publish(&cell, 2, 104.0, 105.0);
        tp.run(&mut position, &mut gw).unwrap();
        assert!(tp.is_activated());

        // Exit level is 3.0; +3.5 stays in the trade.
        publish(&cell, 3, 103.5, 104.5);
        tp.run(&mut position, &mut gw).unwrap();
        assert_eq!(position.close_reason(), CloseReason::None);
    }

    #[test]
    fn test_new_high_reopens_evaluation_window() {
        let (mut position, mut gw, cell) = opened_long();
        let mut tp = take_profit();

        publish(&cell, 2, 104.0, 105.0);
        tp.run(&mut position, &mut gw).unwrap();

        // Evaluation at +3.5 records the low-water mark.
        publish(&cell, 3, 103.5, 104.5);
        tp.run(&mut position, &mut gw).unwrap();
        assert_eq!(tp.min_profit, Some(fixed_point::from_f64(3.5)));

        // New high lifts the peak and restarts the mark there.
        publish(&cell, 4, 105.0, 106.0);
        tp.run(&mut position, &mut gw).unwrap();
        assert_eq!(tp.max_profit, Some(fixed_point::from_f64(5.0)));
        assert_eq!(tp.min_profit, Some(fixed_point::from_f64(5.0)));

        // A later retrace is evaluated against the new window.
        publish(&cell, 5, 104.5, 105.5);
        tp.run(&mut position, &mut gw).unwrap();
        assert_eq!(tp.min_profit, Some(fixed_point::from_f64(4.5)));
        assert_eq!(position.close_reason(), CloseReason::None);
    }

    #[test]
    fn test_stands_down_when_another_algo_owns_close() {
        let (mut position, mut gw, cell) = opened_long();
        let mut tp = take_profit();

        position.try_set_close_reason(CloseReason::StopLoss);
        let sent_before = gw.sent_count();

        publish(&cell, 2, 110.0, 111.0);
        tp.run(&mut position, &mut gw).unwrap();

        assert_eq!(position.close_reason(), CloseReason::StopLoss);
        assert_eq!(gw.sent_count(), sent_before);
    }
}
