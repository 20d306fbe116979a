//! Position bookkeeping and the intention state machine
//!
//! A position tracks one open/close lifecycle for one instrument. The
//! strategy expresses what it wants through [`Intention`] transitions;
//! [`Position::sync`] reconciles the current intention against live
//! order state on every transition and after every gateway callback,
//! sending or cancelling orders through the [`OrderGateway`] as needed.
//!
//! Bookkeeping invariant: `is_sent == true` implies exactly one
//! coherent outstanding order for the current intention. If the
//! trading system reports that order gone while it was neither filled
//! to completion nor cancelled at our request, the machine raises
//! [`PositionError::OrderVanished`]: bookkeeping and the broker's
//! order book have desynchronized, and retrying risks duplicates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::book::publish::BookCell;
use crate::core::errors::PositionError;
use crate::core::types::{
    fixed_point, Amount, OrderId, OrderStatus, PositionSide, Px, Qty, SecurityId, Side,
    TimeInForce, Timestamp,
};

use super::gateway::{OrderGateway, OrderRequest, OrderUpdate};
use super::intention::{CloseReason, Intention};

/// One outstanding order tracked by the position
#[derive(Debug, Clone, Copy)]
struct ActiveOrder {
    side: Side,
    qty: Qty,
    remaining: Qty,
    price: Option<Px>,
    sent_at: Timestamp,
    /// `true` if this order closes the position rather than opens it
    closing: bool,
}

/// Per-instrument position with an intention-driven order lifecycle
#[derive(Debug)]
pub struct Position {
    security: SecurityId,
    side: PositionSide,
    /// Planned position size
    qty: Qty,
    book: Arc<BookCell>,

    start_time: Timestamp,
    close_start_time: Timestamp,

    intention: Intention,
    /// An order for the current intention is outstanding
    is_sent: bool,
    /// The outstanding open order, if any, rests at a passive price
    is_passive_open: bool,
    /// The outstanding close order, if any, rests at a passive price
    is_passive_close: bool,

    opened_qty: Qty,
    closed_qty: Qty,
    /// Sum of `price * qty` over opening fills, for the average price
    open_volume: Amount,
    close_volume: Amount,

    /// We asked the gateway to cancel the outstanding order(s)
    cancel_requested: bool,
    /// A cancel we requested was confirmed
    cancelled: bool,
    /// The outstanding order was rejected by the trading system
    rejected: bool,

    last_order_id: Option<OrderId>,
    close_reason: AtomicU8,
    active_orders: Mutex<HashMap<OrderId, ActiveOrder>>,
}

impl Position {
    /// New position in the initial `OpenPassive` intention.
    pub fn new(
        security: SecurityId,
        side: PositionSide,
        qty: Qty,
        book: Arc<BookCell>,
        now: Timestamp,
    ) -> Self {
        debug_assert!(qty > 0);
        Self {
            security,
            side,
            qty,
            book,
            start_time: now,
            close_start_time: 0,
            intention: Intention::OpenPassive,
            is_sent: false,
            is_passive_open: false,
            is_passive_close: false,
            opened_qty: 0,
            closed_qty: 0,
            open_volume: 0,
            close_volume: 0,
            cancel_requested: false,
            cancelled: false,
            rejected: false,
            last_order_id: None,
            close_reason: AtomicU8::new(CloseReason::None as u8),
            active_orders: Mutex::new(HashMap::new()),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[inline(always)]
    pub fn security(&self) -> SecurityId {
        self.security
    }

    #[inline(always)]
    pub fn position_side(&self) -> PositionSide {
        self.side
    }

    #[inline(always)]
    pub fn intention(&self) -> Intention {
        self.intention
    }

    #[inline(always)]
    pub fn is_sent(&self) -> bool {
        self.is_sent
    }

    #[inline(always)]
    pub fn planned_qty(&self) -> Qty {
        self.qty
    }

    #[inline(always)]
    pub fn opened_qty(&self) -> Qty {
        self.opened_qty
    }

    #[inline(always)]
    pub fn closed_qty(&self) -> Qty {
        self.closed_qty
    }

    #[inline(always)]
    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    #[inline(always)]
    pub fn close_start_time(&self) -> Timestamp {
        self.close_start_time
    }

    /// Fully opened: the planned quantity has been filled.
    #[inline]
    pub fn is_opened(&self) -> bool {
        self.opened_qty >= self.qty
    }

    /// Fully closed: everything that was opened has been closed out.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.is_opened() && self.closed_qty >= self.opened_qty
    }

    pub fn has_active_orders(&self) -> bool {
        !self.active_orders.lock().is_empty()
    }

    /// Send time of the oldest outstanding order.
    ///
    /// The surrounding strategy uses this to bound passive-order
    /// lifetime; the core keeps no timers of its own.
    pub fn active_order_time(&self) -> Option<Timestamp> {
        self.active_orders
            .lock()
            .values()
            .map(|order| order.sent_at)
            .min()
    }

    /// Realized P&L of the closed portion.
    pub fn realized_pnl(&self) -> Amount {
        if self.opened_qty <= 0 || self.closed_qty <= 0 {
            return 0;
        }
        let avg_open = fixed_point::div(self.open_volume, self.opened_qty);
        let open_cost = fixed_point::mul(avg_open, self.closed_qty);
        match self.side {
            PositionSide::Long => self.close_volume - open_cost,
            PositionSide::Short => open_cost - self.close_volume,
        }
    }

    /// Average opening fill price, once anything has filled.
    pub fn avg_open_price(&self) -> Option<Px> {
        (self.opened_qty > 0).then(|| fixed_point::div(self.open_volume, self.opened_qty))
    }

    // ------------------------------------------------------------------
    // Close-reason coordination (first signal wins)
    // ------------------------------------------------------------------

    pub fn close_reason(&self) -> CloseReason {
        CloseReason::from_u8(self.close_reason.load(Ordering::Acquire))
    }

    /// Claim the close of this position for `reason`.
    ///
    /// Compare-and-set from `None`; returns `true` if `reason` now
    /// owns the close (won the race, or already owned it).
    pub fn try_set_close_reason(&self, reason: CloseReason) -> bool {
        self.close_reason
            .compare_exchange(
                CloseReason::None as u8,
                reason as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
            || self.close_reason() == reason
    }

    pub fn reset_close_reason(&self) {
        self.close_reason
            .store(CloseReason::None as u8, Ordering::Release);
    }

    // ------------------------------------------------------------------
    // Book-derived prices and P&L
    // ------------------------------------------------------------------

    /// Price a passive open rests at: join our own side of the book.
    pub fn passive_open_price(&self) -> Result<Px, PositionError> {
        let level = match self.side {
            PositionSide::Long => self.book.best_bid(),
            PositionSide::Short => self.book.best_ask(),
        };
        level.map(|l| l.price()).ok_or(PositionError::NoPublishedBook {
            security: self.security,
        })
    }

    /// Price a passive close rests at: join the opposite side.
    pub fn passive_close_price(&self) -> Result<Px, PositionError> {
        let level = match self.side {
            PositionSide::Long => self.book.best_ask(),
            PositionSide::Short => self.book.best_bid(),
        };
        level.map(|l| l.price()).ok_or(PositionError::NoPublishedBook {
            security: self.security,
        })
    }

    /// Marketable close price from the current book top.
    pub fn market_close_price(&self) -> Result<Px, PositionError> {
        let level = match self.side {
            PositionSide::Long => self.book.best_bid(),
            PositionSide::Short => self.book.best_ask(),
        };
        level.map(|l| l.price()).ok_or(PositionError::NoPublishedBook {
            security: self.security,
        })
    }

    /// Unrealized P&L of the open quantity against the current best
    /// price the position could close at.
    pub fn planned_pnl(&self) -> Result<Amount, PositionError> {
        let remaining = self.opened_qty - self.closed_qty;
        if remaining <= 0 {
            return Ok(0);
        }
        let close_px = self.market_close_price()?;
        let avg_open = fixed_point::div(self.open_volume, self.opened_qty);
        let per_unit = match self.side {
            PositionSide::Long => close_px - avg_open,
            PositionSide::Short => avg_open - close_px,
        };
        Ok(fixed_point::mul(per_unit, remaining))
    }

    // ------------------------------------------------------------------
    // Intention machine
    // ------------------------------------------------------------------

    /// Request a transition to `intention` and reconcile.
    ///
    /// `OpenPassive` is initial-only and re-entering the current state
    /// is a logic error. Close intents require the position to be
    /// opened; `DoNotOpen` requires it not to be.
    pub fn set_intention(
        &mut self,
        intention: Intention,
        gateway: &mut dyn OrderGateway,
    ) -> Result<(), PositionError> {
        if intention == self.intention || intention == Intention::OpenPassive {
            return Err(PositionError::InvalidTransition {
                security: self.security,
                intention: intention.name(),
            });
        }
        if intention.is_closing() && !self.is_opened() {
            return Err(PositionError::NotOpened {
                security: self.security,
            });
        }
        if intention == Intention::DoNotOpen && self.is_opened() {
            return Err(PositionError::InvalidTransition {
                security: self.security,
                intention: intention.name(),
            });
        }

        debug!(
            security = %self.security,
            from = %self.intention,
            to = %intention,
            "intention transition"
        );

        self.intention = intention;
        // The new intention has nothing in flight yet; any order still
        // resting belongs to the old intention and is reconciled below.
        self.is_sent = false;
        self.cancel_requested = false;
        self.cancelled = false;
        self.sync(gateway)
    }

    /// Re-apply the current intention's checks without a transition.
    ///
    /// Idempotent; called after every external event (fill, cancel,
    /// book update) that may complete or invalidate the intention.
    pub fn sync(&mut self, gateway: &mut dyn OrderGateway) -> Result<(), PositionError> {
        match self.intention {
            Intention::OpenPassive | Intention::OpenAggressive => self.sync_open(gateway),
            Intention::DoNotOpen => self.sync_do_not_open(gateway),
            Intention::Hold => {
                debug_assert!(!self.is_sent, "hold with an order in flight");
                Ok(())
            }
            Intention::ClosePassive | Intention::CloseAggressive => self.sync_close(gateway),
        }
    }

    fn sync_open(&mut self, gateway: &mut dyn OrderGateway) -> Result<(), PositionError> {
        if self.is_opened() {
            debug_assert!(!self.is_completed());
            self.transition_to_hold("fully opened");
            return Ok(());
        }

        if self.has_active_orders() {
            // An aggressive open first clears its own resting passive
            // order off the book.
            if self.intention == Intention::OpenAggressive
                && self.is_passive_open
                && !self.cancel_requested
            {
                self.cancel_all_orders(gateway)?;
            }
            return Ok(());
        }

        if self.is_sent {
            return Err(self.vanished());
        }
        if self.rejected {
            return Err(PositionError::OpenFailed {
                security: self.security,
            });
        }

        let passive = self.intention == Intention::OpenPassive;
        let price = if passive {
            Some(self.passive_open_price()?)
        } else {
            None
        };
        self.send_order(gateway, self.side.open_order_side(), self.qty - self.opened_qty, price, false)?;
        self.is_passive_open = passive;
        Ok(())
    }

    fn sync_do_not_open(&mut self, gateway: &mut dyn OrderGateway) -> Result<(), PositionError> {
        debug_assert!(!self.is_opened());

        if self.has_active_orders() {
            if !self.cancel_requested {
                self.cancel_all_orders(gateway)?;
            }
            return Ok(());
        }
        if self.is_sent {
            return Err(self.vanished());
        }
        self.transition_to_hold("open abandoned");
        Ok(())
    }

    fn sync_close(&mut self, gateway: &mut dyn OrderGateway) -> Result<(), PositionError> {
        debug_assert!(self.is_opened());

        if self.is_completed() {
            self.transition_to_hold("fully closed");
            return Ok(());
        }

        if self.has_active_orders() {
            if self.intention == Intention::CloseAggressive
                && self.is_passive_close
                && !self.cancel_requested
            {
                self.cancel_all_orders(gateway)?;
            }
            return Ok(());
        }

        if self.is_sent {
            return Err(self.vanished());
        }
        if self.rejected {
            return Err(PositionError::CloseFailed {
                security: self.security,
            });
        }

        let passive = self.intention == Intention::ClosePassive;
        let price = if passive {
            Some(self.passive_close_price()?)
        } else {
            None
        };
        if self.close_start_time == 0 {
            self.close_start_time = fixed_point::now_ns();
        }
        self.send_order(
            gateway,
            self.side.close_order_side(),
            self.opened_qty - self.closed_qty,
            price,
            true,
        )?;
        self.is_passive_close = passive;
        Ok(())
    }

    fn send_order(
        &mut self,
        gateway: &mut dyn OrderGateway,
        side: Side,
        qty: Qty,
        price: Option<Px>,
        closing: bool,
    ) -> Result<(), PositionError> {
        debug_assert!(qty > 0);
        debug_assert!(!self.has_active_orders(), "second order while one is outstanding");

        let time_in_force = if price.is_some() {
            TimeInForce::Day
        } else {
            TimeInForce::Ioc
        };
        let request = OrderRequest {
            security: self.security,
            side,
            qty,
            price,
            time_in_force,
        };

        let order_id = gateway.send(request)?;
        let sent_at = fixed_point::now_ns();
        self.active_orders.lock().insert(
            order_id,
            ActiveOrder {
                side,
                qty,
                remaining: qty,
                price,
                sent_at,
                closing,
            },
        );
        self.is_sent = true;
        self.cancel_requested = false;
        self.cancelled = false;
        self.last_order_id = Some(order_id);

        info!(
            security = %self.security,
            %order_id,
            %side,
            qty = fixed_point::to_f64(qty),
            price = price.map(fixed_point::to_f64),
            closing,
            intention = %self.intention,
            "order sent"
        );
        Ok(())
    }

    /// Request cancellation of every outstanding order.
    ///
    /// Also the hook a timeout-driven caller uses to bound passive
    /// order lifetime.
    pub fn cancel_all_orders(
        &mut self,
        gateway: &mut dyn OrderGateway,
    ) -> Result<(), PositionError> {
        let ids: Vec<OrderId> = self.active_orders.lock().keys().copied().collect();
        for order_id in ids {
            info!(security = %self.security, %order_id, "cancel requested");
            gateway.cancel(self.security, order_id)?;
        }
        self.cancel_requested = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Gateway callbacks
    // ------------------------------------------------------------------

    /// Ingest a normalized status callback, then re-sync.
    pub fn on_order_status(
        &mut self,
        update: OrderUpdate,
        gateway: &mut dyn OrderGateway,
    ) -> Result<(), PositionError> {
        let closing = {
            let mut orders = self.active_orders.lock();
            let Some(entry) = orders.get_mut(&update.order_id) else {
                warn!(
                    security = %self.security,
                    order_id = %update.order_id,
                    status = ?update.status,
                    "status for unknown order ignored"
                );
                return Ok(());
            };
            let closing = entry.closing;

            if let Some(trade) = update.trade {
                debug_assert!(trade.qty > 0 && trade.qty <= entry.remaining);
                entry.remaining = update.remaining_qty;
                if closing {
                    self.closed_qty += trade.qty;
                    self.close_volume += fixed_point::mul(trade.price, trade.qty);
                } else {
                    self.opened_qty += trade.qty;
                    self.open_volume += fixed_point::mul(trade.price, trade.qty);
                }
            }

            match update.status {
                OrderStatus::Filled => {
                    orders.remove(&update.order_id);
                    self.is_sent = false;
                }
                OrderStatus::Cancelled => {
                    orders.remove(&update.order_id);
                    if self.cancel_requested {
                        self.cancelled = true;
                        self.is_sent = false;
                    }
                    // Unrequested cancel: is_sent stays true and the
                    // next sync raises OrderVanished.
                }
                OrderStatus::Rejected => {
                    orders.remove(&update.order_id);
                    self.rejected = true;
                    self.is_sent = false;
                }
                OrderStatus::Pending | OrderStatus::Open | OrderStatus::PartiallyFilled => {
                    entry_remaining(orders.get_mut(&update.order_id), update.remaining_qty);
                }
            }
            closing
        };

        debug!(
            security = %self.security,
            order_id = %update.order_id,
            status = ?update.status,
            closing,
            opened = fixed_point::to_f64(self.opened_qty),
            closed = fixed_point::to_f64(self.closed_qty),
            "order status"
        );

        self.sync(gateway)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn transition_to_hold(&mut self, why: &'static str) {
        debug!(security = %self.security, from = %self.intention, why, "-> hold");
        self.intention = Intention::Hold;
        self.is_sent = false;
        self.cancel_requested = false;
        self.cancelled = false;
    }

    fn vanished(&self) -> PositionError {
        PositionError::OrderVanished {
            security: self.security,
            order_id: self.last_order_id.unwrap_or(OrderId::new(0)),
        }
    }
}

#[inline]
fn entry_remaining(entry: Option<&mut ActiveOrder>, remaining: Qty) {
    if let Some(entry) = entry {
        entry.remaining = remaining;
    }
}
