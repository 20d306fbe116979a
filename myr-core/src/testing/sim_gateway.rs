//! Scriptable in-process order gateway
//!
//! Records every request and cancel, hands out real order ids, and
//! builds the [`OrderUpdate`] callbacks a broker session would send.
//! Fills never happen on their own: the driver decides when an order
//! fills, cancels, or bounces, which keeps lifecycle tests
//! deterministic.

use std::collections::HashMap;

use crate::core::errors::GatewayError;
use crate::core::types::{fixed_point, OrderId, OrderStatus, Px, Qty, SecurityId};
use crate::position::gateway::{OrderGateway, OrderRequest, OrderUpdate, TradeInfo};

#[derive(Debug, Default)]
pub struct SimGateway {
    requests: Vec<(OrderId, OrderRequest)>,
    cancels: Vec<(SecurityId, OrderId)>,
    by_id: HashMap<OrderId, OrderRequest>,
    /// Already-reported fill quantity per order, so scripted partials
    /// keep `remaining_qty` consistent
    filled_so_far: HashMap<OrderId, Qty>,
    fail_sends: Option<GatewayError>,
    next_broker_id: u64,
}

impl SimGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `send` fail with `error`.
    pub fn fail_sends(&mut self, error: GatewayError) {
        self.fail_sends = Some(error);
    }

    // ------------------------------------------------------------------
    // Recorded traffic
    // ------------------------------------------------------------------

    pub fn sent_count(&self) -> usize {
        self.requests.len()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.len()
    }

    pub fn last_request(&self) -> Option<OrderRequest> {
        self.requests.last().map(|(_, request)| *request)
    }

    pub fn last_order_id(&self) -> Option<OrderId> {
        self.requests.last().map(|(order_id, _)| *order_id)
    }

    pub fn requests(&self) -> impl Iterator<Item = &OrderRequest> {
        self.requests.iter().map(|(_, request)| request)
    }

    pub fn request_for(&self, order_id: OrderId) -> Option<OrderRequest> {
        self.by_id.get(&order_id).copied()
    }

    // ------------------------------------------------------------------
    // Scripted callbacks
    // ------------------------------------------------------------------

    /// Full fill of whatever quantity is still unreported.
    pub fn filled(&mut self, order_id: OrderId, price: Px) -> OrderUpdate {
        let total = self.order_qty(order_id);
        let done = self.filled_so_far.remove(&order_id).unwrap_or(0);
        OrderUpdate {
            order_id,
            broker_order_id: self.broker_id(),
            status: OrderStatus::Filled,
            remaining_qty: 0,
            trade: Some(TradeInfo {
                price,
                qty: total - done,
                time: fixed_point::now_ns(),
            }),
        }
    }

    /// Partial fill of `qty`; the order keeps working.
    pub fn partial_fill(&mut self, order_id: OrderId, price: Px, qty: Qty) -> OrderUpdate {
        let total = self.order_qty(order_id);
        let done = self.filled_so_far.entry(order_id).or_insert(0);
        *done += qty;
        let done = *done;
        OrderUpdate {
            order_id,
            broker_order_id: self.broker_id(),
            status: OrderStatus::PartiallyFilled,
            remaining_qty: total - done,
            trade: Some(TradeInfo {
                price,
                qty,
                time: fixed_point::now_ns(),
            }),
        }
    }

    /// Cancel confirmation for the unfilled remainder.
    pub fn cancelled_ack(&mut self, order_id: OrderId) -> OrderUpdate {
        let total = self.order_qty(order_id);
        let done = self.filled_so_far.remove(&order_id).unwrap_or(0);
        OrderUpdate {
            order_id,
            broker_order_id: self.broker_id(),
            status: OrderStatus::Cancelled,
            remaining_qty: total - done,
            trade: None,
        }
    }

    /// Rejection by the trading system.
    pub fn rejected_ack(&mut self, order_id: OrderId) -> OrderUpdate {
        let total = self.order_qty(order_id);
        OrderUpdate {
            order_id,
            broker_order_id: self.broker_id(),
            status: OrderStatus::Rejected,
            remaining_qty: total,
            trade: None,
        }
    }

    fn order_qty(&self, order_id: OrderId) -> Qty {
        self.by_id
            .get(&order_id)
            .map(|request| request.qty)
            .unwrap_or(0)
    }

    fn broker_id(&mut self) -> u64 {
        self.next_broker_id += 1;
        self.next_broker_id
    }
}

impl OrderGateway for SimGateway {
    fn send(&mut self, request: OrderRequest) -> Result<OrderId, GatewayError> {
        if let Some(error) = &self.fail_sends {
            return Err(error.clone());
        }
        let order_id = OrderId::generate();
        self.requests.push((order_id, request));
        self.by_id.insert(order_id, request);
        Ok(order_id)
    }

    fn cancel(&mut self, security: SecurityId, order_id: OrderId) -> Result<(), GatewayError> {
        self.cancels.push((security, order_id));
        Ok(())
    }
}
