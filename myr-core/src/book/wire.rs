//! Lossy drop-copy projection of a finalized book
//!
//! Drop-copy consumers receive at most the top `min(5, depth)` levels
//! per side as plain `(price, qty)` pairs; the full 10-level depth
//! never survives serialization. The projection is read-only and
//! detached from the live book.

use serde::Serialize;

use crate::core::types::{fixed_point, Timestamp};

use super::price_book::PriceBook;
use super::side::{BookSide, SideOrder};

/// Depth exported to drop-copy encoders
pub const WIRE_DEPTH: usize = 5;

/// One exported level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WireLevel {
    pub price: f64,
    pub qty: f64,
}

/// Depth-truncated book snapshot ready for wire encoding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireBook {
    pub time: Timestamp,
    pub bid: Vec<WireLevel>,
    pub ask: Vec<WireLevel>,
}

impl WireBook {
    /// Capture the top `min(WIRE_DEPTH, depth)` levels of each side.
    pub fn capture(book: &PriceBook) -> Self {
        Self {
            time: book.time(),
            bid: project(book.bid()),
            ask: project(book.ask()),
        }
    }
}

fn project<D: SideOrder>(side: &BookSide<D>) -> Vec<WireLevel> {
    side.iter()
        .take(WIRE_DEPTH)
        .map(|level| WireLevel {
            price: fixed_point::to_f64(level.price()),
            qty: fixed_point::to_f64(level.qty()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed_point::SCALE;

    fn full_book() -> PriceBook {
        let mut book = PriceBook::with_time(7);
        for i in 1..=PriceBook::side_max_size() as i64 {
            book.bid_mut().add(1, i * SCALE, SCALE).unwrap();
            book.ask_mut().add(1, (100 + i) * SCALE, SCALE).unwrap();
        }
        book
    }

    #[test]
    fn test_capture_truncates_to_wire_depth() {
        let wire = WireBook::capture(&full_book());

        assert_eq!(wire.time, 7);
        assert_eq!(wire.bid.len(), WIRE_DEPTH);
        assert_eq!(wire.ask.len(), WIRE_DEPTH);
        // Best first on both sides.
        assert_eq!(wire.bid[0].price, 10.0);
        assert_eq!(wire.ask[0].price, 101.0);
    }

    #[test]
    fn test_capture_shallow_book_keeps_depth() {
        let mut book = PriceBook::new();
        book.bid_mut().add(1, 2 * SCALE, SCALE).unwrap();
        book.bid_mut().add(1, SCALE, SCALE).unwrap();

        let wire = WireBook::capture(&book);
        assert_eq!(wire.bid.len(), 2);
        assert!(wire.ask.is_empty());
    }

    #[test]
    fn test_serializes_to_json() {
        let wire = WireBook::capture(&full_book());
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("\"bid\""));
        assert!(json.contains("\"ask\""));
        assert!(json.contains("101.0"));
    }
}
