//! The close-reason claim is a single atomic compare-and-set: under
//! concurrent signals exactly one algorithm may own the close.

use std::sync::Arc;
use std::thread;

use myr_core::book::publish::BookCell;
use myr_core::core::fixed_point::SCALE;
use myr_core::prelude::*;

fn opened_position() -> Position {
    let cell = Arc::new(BookCell::new());
    let mut book = PriceBook::with_time(1);
    book.bid_mut().add(1, 100 * SCALE, SCALE).unwrap();
    book.ask_mut().add(1, 101 * SCALE, SCALE).unwrap();
    cell.publish(book);
    Position::new(SecurityId(1), PositionSide::Long, SCALE, cell, 1)
}

#[test]
fn concurrent_claims_have_exactly_one_winner() {
    let contenders = [
        CloseReason::StopLoss,
        CloseReason::TrailingStop,
        CloseReason::TakeProfit,
        CloseReason::Signal,
    ];

    for _ in 0..200 {
        let position = opened_position();
        let winners: Vec<CloseReason> = thread::scope(|scope| {
            let handles: Vec<_> = contenders
                .iter()
                .map(|&reason| {
                    let position = &position;
                    scope.spawn(move || position.try_set_close_reason(reason).then_some(reason))
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(winners.len(), 1, "exactly one claim must win");
        assert_eq!(position.close_reason(), winners[0]);
    }
}

#[test]
fn winner_claim_is_idempotent_under_repetition() {
    let position = opened_position();
    assert!(position.try_set_close_reason(CloseReason::TakeProfit));

    for _ in 0..1000 {
        assert!(position.try_set_close_reason(CloseReason::TakeProfit));
        assert!(!position.try_set_close_reason(CloseReason::StopLoss));
    }
    assert_eq!(position.close_reason(), CloseReason::TakeProfit);
}
