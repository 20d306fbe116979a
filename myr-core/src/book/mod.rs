//! Bounded two-sided price book
//!
//! The book keeps up to [`side::SIDE_MAX_SIZE`] aggregated levels per
//! side in a fixed arena, with no allocation on the update path. A single
//! producer builds each snapshot, then publishes it whole through a
//! [`publish::BookCell`]; consumers read immutable snapshots.
//!
//! Feed adapters call [`side::BookSide::add`] / `update` once per
//! price-level event, after rounding prices to the instrument tick
//! size. Rejections of a single update (`add` on duplicate/full) are
//! recoverable; out-of-range reads are caller bugs and propagate.

pub mod level;
pub mod price_book;
pub mod publish;
pub mod registry;
pub mod side;
pub mod wire;

pub use level::PriceLevel;
pub use price_book::PriceBook;
pub use publish::BookCell;
pub use registry::BookRegistry;
pub use side::{AskSide, Asks, BidSide, Bids, BookSide, SideOrder, SIDE_MAX_SIZE};
pub use wire::{WireBook, WireLevel, WIRE_DEPTH};
