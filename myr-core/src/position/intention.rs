//! Intention and close-reason enums

use std::fmt;

/// What the strategy currently wants this position to do
///
/// `OpenPassive` is the initial state only; it is never a valid target
/// of an explicit transition. Every other transition request is
/// validated and re-synced against live order state by
/// [`super::Position::set_intention`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Intention {
    /// Open with a resting order at the passive price (initial state)
    OpenPassive = 0,
    /// Open by crossing the spread with a marketable order
    OpenAggressive = 1,
    /// Nothing in flight, nothing wanted
    Hold = 2,
    /// Abandon the open: cancel whatever is resting, then hold
    DoNotOpen = 3,
    /// Close with a resting order at the passive price
    ClosePassive = 4,
    /// Close by crossing the spread
    CloseAggressive = 5,
}

impl Intention {
    pub const fn name(self) -> &'static str {
        match self {
            Intention::OpenPassive => "open-passive",
            Intention::OpenAggressive => "open-aggressive",
            Intention::Hold => "hold",
            Intention::DoNotOpen => "do-not-open",
            Intention::ClosePassive => "close-passive",
            Intention::CloseAggressive => "close-aggressive",
        }
    }

    /// Intentions that drive the position toward being closed
    #[inline(always)]
    pub const fn is_closing(self) -> bool {
        matches!(self, Intention::ClosePassive | Intention::CloseAggressive)
    }

    /// Intentions that drive the position toward being opened
    #[inline(always)]
    pub const fn is_opening(self) -> bool {
        matches!(self, Intention::OpenPassive | Intention::OpenAggressive)
    }
}

impl fmt::Display for Intention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which algorithm owns the close of a position
///
/// Stored in the position as an atomic; the first stop algorithm to
/// compare-and-set it from `None` wins, the others stand down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CloseReason {
    None = 0,
    StopLoss = 1,
    TrailingStop = 2,
    TakeProfit = 3,
    /// Strategy signal, not a stop algorithm
    Signal = 4,
}

impl CloseReason {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => CloseReason::StopLoss,
            2 => CloseReason::TrailingStop,
            3 => CloseReason::TakeProfit,
            4 => CloseReason::Signal,
            _ => CloseReason::None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            CloseReason::None => "none",
            CloseReason::StopLoss => "stop-loss",
            CloseReason::TrailingStop => "trailing-stop",
            CloseReason::TakeProfit => "take-profit",
            CloseReason::Signal => "signal",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
