//! Strategy and stop configuration
//!
//! Plain `Deserialize` structs in external units (f64, seconds). They
//! convert into the internal fixed-point parameter types through
//! `TryFrom`, so every threshold is validated before a strategy runs.

use serde::Deserialize;

use crate::core::errors::SettingsError;
use crate::core::types::{fixed_point, Qty};
use crate::stops::{StopLossParams, TakeProfitParams, TrailingStopParams};

/// Protective stop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StopSettings {
    /// Stop-loss: maximum unrealized loss per lot
    pub max_loss_per_lot: f64,
    pub trailing: TrailingStopSettings,
    pub take_profit: TakeProfitSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrailingStopSettings {
    /// Profit per lot that arms the trailing stop
    pub profit_to_activate: f64,
    /// Profit per lot the stop closes at after arming
    pub profit_to_close: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TakeProfitSettings {
    /// Profit per lot that arms the take-profit
    pub profit_to_activate: f64,
    /// Share of the profit peak given back before closing, in `[0, 1]`
    #[serde(default = "default_take_profit_share")]
    pub share_to_close: f64,
}

fn default_take_profit_share() -> f64 {
    0.25
}

/// Position sizing and passive-order lifetime
#[derive(Debug, Clone, Deserialize)]
pub struct PositionSettings {
    /// Planned position size in lots
    pub qty: f64,
    /// How long a passive order may rest before the strategy escalates
    #[serde(default = "default_passive_lifetime")]
    pub max_passive_order_lifetime_secs: u64,
}

fn default_passive_lifetime() -> u64 {
    60
}

impl PositionSettings {
    pub fn qty_fixed(&self) -> Result<Qty, SettingsError> {
        if self.qty <= 0.0 {
            return Err(SettingsError::NonPositiveQty { qty: self.qty });
        }
        Ok(fixed_point::from_f64(self.qty))
    }
}

impl TryFrom<&StopSettings> for StopLossParams {
    type Error = SettingsError;

    fn try_from(settings: &StopSettings) -> Result<Self, Self::Error> {
        StopLossParams::new(fixed_point::from_f64(settings.max_loss_per_lot))
    }
}

impl TryFrom<&TrailingStopSettings> for TrailingStopParams {
    type Error = SettingsError;

    fn try_from(settings: &TrailingStopSettings) -> Result<Self, Self::Error> {
        TrailingStopParams::new(
            fixed_point::from_f64(settings.profit_to_activate),
            fixed_point::from_f64(settings.profit_to_close),
        )
    }
}

impl TryFrom<&TakeProfitSettings> for TakeProfitParams {
    type Error = SettingsError;

    fn try_from(settings: &TakeProfitSettings) -> Result<Self, Self::Error> {
        TakeProfitParams::new(
            fixed_point::from_f64(settings.profit_to_activate),
            fixed_point::from_f64(settings.share_to_close),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_settings() {
        let raw = r#"{
            "max_loss_per_lot": 2.0,
            "trailing": { "profit_to_activate": 3.0, "profit_to_close": 1.0 },
            "take_profit": { "profit_to_activate": 2.0 }
        }"#;
        let settings: StopSettings = serde_json::from_str(raw).unwrap();

        let stop_loss = StopLossParams::try_from(&settings).unwrap();
        assert_eq!(stop_loss.max_loss_per_lot(), fixed_point::from_f64(2.0));

        let trailing = TrailingStopParams::try_from(&settings.trailing).unwrap();
        assert_eq!(
            trailing.profit_per_lot_to_activate(),
            fixed_point::from_f64(3.0)
        );

        // Defaulted share.
        let take_profit = TakeProfitParams::try_from(&settings.take_profit).unwrap();
        assert_eq!(
            take_profit.profit_share_to_close(),
            fixed_point::from_f64(0.25)
        );
    }

    #[test]
    fn test_invalid_trailing_order_rejected() {
        let settings = TrailingStopSettings {
            profit_to_activate: 1.0,
            profit_to_close: 2.0,
        };
        assert!(matches!(
            TrailingStopParams::try_from(&settings),
            Err(SettingsError::TrailingThresholdOrder { .. })
        ));
    }

    #[test]
    fn test_take_profit_share_out_of_range_rejected() {
        let settings = TakeProfitSettings {
            profit_to_activate: 1.0,
            share_to_close: 1.5,
        };
        assert!(matches!(
            TakeProfitParams::try_from(&settings),
            Err(SettingsError::TakeProfitShareRange { .. })
        ));
    }

    #[test]
    fn test_position_qty_validation() {
        let settings = PositionSettings {
            qty: 0.0,
            max_passive_order_lifetime_secs: 60,
        };
        assert!(matches!(
            settings.qty_fixed(),
            Err(SettingsError::NonPositiveQty { .. })
        ));

        let settings = PositionSettings {
            qty: 2.5,
            max_passive_order_lifetime_secs: 60,
        };
        assert_eq!(settings.qty_fixed().unwrap(), fixed_point::from_f64(2.5));
    }
}
