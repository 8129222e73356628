//! Dip-buying threshold rule.

use crate::domain::error::DipbuyerError;

pub const DEFAULT_BUY_DROP_PCT: f64 = 3.0;
pub const DEFAULT_SELL_PROFIT_PCT: f64 = 5.0;

/// Buy after a one-day drop of at least `buy_drop_pct`, sell once the close is
/// at least `sell_profit_pct` above the buy price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    buy_drop_pct: f64,
    sell_profit_pct: f64,
}

impl Thresholds {
    pub fn new(buy_drop_pct: f64, sell_profit_pct: f64) -> Result<Self, DipbuyerError> {
        check_positive("buy_drop_pct", buy_drop_pct)?;
        check_positive("sell_profit_pct", sell_profit_pct)?;
        Ok(Self {
            buy_drop_pct,
            sell_profit_pct,
        })
    }

    pub fn buy_drop_pct(&self) -> f64 {
        self.buy_drop_pct
    }

    pub fn sell_profit_pct(&self) -> f64 {
        self.sell_profit_pct
    }

    pub fn is_buy_signal(&self, change_pct: f64) -> bool {
        change_pct <= -self.buy_drop_pct
    }

    pub fn is_sell_signal(&self, gain_pct: f64) -> bool {
        gain_pct >= self.sell_profit_pct
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            buy_drop_pct: DEFAULT_BUY_DROP_PCT,
            sell_profit_pct: DEFAULT_SELL_PROFIT_PCT,
        }
    }
}

fn check_positive(key: &str, value: f64) -> Result<(), DipbuyerError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DipbuyerError::invalid(
            "backtest",
            key,
            format!("{key} must be a positive percentage, got {value}"),
        ));
    }
    Ok(())
}
