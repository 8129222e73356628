//! Position state carried through a backtest pass.

use crate::domain::price::pct_change;
use crate::domain::strategy::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Holding {
        entry_price: f64,
    },
}

/// What happened on a given day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    Buy { price: f64 },
    Sell { price: f64 },
}

impl Position {
    pub fn is_holding(&self) -> bool {
        matches!(self, Position::Holding { .. })
    }

    pub fn gain_pct(&self, price: f64) -> Option<f64> {
        match *self {
            Position::Flat => None,
            Position::Holding { entry_price } => Some(pct_change(entry_price, price)),
        }
    }

    /// Advances one day. Buying and selling on the same day is impossible: a
    /// flat position can only buy, a held one can only sell.
    pub fn step(self, prev_close: f64, close: f64, thresholds: &Thresholds) -> (Self, Option<Signal>) {
        match self {
            Position::Flat => {
                if thresholds.is_buy_signal(pct_change(prev_close, close)) {
                    (
                        Position::Holding { entry_price: close },
                        Some(Signal::Buy { price: close }),
                    )
                } else {
                    (self, None)
                }
            }
            Position::Holding { entry_price } => {
                if thresholds.is_sell_signal(pct_change(entry_price, close)) {
                    (Position::Flat, Some(Signal::Sell { price: close }))
                } else {
                    (self, None)
                }
            }
        }
    }
}
