//! Public trade prints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggressor side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// A single public trade print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Exchange trade id, when the venue reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub timestamp: i64,
    pub price: Decimal,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<TradeSide>,
}

impl Trade {
    #[must_use]
    pub fn new(timestamp: i64, price: Decimal, amount: Decimal) -> Self {
        Self {
            id: None,
            timestamp,
            price,
            amount,
            side: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_side(mut self, side: TradeSide) -> Self {
        self.side = Some(side);
        self
    }
}
