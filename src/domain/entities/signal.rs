use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::entities::order::{OrderSide, OrderType};
use crate::domain::errors::ValidationError;
use crate::domain::value_objects::price::Price;

pub const DEFAULT_MARGIN_USDT: Decimal = dec!(30);
pub const DEFAULT_LEVERAGE: u32 = 10;

fn default_margin() -> Decimal {
    DEFAULT_MARGIN_USDT
}

fn default_leverage() -> u32 {
    DEFAULT_LEVERAGE
}

/// Trading signal as received over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub side: String,
    pub entry: Decimal,
    #[serde(rename = "tp")]
    pub take_profit: Decimal,
    #[serde(rename = "sl")]
    pub stop_loss: Decimal,
    #[serde(default = "default_margin")]
    pub margin: Decimal,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    #[serde(default, alias = "type")]
    pub order_type: Option<String>,
}

/// Signal whose fields have all been checked and typed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSignal {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub entry: Price,
    pub take_profit: Price,
    pub stop_loss: Price,
    pub margin: Decimal,
    pub leverage: u32,
}

impl Signal {
    pub fn validate(&self) -> Result<ValidSignal, ValidationError> {
        let symbol = normalize_symbol(&self.symbol).ok_or(ValidationError::EmptySymbol)?;
        let side = self.side.parse::<OrderSide>()?;
        let entry = Price::named("entry", self.entry)?;
        let take_profit = Price::named("tp", self.take_profit)?;
        let stop_loss = Price::named("sl", self.stop_loss)?;

        if self.margin <= Decimal::ZERO {
            return Err(ValidationError::NotPositive {
                field: "margin",
                value: self.margin,
            });
        }
        if self.leverage == 0 {
            return Err(ValidationError::InvalidLeverage);
        }

        let order_type = match &self.order_type {
            Some(raw) => raw.parse::<OrderType>()?,
            None => OrderType::default(),
        };

        Ok(ValidSignal {
            symbol,
            side,
            order_type,
            entry,
            take_profit,
            stop_loss,
            margin: self.margin,
            leverage: self.leverage,
        })
    }
}

/// Request to flatten whatever is open on a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseRequest {
    pub symbol: String,
}

/// Trim and upper-case a symbol; `None` when nothing is left
pub fn normalize_symbol(symbol: &str) -> Option<String> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}
