//! Position sizing from a fixed USDT margin
//!
//! The order size is the whole number of contracts the leveraged margin buys
//! at the entry price:
//!
//! ```text
//! notional = margin × leverage
//! quantity = floor(notional / entry)
//! ```
//!
//! Contract granularity is assumed to be 1. Venues publish a per-symbol lot
//! step which is not consulted here, so symbols with fractional lots are
//! under-sized and very high priced symbols size to zero.

use rust_decimal::Decimal;

use crate::domain::errors::ValidationError;
use crate::domain::value_objects::{price::Price, quantity::Quantity};

/// Outcome of sizing a signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizing {
    /// Margin × leverage, in quote currency
    pub notional: Decimal,
    /// Whole contracts to order; zero means the signal is too small to trade
    pub quantity: Quantity,
}

/// PositionSizer service for calculating order quantities
#[derive(Debug, Clone, Default)]
pub struct PositionSizer;

impl PositionSizer {
    pub fn new() -> Self {
        Self
    }

    pub fn size(
        &self,
        margin: Decimal,
        leverage: u32,
        entry: Price,
    ) -> Result<PositionSizing, ValidationError> {
        if margin <= Decimal::ZERO {
            return Err(ValidationError::NotPositive {
                field: "margin",
                value: margin,
            });
        }
        if leverage == 0 {
            return Err(ValidationError::InvalidLeverage);
        }

        let notional = margin
            .checked_mul(Decimal::from(leverage))
            .ok_or(ValidationError::NotionalOverflow)?;
        let contracts = notional
            .checked_div(entry.value())
            .ok_or(ValidationError::NotionalOverflow)?
            .floor();

        Ok(PositionSizing {
            notional,
            quantity: Quantity::new(contracts)?,
        })
    }
}
