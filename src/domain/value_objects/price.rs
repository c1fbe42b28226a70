use rust_decimal::Decimal;

use crate::domain::errors::ValidationError;

/// Strictly positive price used for limit and trigger levels
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Price(Decimal);

impl Price {
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        Self::named("price", value)
    }

    /// Like `new`, but names the offending field in the error
    pub fn named(field: &'static str, value: Decimal) -> Result<Self, ValidationError> {
        if value > Decimal::ZERO {
            Ok(Price(value))
        } else {
            Err(ValidationError::NotPositive { field, value })
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
