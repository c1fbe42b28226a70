use rust_decimal::Decimal;

use crate::domain::errors::ValidationError;

/// Contract count; never negative
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Quantity(Decimal);

impl Quantity {
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value >= Decimal::ZERO {
            Ok(Quantity(value))
        } else {
            Err(ValidationError::NegativeQuantity)
        }
    }

    /// Quantity of a signed exchange size (short positions may be reported negative)
    pub fn from_abs(value: Decimal) -> Self {
        Quantity(value.abs())
    }

    pub fn zero() -> Self {
        Quantity(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
