use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::repositories::exchange_client::ExchangeError;

/// Errors raised while checking inbound values before anything reaches the exchange
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Symbol must not be empty")]
    EmptySymbol,

    #[error("Invalid side '{0}': expected 'buy' or 'sell'")]
    InvalidSide(String),

    #[error("Invalid order type '{0}': expected 'limit' or 'market'")]
    InvalidOrderType(String),

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: Decimal },

    #[error("Leverage must be at least 1")]
    InvalidLeverage,

    #[error("Quantity must be non-negative")]
    NegativeQuantity,

    #[error("Limit orders must have a price")]
    MissingLimitPrice,

    #[error("Notional value out of range")]
    NotionalOverflow,
}

/// Error taxonomy surfaced to the HTTP layer
///
/// Every adapter failure that escapes a gateway is folded into one of these
/// five kinds, which the HTTP surface maps to a status code.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Unexpected internal error: {0}")]
    Unexpected(String),
}

impl GatewayError {
    /// Short error code for logging/monitoring
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::InsufficientFunds(_) => "ERR_INSUFFICIENT_FUNDS",
            GatewayError::InvalidOrder(_) => "ERR_INVALID_ORDER",
            GatewayError::Network(_) => "ERR_NETWORK",
            GatewayError::Exchange(_) => "ERR_EXCHANGE",
            GatewayError::Unexpected(_) => "ERR_UNEXPECTED",
        }
    }
}

impl From<ExchangeError> for GatewayError {
    fn from(error: ExchangeError) -> Self {
        match error {
            ExchangeError::InsufficientFunds(msg) => GatewayError::InsufficientFunds(msg),
            ExchangeError::InvalidOrder(msg) => GatewayError::InvalidOrder(msg),
            ExchangeError::Network(msg) | ExchangeError::RateLimited(msg) => {
                GatewayError::Network(msg)
            }
            ExchangeError::Authentication(msg) => GatewayError::Exchange(msg),
            ExchangeError::Rejected { code, message } => {
                GatewayError::Exchange(format!("{} (code {})", message, code))
            }
            ExchangeError::MalformedResponse(msg) => GatewayError::Unexpected(msg),
        }
    }
}
