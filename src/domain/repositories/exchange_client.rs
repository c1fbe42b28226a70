//! Exchange Client Trait
//!
//! This module defines the `ExchangeClient` trait, the capability the gateways
//! consume to talk to a venue. Authentication, request signing and transport
//! live behind it, so the gateways can be driven by a mock in tests and the
//! venue can be swapped without touching order logic.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::entities::balance::Balance;
use crate::domain::entities::order::OrderRequest;
use crate::domain::entities::position::Position;

/// Common result type for exchange operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Errors that can occur during exchange operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExchangeError {
    /// Margin or wallet balance too low for the order
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The venue refused the order parameters (size, price, symbol, reduce-only rules)
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Transport failure or venue unavailable
    #[error("Network error: {0}")]
    Network(String),

    /// Request throttled by the venue
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Key, signature or permission rejected
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Any other business rejection, with the venue's own code
    #[error("Exchange rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Exchange client trait providing the calls the gateways need
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Get the name of this exchange
    fn name(&self) -> &str;

    /// Fetch the positions currently held on `symbol`
    ///
    /// Flat entries may be included; callers filter on size.
    async fn fetch_positions(&self, symbol: &str) -> ExchangeResult<Vec<Position>>;

    /// Set the leverage used for new positions on `symbol`
    ///
    /// Venues commonly reject a no-op change, so callers treat failure as advisory.
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()>;

    /// Submit an order
    ///
    /// # Returns
    /// The raw venue response; identifier extraction is left to the caller
    /// because response shapes differ per venue.
    async fn create_order(&self, order: &OrderRequest) -> ExchangeResult<Value>;

    /// Look up a single order by its exchange-assigned id
    async fn fetch_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<Value>;

    /// Fetch the balance of one coin
    async fn fetch_balance(&self, coin: &str) -> ExchangeResult<Balance>;

    /// Check if the exchange is reachable
    async fn is_healthy(&self) -> bool {
        // Default implementation - can be overridden
        true
    }
}
