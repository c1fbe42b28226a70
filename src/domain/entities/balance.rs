//! Balance entity - account balance for one coin as reported by the exchange

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Balance snapshot for a single coin; fetched on demand, never cached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    pub coin: String,
    /// Wallet balance excluding unrealised PnL
    pub wallet_balance: Decimal,
    /// Wallet balance plus unrealised PnL
    pub equity: Decimal,
    /// Amount free to open new positions or withdraw
    pub available: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl Balance {
    pub fn new(coin: &str, wallet_balance: Decimal, equity: Decimal, available: Decimal) -> Self {
        Balance {
            coin: coin.to_uppercase(),
            wallet_balance,
            equity,
            available,
            fetched_at: Utc::now(),
        }
    }
}
