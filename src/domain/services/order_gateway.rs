//! OrderGateway service - turns a trading signal into an entry order plus
//! take-profit and stop-loss protection
//!
//! The sequence is strictly best-effort and never retried:
//! 1. validate the signal (no exchange call when invalid)
//! 2. set leverage (failure logged and ignored)
//! 3. refuse to trade when a position is already open on the symbol
//! 4. size the order from margin × leverage / entry
//! 5. submit the entry order and keep its receipt
//! 6. submit both protective orders independently; failures are logged only

use std::sync::Arc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::domain::entities::order::{OrderReceipt, OrderRequest, OrderSide, ProtectionKind};
use crate::domain::entities::position::{Position, PositionSide};
use crate::domain::entities::signal::{Signal, ValidSignal};
use crate::domain::errors::{GatewayError, ValidationError};
use crate::domain::repositories::exchange_client::{ExchangeClient, ExchangeError};
use crate::domain::services::position_sizer::PositionSizer;
use crate::domain::services::symbol_lock::SymbolLocks;
use crate::domain::value_objects::{price::Price, quantity::Quantity};

/// Why a signal produced no orders
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    InvalidSignal(ValidationError),
    PositionAlreadyOpen {
        symbol: String,
        side: PositionSide,
        contracts: Quantity,
    },
    QuantityTooSmall {
        notional: Decimal,
        entry: Price,
    },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InvalidSignal(e) => write!(f, "Invalid signal: {}", e),
            SkipReason::PositionAlreadyOpen {
                symbol,
                side,
                contracts,
            } => write!(
                f,
                "A {} position of {} contracts is already open on {}",
                side, contracts, symbol
            ),
            SkipReason::QuantityTooSmall { notional, entry } => write!(
                f,
                "Notional {} at entry {} is less than one contract",
                notional, entry
            ),
        }
    }
}

/// Result of one protective order attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectionOutcome {
    pub kind: ProtectionKind,
    pub trigger_price: Price,
    pub result: Result<OrderReceipt, ExchangeError>,
}

impl ProtectionOutcome {
    pub fn receipt(&self) -> Option<&OrderReceipt> {
        self.result.as_ref().ok()
    }
}

/// Orders submitted for an accepted signal
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSignal {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Quantity,
    pub entry: OrderReceipt,
    pub take_profit: ProtectionOutcome,
    pub stop_loss: ProtectionOutcome,
}

impl PlacedSignal {
    /// True when both protective orders were accepted
    pub fn is_protected(&self) -> bool {
        self.take_profit.result.is_ok() && self.stop_loss.result.is_ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaceOutcome {
    Placed(PlacedSignal),
    Skipped(SkipReason),
}

impl PlaceOutcome {
    /// The entry order receipt, if any order was placed
    pub fn order(&self) -> Option<&OrderReceipt> {
        match self {
            PlaceOutcome::Placed(placed) => Some(&placed.entry),
            PlaceOutcome::Skipped(_) => None,
        }
    }
}

/// Places entry orders with attached protection
pub struct OrderGateway {
    client: Arc<dyn ExchangeClient>,
    locks: Arc<SymbolLocks>,
    sizer: PositionSizer,
}

impl OrderGateway {
    pub fn new(client: Arc<dyn ExchangeClient>, locks: Arc<SymbolLocks>) -> Self {
        Self {
            client,
            locks,
            sizer: PositionSizer::new(),
        }
    }

    /// Execute a signal - main entry point
    ///
    /// # Returns
    /// `PlaceOutcome::Skipped` when nothing was submitted, otherwise the entry
    /// receipt together with both protective outcomes. Errors are only returned
    /// for failures of the position fetch or the entry order itself.
    pub async fn place_order(&self, signal: &Signal) -> Result<PlaceOutcome, GatewayError> {
        let signal = match signal.validate() {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Rejecting signal for '{}': {}", signal.symbol, e);
                return Ok(PlaceOutcome::Skipped(SkipReason::InvalidSignal(e)));
            }
        };

        info!(
            "Received signal: {} {} entry={} tp={} sl={} margin={} leverage={}x",
            signal.side,
            signal.symbol,
            signal.entry,
            signal.take_profit,
            signal.stop_loss,
            signal.margin,
            signal.leverage
        );

        let _guard = self.locks.acquire(&signal.symbol).await;

        if let Err(e) = self
            .client
            .set_leverage(&signal.symbol, signal.leverage)
            .await
        {
            debug!(
                "Leverage {}x not applied on {} (continuing): {}",
                signal.leverage, signal.symbol, e
            );
        }

        let positions = self.client.fetch_positions(&signal.symbol).await?;
        if let Some(open) = find_open_position(&positions, &signal.symbol) {
            warn!(
                "Skipping order: {} position of {} contracts already open on {}",
                open.side, open.contracts, signal.symbol
            );
            return Ok(PlaceOutcome::Skipped(SkipReason::PositionAlreadyOpen {
                symbol: signal.symbol.clone(),
                side: open.side,
                contracts: open.contracts,
            }));
        }

        let sizing = match self.sizer.size(signal.margin, signal.leverage, signal.entry) {
            Ok(sizing) => sizing,
            Err(e) => {
                warn!("Cannot size order for {}: {}", signal.symbol, e);
                return Ok(PlaceOutcome::Skipped(SkipReason::InvalidSignal(e)));
            }
        };
        if sizing.quantity.is_zero() {
            warn!(
                "Skipping order: notional {} buys less than one contract of {} at {}",
                sizing.notional, signal.symbol, signal.entry
            );
            return Ok(PlaceOutcome::Skipped(SkipReason::QuantityTooSmall {
                notional: sizing.notional,
                entry: signal.entry,
            }));
        }

        let entry_order = OrderRequest::entry(
            &signal.symbol,
            signal.side,
            signal.order_type,
            sizing.quantity,
            signal.entry,
        );
        let response = self.client.create_order(&entry_order).await?;
        let entry = OrderReceipt::from_response(response);
        if entry.order_id().is_none() {
            warn!("Entry order on {} returned no order id: {}", signal.symbol, entry);
        }
        info!(
            "Entry order placed: {} {} {} @ {} -> {}",
            signal.side, sizing.quantity, signal.symbol, signal.entry, entry
        );

        let take_profit = self
            .protect(&signal, sizing.quantity, ProtectionKind::TakeProfit, signal.take_profit)
            .await;
        let stop_loss = self
            .protect(&signal, sizing.quantity, ProtectionKind::StopLoss, signal.stop_loss)
            .await;

        Ok(PlaceOutcome::Placed(PlacedSignal {
            symbol: signal.symbol,
            side: signal.side,
            quantity: sizing.quantity,
            entry,
            take_profit,
            stop_loss,
        }))
    }

    async fn protect(
        &self,
        signal: &ValidSignal,
        quantity: Quantity,
        kind: ProtectionKind,
        trigger_price: Price,
    ) -> ProtectionOutcome {
        let order =
            OrderRequest::protective(&signal.symbol, signal.side, kind, quantity, trigger_price);

        let result = match self.client.create_order(&order).await {
            Ok(response) => {
                let receipt = OrderReceipt::from_response(response);
                info!(
                    "{} order placed on {} @ {} -> {}",
                    kind, signal.symbol, trigger_price, receipt
                );
                Ok(receipt)
            }
            Err(e) => {
                error!(
                    "Failed to place {} order on {} @ {}; position is unprotected: {}",
                    kind, signal.symbol, trigger_price, e
                );
                Err(e)
            }
        };

        ProtectionOutcome {
            kind,
            trigger_price,
            result,
        }
    }
}

/// First position on `symbol` with a nonzero size
pub(crate) fn find_open_position<'a>(positions: &'a [Position], symbol: &str) -> Option<&'a Position> {
    positions.iter().find(|p| p.is_for(symbol) && p.is_open())
}
