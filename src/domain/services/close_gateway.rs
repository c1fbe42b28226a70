//! CloseGateway service - flattens an open position with a reduce-only market order

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::entities::order::{OrderReceipt, OrderRequest};
use crate::domain::entities::signal::normalize_symbol;
use crate::domain::errors::GatewayError;
use crate::domain::repositories::exchange_client::ExchangeClient;
use crate::domain::services::order_gateway::find_open_position;
use crate::domain::services::symbol_lock::SymbolLocks;

pub struct CloseGateway {
    client: Arc<dyn ExchangeClient>,
    locks: Arc<SymbolLocks>,
}

impl CloseGateway {
    pub fn new(client: Arc<dyn ExchangeClient>, locks: Arc<SymbolLocks>) -> Self {
        Self { client, locks }
    }

    /// Close the first open position on `symbol`
    ///
    /// # Returns
    /// `None` when there is nothing to close, otherwise the receipt of the
    /// closing order.
    pub async fn close_position(&self, symbol: &str) -> Result<Option<OrderReceipt>, GatewayError> {
        let symbol = match normalize_symbol(symbol) {
            Some(symbol) => symbol,
            None => {
                warn!("Close requested without a symbol");
                return Ok(None);
            }
        };

        let _guard = self.locks.acquire(&symbol).await;

        let positions = self.client.fetch_positions(&symbol).await?;
        let position = match find_open_position(&positions, &symbol) {
            Some(position) => position,
            None => {
                info!("No open position for {}", symbol);
                return Ok(None);
            }
        };

        let close_side = position.side.closing_side();
        info!(
            "Closing {} position: {} {} contracts @ market",
            position.side, position.contracts, symbol
        );

        let order = OrderRequest::close(&symbol, close_side, position.contracts);
        let response = self.client.create_order(&order).await?;
        let receipt = OrderReceipt::from_response(response);

        info!("Position closed on {} -> {}", symbol, receipt);
        Ok(Some(receipt))
    }
}
