//! In-memory exchange client for tests and dry runs
//!
//! Records every call, serves positions from memory and can be scripted to
//! fail. With `filling_entries` enabled, accepted entry orders immediately
//! become open positions and reduce-only market orders flatten them, which
//! lets tests observe what a second signal would see.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::entities::balance::Balance;
use crate::domain::entities::order::OrderRequest;
use crate::domain::entities::position::{Position, PositionSide};
use crate::domain::repositories::exchange_client::{ExchangeClient, ExchangeError, ExchangeResult};
use crate::domain::value_objects::quantity::Quantity;

#[derive(Debug, Default)]
pub struct MockExchangeClient {
    positions: Mutex<Vec<Position>>,
    submitted: Mutex<Vec<OrderRequest>>,
    leverage_calls: Mutex<Vec<(String, u32)>>,
    order_responses: Mutex<VecDeque<ExchangeResult<Value>>>,
    position_fetches: AtomicUsize,
    next_order_id: AtomicU64,
    leverage_error: Option<ExchangeError>,
    positions_error: Option<ExchangeError>,
    fill_entries: bool,
    latency: Duration,
    balance: Option<Balance>,
    healthy: Option<bool>,
}

impl MockExchangeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(self, position: Position) -> Self {
        lock(&self.positions).push(position);
        self
    }

    pub fn failing_leverage(mut self, error: ExchangeError) -> Self {
        self.leverage_error = Some(error);
        self
    }

    pub fn failing_positions(mut self, error: ExchangeError) -> Self {
        self.positions_error = Some(error);
        self
    }

    /// Responses returned by successive `create_order` calls; once exhausted,
    /// orders are acknowledged with generated ids (`mock-1`, `mock-2`, ...)
    pub fn with_order_responses(self, responses: Vec<ExchangeResult<Value>>) -> Self {
        lock(&self.order_responses).extend(responses);
        self
    }

    pub fn filling_entries(mut self) -> Self {
        self.fill_entries = true;
        self
    }

    /// Delay applied to every position fetch and order submission
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_balance(mut self, balance: Balance) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = Some(false);
        self
    }

    pub fn submitted_orders(&self) -> Vec<OrderRequest> {
        lock(&self.submitted).clone()
    }

    pub fn leverage_calls(&self) -> Vec<(String, u32)> {
        lock(&self.leverage_calls).clone()
    }

    pub fn position_fetches(&self) -> usize {
        self.position_fetches.load(Ordering::SeqCst)
    }

    pub fn positions(&self) -> Vec<Position> {
        lock(&self.positions).clone()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn apply_fill(&self, order: &OrderRequest) {
        if order.trigger.is_some() {
            return;
        }

        let mut positions = lock(&self.positions);
        if order.reduce_only {
            positions.retain(|p| !p.is_for(&order.symbol));
        } else {
            positions.retain(|p| !p.is_for(&order.symbol));
            positions.push(Position::new(
                &order.symbol,
                PositionSide::from(order.side),
                order.quantity,
            ));
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl ExchangeClient for MockExchangeClient {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn fetch_positions(&self, symbol: &str) -> ExchangeResult<Vec<Position>> {
        self.position_fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(error) = &self.positions_error {
            return Err(error.clone());
        }

        Ok(lock(&self.positions)
            .iter()
            .filter(|p| p.is_for(symbol))
            .cloned()
            .collect())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()> {
        lock(&self.leverage_calls).push((symbol.to_string(), leverage));
        match &self.leverage_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn create_order(&self, order: &OrderRequest) -> ExchangeResult<Value> {
        self.simulate_latency().await;
        lock(&self.submitted).push(order.clone());

        let scripted = lock(&self.order_responses).pop_front();
        let response = scripted.unwrap_or_else(|| {
            let id = self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": { "orderId": format!("mock-{}", id), "orderLinkId": "" }
            }))
        });

        if response.is_ok() && self.fill_entries {
            self.apply_fill(order);
        }
        response
    }

    async fn fetch_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<Value> {
        let known = lock(&self.submitted).iter().any(|o| o.symbol == symbol);
        if !known {
            return Err(ExchangeError::InvalidOrder(format!(
                "Order {} not found on {}",
                order_id, symbol
            )));
        }
        Ok(json!({ "orderId": order_id, "symbol": symbol, "orderStatus": "New" }))
    }

    async fn fetch_balance(&self, coin: &str) -> ExchangeResult<Balance> {
        Ok(self.balance.clone().unwrap_or_else(|| {
            Balance::new(coin, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
        }))
    }

    async fn is_healthy(&self) -> bool {
        self.healthy.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::order::{OrderSide, OrderType};
    use crate::domain::value_objects::price::Price;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_generated_ids_are_sequential() {
        let client = MockExchangeClient::new();
        let order = OrderRequest::close("BTCUSDT", OrderSide::Sell, Quantity::new(dec!(1)).unwrap());

        let first = client.create_order(&order).await.unwrap();
        let second = client.create_order(&order).await.unwrap();
        assert_eq!(first["result"]["orderId"], "mock-1");
        assert_eq!(second["result"]["orderId"], "mock-2");
        assert_eq!(client.submitted_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_fills_open_and_close_positions() {
        let client = MockExchangeClient::new().filling_entries();
        let entry = OrderRequest::entry(
            "BTCUSDT",
            OrderSide::Buy,
            OrderType::Limit,
            Quantity::new(dec!(3)).unwrap(),
            Price::new(dec!(100)).unwrap(),
        );
        client.create_order(&entry).await.unwrap();

        let positions = client.fetch_positions("BTCUSDT").await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].side, PositionSide::Long);

        let close = OrderRequest::close("BTCUSDT", OrderSide::Sell, Quantity::new(dec!(3)).unwrap());
        client.create_order(&close).await.unwrap();
        assert!(client.fetch_positions("BTCUSDT").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_positions_filtered_by_symbol() {
        let client = MockExchangeClient::new()
            .with_position(Position::new("BTCUSDT", PositionSide::Long, Quantity::new(dec!(1)).unwrap()))
            .with_position(Position::new("ETHUSDT", PositionSide::Short, Quantity::new(dec!(2)).unwrap()));
        let positions = client.fetch_positions("ETHUSDT").await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].symbol, "ETHUSDT");
        assert_eq!(client.position_fetches(), 1);
    }
}
