//! HTTP surface end-to-end tests
//!
//! Drives the full router (rate limit, body limit, CORS, tracing layers) with
//! `tower::ServiceExt::oneshot` against the in-memory exchange client.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use sigexec::application::handlers::signal_handler::AppState;
use sigexec::application::router::{build_router, MAX_BODY_BYTES};
use sigexec::domain::entities::balance::Balance;
use sigexec::domain::entities::order::{OrderSide, OrderType};
use sigexec::domain::entities::position::{Position, PositionSide};
use sigexec::domain::repositories::exchange_client::ExchangeError;
use sigexec::domain::value_objects::quantity::Quantity;
use sigexec::infrastructure::mock_exchange_client::MockExchangeClient;

fn app(client: Arc<MockExchangeClient>) -> Router {
    build_router(AppState::new(client), 10_000)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn buy_signal() -> String {
    json!({ "symbol": "BTCUSDT", "side": "buy", "entry": 50, "tp": 55, "sl": 45 }).to_string()
}

fn long(symbol: &str, contracts: rust_decimal::Decimal) -> Position {
    Position::new(symbol, PositionSide::Long, Quantity::new(contracts).unwrap())
}

#[tokio::test]
async fn test_root_reports_running() {
    let (status, body) = send(app(Arc::new(MockExchangeClient::new())), Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Execution Service is running." }));
}

#[tokio::test]
async fn test_signal_places_entry_and_protection() {
    let client = Arc::new(MockExchangeClient::new());
    let (status, body) = send(app(client.clone()), Method::POST, "/signals", Some(&buy_signal())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "order_id": "mock-1",
            "take_profit_order_id": "mock-2",
            "stop_loss_order_id": "mock-3"
        })
    );

    let orders = client.submitted_orders();
    assert_eq!(orders.len(), 3);
    assert_eq!(orders[0].order_type, OrderType::Limit);
    assert_eq!(orders[0].quantity.value(), dec!(6));
    assert!(orders[1..].iter().all(|o| o.side == OrderSide::Sell && o.reduce_only));
    assert_eq!(client.leverage_calls(), vec![("BTCUSDT".to_string(), 10)]);
}

#[tokio::test]
async fn test_trailing_slash_route() {
    let client = Arc::new(MockExchangeClient::new());
    let (status, _) = send(app(client), Method::POST, "/signals/", Some(&buy_signal())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_open_position_yields_bad_request_without_orders() {
    let client = Arc::new(MockExchangeClient::new().with_position(long("BTCUSDT", dec!(6))));
    let (status, body) = send(app(client.clone()), Method::POST, "/signals", Some(&buy_signal())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already open"));
    assert!(client.submitted_orders().is_empty());
}

#[tokio::test]
async fn test_quantity_below_one_contract_is_rejected() {
    let client = Arc::new(MockExchangeClient::new());
    let signal = json!({
        "symbol": "BTCUSDT", "side": "buy", "entry": 1000, "tp": 1100, "sl": 900,
        "margin": 1, "leverage": 1
    });
    let (status, _) = send(app(client.clone()), Method::POST, "/signals", Some(&signal.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(client.submitted_orders().is_empty());
}

#[tokio::test]
async fn test_invalid_side_is_rejected_before_exchange() {
    let client = Arc::new(MockExchangeClient::new());
    let signal = json!({ "symbol": "BTCUSDT", "side": "hold", "entry": 50, "tp": 55, "sl": 45 });
    let (status, body) = send(app(client.clone()), Method::POST, "/signals", Some(&signal.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("hold"));
    assert_eq!(client.position_fetches(), 0);
    assert!(client.leverage_calls().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let client = Arc::new(MockExchangeClient::new());
    let (status, body) = send(app(client.clone()), Method::POST, "/signals", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(app(client), Method::POST, "/signals", Some(r#"{"symbol":"BTCUSDT"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_insufficient_funds_is_bad_request() {
    let client = Arc::new(MockExchangeClient::new().with_order_responses(vec![Err(
        ExchangeError::InsufficientFunds("ab not enough for new order".to_string()),
    )]));
    let (status, body) = send(app(client), Method::POST, "/signals", Some(&buy_signal())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Insufficient funds"));
}

#[tokio::test]
async fn test_network_failure_is_gateway_timeout() {
    let client = Arc::new(
        MockExchangeClient::new().failing_positions(ExchangeError::Network("timed out".to_string())),
    );
    let (status, _) = send(app(client), Method::POST, "/signals", Some(&buy_signal())).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_unexpected_failure_hides_detail() {
    let client = Arc::new(MockExchangeClient::new().with_order_responses(vec![Err(
        ExchangeError::MalformedResponse("secret internal detail".to_string()),
    )]));
    let (status, body) = send(app(client), Method::POST, "/signals", Some(&buy_signal())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
}

#[tokio::test]
async fn test_protective_failure_still_returns_entry() {
    let client = Arc::new(MockExchangeClient::new().with_order_responses(vec![
        Ok(json!({ "retCode": 0, "result": { "orderId": "entry-1" } })),
        Err(ExchangeError::InvalidOrder("TriggerPrice invalid".to_string())),
        Ok(json!({ "retCode": 0, "result": { "orderId": "sl-1" } })),
    ]));
    let (status, body) = send(app(client), Method::POST, "/signals", Some(&buy_signal())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "order_id": "entry-1", "stop_loss_order_id": "sl-1" }));
}

#[tokio::test]
async fn test_close_long_position() {
    let client = Arc::new(MockExchangeClient::new().with_position(long("DOGEUSDT", dec!(6))));
    let body = json!({ "symbol": "DOGEUSDT" }).to_string();
    let (status, response) = send(app(client.clone()), Method::POST, "/close", Some(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "close_order_id": "mock-1" }));

    let orders = client.submitted_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, OrderSide::Sell);
    assert_eq!(orders[0].order_type, OrderType::Market);
    assert!(orders[0].reduce_only);
}

#[tokio::test]
async fn test_close_without_position_is_bad_request() {
    let client = Arc::new(MockExchangeClient::new());
    let body = json!({ "symbol": "DOGEUSDT" }).to_string();
    let (status, _) = send(app(client.clone()), Method::POST, "/close", Some(&body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(client.submitted_orders().is_empty());
}

#[tokio::test]
async fn test_concurrent_signals_place_one_entry() {
    let client = Arc::new(
        MockExchangeClient::new()
            .filling_entries()
            .with_latency(Duration::from_millis(20)),
    );
    let router = app(client.clone());

    let spawn_signal = |router: Router| {
        tokio::spawn(async move {
            let body = buy_signal();
            send(router, Method::POST, "/signals", Some(&body)).await
        })
    };
    let first = spawn_signal(router.clone());
    let second = spawn_signal(router);
    let (first, second) = (first.await.unwrap(), second.await.unwrap());

    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::BAD_REQUEST]);

    let entries = client
        .submitted_orders()
        .into_iter()
        .filter(|o| !o.reduce_only)
        .count();
    assert_eq!(entries, 1);
}

#[tokio::test]
async fn test_balance_endpoint() {
    let client = Arc::new(
        MockExchangeClient::new().with_balance(Balance::new("USDT", dec!(100), dec!(104.5), dec!(70))),
    );
    let (status, body) = send(app(client), Method::GET, "/balance", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["coin"], "USDT");
    assert_eq!(body["available"], "70");
}

#[tokio::test]
async fn test_health_reports_exchange_state() {
    let (status, body) = send(app(Arc::new(MockExchangeClient::new())), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exchange_reachable"], true);

    let client = Arc::new(MockExchangeClient::new().unhealthy());
    let (status, body) = send(app(client), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_order_lookup() {
    let client = Arc::new(MockExchangeClient::new());
    send(app(client.clone()), Method::POST, "/signals", Some(&buy_signal())).await;

    let (status, body) = send(app(client.clone()), Method::GET, "/orders/btcusdt/mock-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orderId"], "mock-1");

    let (status, _) = send(app(client), Method::GET, "/orders/ETHUSDT/nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_limit_returns_too_many_requests() {
    let router = build_router(AppState::new(Arc::new(MockExchangeClient::new())), 1);
    let (first, _) = send(router.clone(), Method::GET, "/", None).await;
    let (second, body) = send(router, Method::GET, "/", None).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let client = Arc::new(MockExchangeClient::new());
    let payload = "x".repeat(MAX_BODY_BYTES + 1);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/signals")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();

    let response = app(client.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(client.position_fetches(), 0);
}
