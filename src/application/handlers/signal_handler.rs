use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::entities::balance::Balance;
use crate::domain::entities::order::OrderReceipt;
use crate::domain::entities::signal::{normalize_symbol, CloseRequest, Signal};
use crate::domain::errors::GatewayError;
use crate::domain::repositories::exchange_client::ExchangeClient;
use crate::domain::services::close_gateway::CloseGateway;
use crate::domain::services::order_gateway::{OrderGateway, PlaceOutcome};
use crate::domain::services::symbol_lock::SymbolLocks;

/// Coin reported by `GET /balance`
pub const SETTLEMENT_COIN: &str = "USDT";

/// Shared handler state; both gateways serialize on the same lock table
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderGateway>,
    pub closer: Arc<CloseGateway>,
    pub client: Arc<dyn ExchangeClient>,
}

impl AppState {
    pub fn new(client: Arc<dyn ExchangeClient>) -> Self {
        let locks = Arc::new(SymbolLocks::new());
        Self {
            orders: Arc::new(OrderGateway::new(Arc::clone(&client), Arc::clone(&locks))),
            closer: Arc::new(CloseGateway::new(Arc::clone(&client), locks)),
            client,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Request understood but nothing was done
    NotExecuted(String),
    /// Body could not be read as JSON of the expected shape
    BadPayload(JsonRejection),
    Gateway(GatewayError),
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        ApiError::Gateway(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadPayload(rejection)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotExecuted(_) => StatusCode::BAD_REQUEST,
            ApiError::BadPayload(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::BadPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::Gateway(error) => match error {
                GatewayError::InsufficientFunds(_)
                | GatewayError::InvalidOrder(_)
                | GatewayError::Exchange(_) => StatusCode::BAD_REQUEST,
                GatewayError::Network(_) => StatusCode::GATEWAY_TIMEOUT,
                GatewayError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::NotExecuted(message) => message.clone(),
            ApiError::BadPayload(rejection) => format!("Invalid request body: {}", rejection.body_text()),
            ApiError::Gateway(GatewayError::Unexpected(_)) => "Internal server error".to_string(),
            ApiError::Gateway(error) => error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Gateway(error @ GatewayError::Unexpected(_)) => {
                error!("[{}] {}", error.error_code(), error);
            }
            ApiError::Gateway(error) => {
                warn!("[{}] {}", error.error_code(), error);
            }
            _ => {}
        }
        (status, Json(ErrorResponse { error: self.message() })).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignalResponse {
    pub order_id: OrderReceipt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_order_id: Option<OrderReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_order_id: Option<OrderReceipt>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseResponse {
    pub close_order_id: OrderReceipt,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub exchange: String,
    pub exchange_reachable: bool,
}

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "Execution Service is running.".to_string(),
    })
}

/// Exchange reachability; 503 when the venue does not answer
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let reachable = state.client.is_healthy().await;
    let status = if reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if reachable { "ok" } else { "degraded" }.to_string(),
            exchange: state.client.name().to_string(),
            exchange_reachable: reachable,
        }),
    )
}

/// Execute a trading signal
pub async fn create_signal(
    State(state): State<AppState>,
    payload: Result<Json<Signal>, JsonRejection>,
) -> Result<Json<SignalResponse>, ApiError> {
    let Json(signal) = payload?;

    match state.orders.place_order(&signal).await? {
        PlaceOutcome::Placed(placed) => Ok(Json(SignalResponse {
            order_id: placed.entry,
            take_profit_order_id: placed.take_profit.result.ok(),
            stop_loss_order_id: placed.stop_loss.result.ok(),
        })),
        PlaceOutcome::Skipped(reason) => Err(ApiError::NotExecuted(format!(
            "Order could not be placed: {}",
            reason
        ))),
    }
}

/// Close the open position on a symbol
pub async fn close_position(
    State(state): State<AppState>,
    payload: Result<Json<CloseRequest>, JsonRejection>,
) -> Result<Json<CloseResponse>, ApiError> {
    let Json(request) = payload?;
    info!("Received close request for {}", request.symbol);

    match state.closer.close_position(&request.symbol).await? {
        Some(receipt) => Ok(Json(CloseResponse {
            close_order_id: receipt,
        })),
        None => Err(ApiError::NotExecuted(format!(
            "No open position to close for '{}'",
            request.symbol.trim()
        ))),
    }
}

pub async fn get_balance(State(state): State<AppState>) -> Result<Json<Balance>, ApiError> {
    let balance = state
        .client
        .fetch_balance(SETTLEMENT_COIN)
        .await
        .map_err(GatewayError::from)?;
    Ok(Json(balance))
}

/// Raw exchange view of one order
pub async fn get_order(
    State(state): State<AppState>,
    Path((symbol, order_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let symbol = normalize_symbol(&symbol)
        .ok_or_else(|| ApiError::NotExecuted("Symbol must not be empty".to_string()))?;
    let order = state
        .client
        .fetch_order(&symbol, &order_id)
        .await
        .map_err(GatewayError::from)?;
    Ok(Json(order))
}
