use crate::domain::entities::balance::Balance;
use crate::domain::entities::order::{OrderRequest, TriggerDirection};
use crate::domain::entities::position::{Position, PositionSide};
use crate::domain::repositories::exchange_client::{ExchangeClient, ExchangeError, ExchangeResult};
use crate::domain::value_objects::quantity::Quantity;
use crate::secrets::Credentials;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use url::form_urlencoded;

/// Bybit V5 API endpoints
const BYBIT_API_BASE: &str = "https://api.bybit.com";
const BYBIT_TESTNET_BASE: &str = "https://api-testnet.bybit.com";

/// USDT-margined perpetuals
const CATEGORY: &str = "linear";

const DEFAULT_RECV_WINDOW_MS: u64 = 5_000;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Returned by set-leverage when the requested value is already in effect
const LEVERAGE_NOT_MODIFIED: i64 = 110043;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BybitNetwork {
    Mainnet,
    Testnet,
}

impl BybitNetwork {
    pub fn api_base(&self) -> &'static str {
        match self {
            BybitNetwork::Mainnet => BYBIT_API_BASE,
            BybitNetwork::Testnet => BYBIT_TESTNET_BASE,
        }
    }
}

/// Bybit connection configuration
#[derive(Debug, Clone)]
pub struct BybitConfig {
    pub api_base: String,
    pub credentials: Credentials,
    pub recv_window_ms: u64,
    pub timeout: Duration,
}

impl BybitConfig {
    pub fn new(credentials: Credentials, network: BybitNetwork) -> Self {
        Self {
            api_base: network.api_base().to_string(),
            credentials,
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at another host, e.g. a local mock server
    pub fn with_base_url(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Order body for `POST /v5/order/create`
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BybitOrder {
    pub category: String,
    pub symbol: String,
    pub side: String,
    pub order_type: String,
    pub qty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<String>,
    pub reduce_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<String>,
    /// 1: fires when price rises to the trigger, 2: when it falls to it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_direction: Option<u8>,
}

impl From<&OrderRequest> for BybitOrder {
    fn from(order: &OrderRequest) -> Self {
        BybitOrder {
            category: CATEGORY.to_string(),
            symbol: order.symbol.clone(),
            side: order.side.to_string(),
            order_type: order.order_type.to_string(),
            qty: order.quantity.to_string(),
            price: order.price.map(|p| p.to_string()),
            time_in_force: order.time_in_force.map(|tif| tif.to_string()),
            reduce_only: order.reduce_only,
            trigger_price: order.trigger.map(|t| t.price.to_string()),
            trigger_direction: order.trigger.map(|t| match t.direction {
                TriggerDirection::Rising => 1,
                TriggerDirection::Falling => 2,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetLeverageBody<'a> {
    category: &'a str,
    symbol: &'a str,
    buy_leverage: String,
    sell_leverage: String,
}

/// Common `{retCode, retMsg, result}` wrapper around every V5 response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitEnvelope {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct BybitList<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitPosition {
    symbol: String,
    /// "Buy", "Sell", or empty when flat
    side: String,
    size: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitWallet {
    #[serde(default)]
    total_available_balance: String,
    #[serde(default)]
    coin: Vec<BybitCoinBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitCoinBalance {
    coin: String,
    #[serde(default)]
    wallet_balance: String,
    #[serde(default)]
    equity: String,
    #[serde(default)]
    available_to_withdraw: String,
}

/// HMAC-SHA256 signature over `timestamp + api_key + recv_window + payload`,
/// hex encoded. `payload` is the query string for GET and the JSON body for POST.
pub fn sign_request(
    api_secret: &str,
    timestamp: u64,
    api_key: &str,
    recv_window_ms: u64,
    payload: &str,
) -> ExchangeResult<String> {
    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|e| ExchangeError::Authentication(format!("HMAC error: {}", e)))?;
    mac.update(format!("{}{}{}{}", timestamp, api_key, recv_window_ms, payload).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Map a non-zero `retCode` onto the exchange error taxonomy
pub fn classify_ret_code(code: i64, message: &str) -> ExchangeError {
    let message = message.to_string();
    match code {
        110004 | 110007 | 110012 | 110044 | 110045 | 110052 | 170131 => {
            ExchangeError::InsufficientFunds(message)
        }
        10001 | 110001 | 110003 | 110009 | 110017 | 110020 | 110021 | 110094 | 170136 => {
            ExchangeError::InvalidOrder(message)
        }
        10003 | 10004 | 10005 | 10007 | 10010 | 33004 => ExchangeError::Authentication(message),
        10006 | 10018 => ExchangeError::RateLimited(message),
        10000 | 10016 => ExchangeError::Network(message),
        _ => ExchangeError::Rejected { code, message },
    }
}

/// Percent-encode query pairs once; the result is both signed and sent
pub fn encode_query(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn parse_decimal(field: &str, raw: &str) -> ExchangeResult<Decimal> {
    if raw.trim().is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(raw)
        .map_err(|e| ExchangeError::MalformedResponse(format!("{} '{}': {}", field, raw, e)))
}

fn parse_result<T: serde::de::DeserializeOwned>(envelope: &Value) -> ExchangeResult<T> {
    let result = envelope.get("result").cloned().unwrap_or(Value::Null);
    serde_json::from_value(result)
        .map_err(|e| ExchangeError::MalformedResponse(format!("Unexpected result shape: {}", e)))
}

/// Bybit V5 REST client for USDT linear perpetuals
pub struct BybitClient {
    client: Client,
    config: BybitConfig,
}

impl BybitClient {
    pub fn new(config: BybitConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("sigexec/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExchangeError::Network(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "Bybit client configured for {} (key {})",
            config.api_base,
            config.credentials.masked_key()
        );
        Ok(Self { client, config })
    }

    fn timestamp_ms() -> ExchangeResult<u64> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .map_err(|e| ExchangeError::Network(format!("Time error: {}", e)))
    }

    fn auth_headers(&self, payload: &str) -> ExchangeResult<Vec<(&'static str, String)>> {
        let timestamp = Self::timestamp_ms()?;
        let api_key = self.config.credentials.api_key();
        let signature = sign_request(
            self.config.credentials.api_secret(),
            timestamp,
            api_key,
            self.config.recv_window_ms,
            payload,
        )?;

        Ok(vec![
            ("X-BAPI-API-KEY", api_key.to_string()),
            ("X-BAPI-SIGN", signature),
            ("X-BAPI-TIMESTAMP", timestamp.to_string()),
            ("X-BAPI-RECV-WINDOW", self.config.recv_window_ms.to_string()),
        ])
    }

    /// Signed GET; the encoded query string is signed exactly as sent
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> ExchangeResult<Value> {
        let query_string = encode_query(query);
        let url = format!("{}{}?{}", self.config.api_base, path, query_string);

        let mut request = self.client.get(&url);
        for (key, value) in self.auth_headers(&query_string)? {
            request = request.header(key, value);
        }

        debug!("GET {}", path);
        let response = request.send().await.map_err(Self::transport_error)?;
        Self::read_envelope(response).await
    }

    /// Signed POST with a JSON body
    async fn post<B: Serialize>(&self, path: &str, body: &B) -> ExchangeResult<Value> {
        let url = format!("{}{}", self.config.api_base, path);
        let body = serde_json::to_string(body)
            .map_err(|e| ExchangeError::InvalidOrder(format!("Failed to serialize body: {}", e)))?;

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        for (key, value) in self.auth_headers(&body)? {
            request = request.header(key, value);
        }

        debug!("POST {} {}", path, body);
        let response = request.body(body).send().await.map_err(Self::transport_error)?;
        Self::read_envelope(response).await
    }

    fn transport_error(error: reqwest::Error) -> ExchangeError {
        if error.is_timeout() {
            ExchangeError::Network(format!("Request timed out: {}", error))
        } else {
            ExchangeError::Network(format!("Request failed: {}", error))
        }
    }

    /// Check HTTP status and `retCode`, returning the whole envelope on success
    async fn read_envelope(response: reqwest::Response) -> ExchangeResult<Value> {
        let status = response.status();
        let text = response.text().await.map_err(Self::transport_error)?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ExchangeError::RateLimited(format!("HTTP 429: {}", text)));
        }
        if status.is_server_error() {
            return Err(ExchangeError::Network(format!("HTTP {}: {}", status, text)));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ExchangeError::Authentication(format!("HTTP {}: {}", status, text)));
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                ExchangeError::MalformedResponse(format!("Invalid JSON: {}", e))
            } else {
                ExchangeError::Rejected {
                    code: i64::from(status.as_u16()),
                    message: text.clone(),
                }
            }
        })?;

        let envelope: BybitEnvelope = serde_json::from_value(body.clone())
            .map_err(|e| ExchangeError::MalformedResponse(format!("Missing retCode: {}", e)))?;

        if envelope.ret_code != 0 {
            return Err(classify_ret_code(envelope.ret_code, &envelope.ret_msg));
        }
        if envelope.result.is_null() {
            debug!("Response carried no result object");
        }
        Ok(body)
    }
}

#[async_trait]
impl ExchangeClient for BybitClient {
    fn name(&self) -> &str {
        "Bybit"
    }

    async fn fetch_positions(&self, symbol: &str) -> ExchangeResult<Vec<Position>> {
        let body = self
            .get("/v5/position/list", &[("category", CATEGORY), ("symbol", symbol)])
            .await?;
        let list: BybitList<BybitPosition> = parse_result(&body)?;

        let mut positions = Vec::new();
        for raw in list.list {
            let side = match raw.side.as_str() {
                "Buy" => PositionSide::Long,
                "Sell" => PositionSide::Short,
                _ => continue,
            };
            let size = parse_decimal("size", &raw.size)?;
            positions.push(Position::new(&raw.symbol, side, Quantity::from_abs(size)));
        }
        Ok(positions)
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()> {
        let body = SetLeverageBody {
            category: CATEGORY,
            symbol,
            buy_leverage: leverage.to_string(),
            sell_leverage: leverage.to_string(),
        };

        match self.post("/v5/position/set-leverage", &body).await {
            Ok(_) => Ok(()),
            Err(ExchangeError::Rejected { code, .. }) if code == LEVERAGE_NOT_MODIFIED => {
                debug!("Leverage for {} already {}x", symbol, leverage);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn create_order(&self, order: &OrderRequest) -> ExchangeResult<Value> {
        order
            .validate()
            .map_err(|e| ExchangeError::InvalidOrder(e.to_string()))?;
        let body = BybitOrder::from(order);
        self.post("/v5/order/create", &body).await
    }

    async fn fetch_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<Value> {
        let body = self
            .get(
                "/v5/order/realtime",
                &[("category", CATEGORY), ("symbol", symbol), ("orderId", order_id)],
            )
            .await?;
        let list: BybitList<Value> = parse_result(&body)?;

        list.list.into_iter().next().ok_or_else(|| {
            ExchangeError::InvalidOrder(format!("Order {} not found on {}", order_id, symbol))
        })
    }

    async fn fetch_balance(&self, coin: &str) -> ExchangeResult<Balance> {
        let body = self
            .get(
                "/v5/account/wallet-balance",
                &[("accountType", "UNIFIED"), ("coin", coin)],
            )
            .await?;
        let list: BybitList<BybitWallet> = parse_result(&body)?;

        let wallet = list
            .list
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::MalformedResponse("No wallet in response".to_string()))?;
        let entry = wallet
            .coin
            .iter()
            .find(|c| c.coin.eq_ignore_ascii_case(coin))
            .ok_or_else(|| {
                ExchangeError::MalformedResponse(format!("No {} balance in wallet", coin))
            })?;

        // Unified accounts may leave availableToWithdraw blank; fall back to the account total.
        let available = if entry.available_to_withdraw.trim().is_empty() {
            parse_decimal("totalAvailableBalance", &wallet.total_available_balance)?
        } else {
            parse_decimal("availableToWithdraw", &entry.available_to_withdraw)?
        };

        Ok(Balance::new(
            coin,
            parse_decimal("walletBalance", &entry.wallet_balance)?,
            parse_decimal("equity", &entry.equity)?,
            available,
        ))
    }

    async fn is_healthy(&self) -> bool {
        let url = format!("{}/v5/market/time", self.config.api_base);
        match self.client.get(&url).send().await {
            Ok(response) => Self::read_envelope(response).await.is_ok(),
            Err(e) => {
                warn!("Bybit health probe failed: {}", e);
                false
            }
        }
    }
}
