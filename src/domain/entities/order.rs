use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::domain::errors::ValidationError;
use crate::domain::value_objects::{price::Price, quantity::Quantity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Side that reduces a position opened on this side
    pub fn opposite(&self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl FromStr for OrderSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            _ => Err(ValidationError::InvalidSide(s.to_string())),
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "Buy"),
            OrderSide::Sell => write!(f, "Sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderType {
    Market,
    #[default]
    Limit,
}

impl FromStr for OrderType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "limit" => Ok(OrderType::Limit),
            "market" => Ok(OrderType::Market),
            _ => Err(ValidationError::InvalidOrderType(s.to_string())),
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "Market"),
            OrderType::Limit => write!(f, "Limit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    GoodTillCancel,
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeInForce::GoodTillCancel => write!(f, "GTC"),
        }
    }
}

/// Direction the mark price must cross for a conditional order to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDirection {
    Rising,
    Falling,
}

/// The two protective legs attached to every entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionKind {
    TakeProfit,
    StopLoss,
}

impl ProtectionKind {
    /// TP fires in the position's favor, SL against it.
    pub fn trigger_direction(&self, entry_side: OrderSide) -> TriggerDirection {
        match (self, entry_side) {
            (ProtectionKind::TakeProfit, OrderSide::Buy) => TriggerDirection::Rising,
            (ProtectionKind::TakeProfit, OrderSide::Sell) => TriggerDirection::Falling,
            (ProtectionKind::StopLoss, OrderSide::Buy) => TriggerDirection::Falling,
            (ProtectionKind::StopLoss, OrderSide::Sell) => TriggerDirection::Rising,
        }
    }
}

impl std::fmt::Display for ProtectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtectionKind::TakeProfit => write!(f, "take-profit"),
            ProtectionKind::StopLoss => write!(f, "stop-loss"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    pub price: Price,
    pub direction: TriggerDirection,
}

/// Venue-neutral description of an order to submit
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub price: Option<Price>,
    pub time_in_force: Option<TimeInForce>,
    pub reduce_only: bool,
    pub trigger: Option<Trigger>,
}

impl OrderRequest {
    /// Position-opening order. Limit orders rest at `price` until cancelled;
    /// market orders ignore it.
    pub fn entry(
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        quantity: Quantity,
        price: Price,
    ) -> Self {
        let (price, time_in_force) = match order_type {
            OrderType::Limit => (Some(price), Some(TimeInForce::GoodTillCancel)),
            OrderType::Market => (None, None),
        };

        OrderRequest {
            symbol: symbol.to_string(),
            side,
            order_type,
            quantity,
            price,
            time_in_force,
            reduce_only: false,
            trigger: None,
        }
    }

    /// Reduce-only conditional market order guarding a position opened on `entry_side`
    pub fn protective(
        symbol: &str,
        entry_side: OrderSide,
        kind: ProtectionKind,
        quantity: Quantity,
        trigger_price: Price,
    ) -> Self {
        OrderRequest {
            symbol: symbol.to_string(),
            side: entry_side.opposite(),
            order_type: OrderType::Market,
            quantity,
            price: None,
            time_in_force: None,
            reduce_only: true,
            trigger: Some(Trigger {
                price: trigger_price,
                direction: kind.trigger_direction(entry_side),
            }),
        }
    }

    /// Reduce-only market order flattening `quantity` contracts
    pub fn close(symbol: &str, side: OrderSide, quantity: Quantity) -> Self {
        OrderRequest {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            time_in_force: None,
            reduce_only: true,
            trigger: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if matches!(self.order_type, OrderType::Limit) && self.price.is_none() {
            return Err(ValidationError::MissingLimitPrice);
        }
        Ok(())
    }
}

/// What the exchange handed back for a submitted order.
///
/// Venues nest the identifier differently, so when no id can be found the
/// untouched response is kept for the caller to inspect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderReceipt {
    Id(String),
    Raw(Value),
}

impl OrderReceipt {
    const ID_POINTERS: [&'static str; 3] = ["/result/orderId", "/orderId", "/id"];

    pub fn from_response(response: Value) -> Self {
        let id = Self::ID_POINTERS.iter().find_map(|pointer| {
            response
                .pointer(pointer)
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        });

        match id {
            Some(id) => OrderReceipt::Id(id),
            None => OrderReceipt::Raw(response),
        }
    }

    pub fn order_id(&self) -> Option<&str> {
        match self {
            OrderReceipt::Id(id) => Some(id),
            OrderReceipt::Raw(_) => None,
        }
    }
}

impl std::fmt::Display for OrderReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderReceipt::Id(id) => write!(f, "{}", id),
            OrderReceipt::Raw(raw) => write!(f, "raw:{}", raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn qty(v: rust_decimal::Decimal) -> Quantity {
        Quantity::new(v).unwrap()
    }

    fn px(v: rust_decimal::Decimal) -> Price {
        Price::new(v).unwrap()
    }

    #[test]
    fn test_order_side_parse_is_case_insensitive() {
        assert_eq!("buy".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!("Sell".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert_eq!(" BUY ".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!(
            "hold".parse::<OrderSide>(),
            Err(ValidationError::InvalidSide("hold".to_string()))
        );
    }

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_order_type_parse() {
        assert_eq!("LIMIT".parse::<OrderType>().unwrap(), OrderType::Limit);
        assert_eq!("market".parse::<OrderType>().unwrap(), OrderType::Market);
        assert!("stop".parse::<OrderType>().is_err());
        assert_eq!(OrderType::default(), OrderType::Limit);
    }

    #[test]
    fn test_limit_entry_is_gtc_and_not_reduce_only() {
        let order = OrderRequest::entry(
            "DOGEUSDT",
            OrderSide::Buy,
            OrderType::Limit,
            qty(dec!(6)),
            px(dec!(50)),
        );
        assert_eq!(order.price, Some(px(dec!(50))));
        assert_eq!(order.time_in_force, Some(TimeInForce::GoodTillCancel));
        assert!(!order.reduce_only);
        assert!(order.trigger.is_none());
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_market_entry_drops_price() {
        let order = OrderRequest::entry(
            "DOGEUSDT",
            OrderSide::Sell,
            OrderType::Market,
            qty(dec!(6)),
            px(dec!(50)),
        );
        assert!(order.price.is_none());
        assert!(order.time_in_force.is_none());
    }

    #[test]
    fn test_protective_orders_for_long_entry() {
        let tp = OrderRequest::protective(
            "BTCUSDT",
            OrderSide::Buy,
            ProtectionKind::TakeProfit,
            qty(dec!(1)),
            px(dec!(110)),
        );
        let sl = OrderRequest::protective(
            "BTCUSDT",
            OrderSide::Buy,
            ProtectionKind::StopLoss,
            qty(dec!(1)),
            px(dec!(90)),
        );

        assert_eq!(tp.side, OrderSide::Sell);
        assert_eq!(sl.side, OrderSide::Sell);
        assert!(tp.reduce_only && sl.reduce_only);
        assert_eq!(tp.trigger.unwrap().direction, TriggerDirection::Rising);
        assert_eq!(sl.trigger.unwrap().direction, TriggerDirection::Falling);
    }

    #[test]
    fn test_protective_orders_for_short_entry() {
        assert_eq!(
            ProtectionKind::TakeProfit.trigger_direction(OrderSide::Sell),
            TriggerDirection::Falling
        );
        assert_eq!(
            ProtectionKind::StopLoss.trigger_direction(OrderSide::Sell),
            TriggerDirection::Rising
        );
        let tp = OrderRequest::protective(
            "BTCUSDT",
            OrderSide::Sell,
            ProtectionKind::TakeProfit,
            qty(dec!(1)),
            px(dec!(90)),
        );
        assert_eq!(tp.side, OrderSide::Buy);
    }

    #[test]
    fn test_close_order_is_reduce_only_market() {
        let order = OrderRequest::close("ETHUSDT", OrderSide::Sell, qty(dec!(6)));
        assert_eq!(order.order_type, OrderType::Market);
        assert!(order.reduce_only);
        assert!(order.price.is_none());
    }

    #[test]
    fn test_limit_without_price_fails_validation() {
        let mut order = OrderRequest::close("ETHUSDT", OrderSide::Sell, qty(dec!(1)));
        order.order_type = OrderType::Limit;
        assert_eq!(order.validate(), Err(ValidationError::MissingLimitPrice));
    }

    #[test]
    fn test_receipt_extracts_nested_order_id() {
        let receipt = OrderReceipt::from_response(json!({
            "retCode": 0,
            "result": { "orderId": "1321003749386327552", "orderLinkId": "" }
        }));
        assert_eq!(receipt, OrderReceipt::Id("1321003749386327552".to_string()));
        assert_eq!(receipt.order_id(), Some("1321003749386327552"));
    }

    #[test]
    fn test_receipt_extracts_flat_id() {
        let receipt = OrderReceipt::from_response(json!({ "id": "abc" }));
        assert_eq!(receipt.order_id(), Some("abc"));
    }

    #[test]
    fn test_receipt_falls_back_to_raw_response() {
        let raw = json!({ "result": { "orderId": "" }, "retMsg": "OK" });
        let receipt = OrderReceipt::from_response(raw.clone());
        assert_eq!(receipt, OrderReceipt::Raw(raw));
        assert!(receipt.order_id().is_none());
    }

    #[test]
    fn test_receipt_serializes_untagged() {
        let id = serde_json::to_value(OrderReceipt::Id("42".into())).unwrap();
        assert_eq!(id, json!("42"));
        let raw = serde_json::to_value(OrderReceipt::Raw(json!({"a": 1}))).unwrap();
        assert_eq!(raw, json!({"a": 1}));
    }
}
