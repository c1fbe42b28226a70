use crate::domain::entities::order::OrderSide;
use crate::domain::value_objects::quantity::Quantity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Order side that flattens a position held on this side
    pub fn closing_side(&self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Sell,
            PositionSide::Short => OrderSide::Buy,
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

impl From<OrderSide> for PositionSide {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
        }
    }
}

/// Snapshot of an exchange position, fetched per request and never cached
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    pub contracts: Quantity,
}

impl Position {
    pub fn new(symbol: &str, side: PositionSide, contracts: Quantity) -> Self {
        Position {
            symbol: symbol.to_string(),
            side,
            contracts,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.contracts.is_zero()
    }

    pub fn is_for(&self, symbol: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
    }
}
