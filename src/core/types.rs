//! Core types - Strong typing for order routing

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::error::ProtocolError;

/// Venue-assigned or system-assigned order identifier. Globally unique at
/// registration time.
pub type OrderId = String;

/// Identifier derived from a strategy's name and label.
pub type StrategyId = String;

/// Identifier assigned by the broker once an order is working.
pub type BrokerOrderId = String;

/// Identifier assigned by the venue for an individual execution.
pub type ExecutionId = String;

/// Execution counterparty an instrument trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Fxcm,
    Dukascopy,
    Simulated,
}

impl FromStr for Venue {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FXCM" => Ok(Venue::Fxcm),
            "DUKASCOPY" => Ok(Venue::Dukascopy),
            "SIMULATED" => Ok(Venue::Simulated),
            _ => Err(ProtocolError::InvalidToken {
                what: "venue",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Venue::Fxcm => write!(f, "FXCM"),
            Venue::Dukascopy => write!(f, "DUKASCOPY"),
            Venue::Simulated => write!(f, "SIMULATED"),
        }
    }
}

/// Instrument identifier, a base code qualified by its venue.
/// Equality is structural over both parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    code: String,
    venue: Venue,
}

impl Symbol {
    pub fn new(code: impl Into<String>, venue: Venue) -> Self {
        Self {
            code: code.into().to_uppercase(),
            venue,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn venue(&self) -> Venue {
        self.venue
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.code, self.venue)
    }
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl FromStr for OrderSide {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            _ => Err(ProtocolError::InvalidToken {
                what: "order side",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl FromStr for OrderType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MARKET" => Ok(OrderType::Market),
            "LIMIT" => Ok(OrderType::Limit),
            "STOP" => Ok(OrderType::Stop),
            "STOP_LIMIT" => Ok(OrderType::StopLimit),
            _ => Err(ProtocolError::InvalidToken {
                what: "order type",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Stop => write!(f, "STOP"),
            OrderType::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

/// Venue-facing order. Only the fields the execution link needs for routing
/// and command encoding; position/fill accounting lives with the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: u64,
    pub price: Option<Decimal>,
    pub label: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    pub fn market(id: impl Into<OrderId>, symbol: Symbol, side: OrderSide, quantity: u64) -> Self {
        Self {
            id: id.into(),
            symbol,
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            label: None,
            timestamp: Utc::now(),
        }
    }

    pub fn limit(
        id: impl Into<OrderId>,
        symbol: Symbol,
        side: OrderSide,
        quantity: u64,
        price: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            symbol,
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            label: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_structural_equality() {
        let a = Symbol::new("EURUSD", Venue::Fxcm);
        let b = Symbol::new("eurusd", Venue::Fxcm);
        let c = Symbol::new("EURUSD", Venue::Dukascopy);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "EURUSD.FXCM");
    }

    #[test]
    fn test_side_parses_case_insensitive() {
        assert_eq!("buy".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!("SELL".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert!("hold".parse::<OrderSide>().is_err());
    }

    #[test]
    fn test_venue_parses_case_insensitive() {
        assert_eq!("fxcm".parse::<Venue>().unwrap(), Venue::Fxcm);
        assert_eq!("Dukascopy".parse::<Venue>().unwrap(), Venue::Dukascopy);
        assert!("nyse".parse::<Venue>().is_err());
    }
}
