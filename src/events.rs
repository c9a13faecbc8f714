//! Order lifecycle events and outbound commands

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::types::{
    BrokerOrderId, ExecutionId, Order, OrderId, OrderSide, Symbol,
};

/// A state change of a previously submitted order, as reported by the venue.
///
/// `event_id` and `received_ts` are assigned locally when the event enters
/// the process; they are never carried on the wire.
#[derive(Debug, Clone)]
pub struct OrderEvent {
    pub symbol: Symbol,
    pub order_id: OrderId,
    pub event_id: Uuid,
    pub venue_ts: DateTime<Utc>,
    pub received_ts: DateTime<Utc>,
    pub kind: OrderEventKind,
}

impl OrderEvent {
    pub fn new(
        symbol: Symbol,
        order_id: impl Into<OrderId>,
        venue_ts: DateTime<Utc>,
        kind: OrderEventKind,
    ) -> Self {
        Self {
            symbol,
            order_id: order_id.into(),
            event_id: Uuid::new_v4(),
            venue_ts,
            received_ts: Utc::now(),
            kind,
        }
    }
}

impl std::fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({} {})", self.kind.header(), self.symbol, self.order_id)
    }
}

/// The ten lifecycle variants and their variant-specific fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEventKind {
    Submitted,
    Accepted,
    Rejected {
        reason: String,
    },
    Working {
        broker_order_id: BrokerOrderId,
    },
    Cancelled,
    CancelReject {
        reason: String,
    },
    Modified {
        broker_order_id: BrokerOrderId,
        new_price: Decimal,
    },
    Expired,
    Filled {
        broker_order_id: BrokerOrderId,
        execution_id: ExecutionId,
        side: OrderSide,
        filled_quantity: u64,
        average_price: Decimal,
    },
    PartiallyFilled {
        broker_order_id: BrokerOrderId,
        execution_id: ExecutionId,
        side: OrderSide,
        filled_quantity: u64,
        leaves_quantity: u64,
        average_price: Decimal,
    },
}

impl OrderEventKind {
    /// Wire header token selecting this variant.
    pub fn header(&self) -> &'static str {
        match self {
            OrderEventKind::Submitted => "order_submitted",
            OrderEventKind::Accepted => "order_accepted",
            OrderEventKind::Rejected { .. } => "order_rejected",
            OrderEventKind::Working { .. } => "order_working",
            OrderEventKind::Cancelled => "order_cancelled",
            OrderEventKind::CancelReject { .. } => "order_cancel_reject",
            OrderEventKind::Modified { .. } => "order_modified",
            OrderEventKind::Expired => "order_expired",
            OrderEventKind::Filled { .. } => "order_filled",
            OrderEventKind::PartiallyFilled { .. } => "order_partially_filled",
        }
    }
}

/// Outbound command to the venue. The submit command carries the full order;
/// cancel and modify reference a previously submitted one.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderCommand {
    Submit {
        order: Order,
    },
    Cancel {
        symbol: Symbol,
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },
    Modify {
        symbol: Symbol,
        order_id: OrderId,
        new_price: Decimal,
        timestamp: DateTime<Utc>,
    },
}
