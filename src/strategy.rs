//! Strategy boundary surface
//!
//! Concrete strategy logic lives outside this crate; the execution link only
//! needs an identity, an event entry point, and the registration callback
//! that hands the strategy its execution client.

use std::sync::Arc;

use crate::core::types::StrategyId;
use crate::events::OrderEvent;
use crate::execution::ExecutionClient;

pub trait TradeStrategy: Send + Sync {
    /// Strategy name, shared across parameterizations.
    fn name(&self) -> &str;

    /// Label distinguishing this instance (parameter set, account, etc.).
    fn label(&self) -> &str;

    /// Identity the routing table keys on. Must be unique per client.
    fn strategy_id(&self) -> StrategyId {
        format!("{}-{}", self.name(), self.label())
    }

    /// Entry point for lifecycle events of orders this strategy owns.
    fn on_order_event(&self, event: OrderEvent);

    /// Called once at registration with the execution client the strategy
    /// submits orders through. A back-reference, not an ownership edge.
    fn on_execution_client_registered(&self, _client: Arc<dyn ExecutionClient>) {}
}
