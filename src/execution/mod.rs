//! Execution client contract
//!
//! Any venue adapter provides the connection lifecycle and the three command
//! operations. The routing core ([`EventRouter`]) is shared by composition:
//! adapters embed one and funnel every inbound event through its dispatch
//! chokepoint.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::core::error::ExecutionError;
use crate::core::types::{Order, StrategyId};
use crate::routing::EventRouter;
use crate::strategy::TradeStrategy;

pub mod live;

pub use live::LiveExecClient;

/// Capability a concrete venue adapter must implement.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// The embedded routing core all inbound events funnel through.
    fn router(&self) -> &EventRouter;

    /// Establish the session to the execution service.
    async fn connect(&self) -> Result<(), ExecutionError>;

    /// Tear down the session. Safe to call when already disconnected. After
    /// this returns, no further strategy handler invocation starts.
    async fn disconnect(&self);

    /// Register the order with its owning strategy, then transmit the submit
    /// command. Registration happens before transmission so an immediate
    /// venue response is always resolvable.
    async fn submit_order(
        &self,
        order: &Order,
        strategy_id: &StrategyId,
    ) -> Result<(), ExecutionError>;

    /// Transmit a cancel command. The routing entry is untouched.
    async fn cancel_order(&self, order: &Order) -> Result<(), ExecutionError>;

    /// Transmit a modify command carrying the new price.
    async fn modify_order(&self, order: &Order, new_price: Decimal)
        -> Result<(), ExecutionError>;
}

/// Register `strategy` with `client`: unique-id registration in the strategy
/// directory, then the back-reference callback handing the strategy its
/// client. Shared across adapters; not subject to override.
pub fn register_strategy(
    client: Arc<dyn ExecutionClient>,
    strategy: Arc<dyn TradeStrategy>,
) -> Result<(), ExecutionError> {
    client.router().register_strategy(Arc::clone(&strategy))?;
    strategy.on_execution_client_registered(client);
    Ok(())
}
