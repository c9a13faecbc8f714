//! Event routing - identity-indexed dispatch to owning strategies
//!
//! The order registry is authoritative for routing, independent of any other
//! order store. Registrations arrive from strategy/caller threads while the
//! consumption path resolves concurrently, so both maps are internally
//! synchronized.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::error::ExecutionError;
use crate::core::types::{Order, OrderId, StrategyId};
use crate::events::OrderEvent;
use crate::strategy::TradeStrategy;

/// Stable function capability invoked with each lifecycle event routed to a
/// strategy.
pub type EventHandler = Arc<dyn Fn(OrderEvent) + Send + Sync>;

/// Capture point for routing diagnostics, injectable so tests can observe
/// drops without global state. The default sink forwards to `tracing`.
pub trait DiagnosticSink: Send + Sync {
    fn unresolved_order_event(&self, event: &OrderEvent);
}

/// Default sink: diagnostics go to the log.
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn unresolved_order_event(&self, event: &OrderEvent) {
        warn!(order_id = %event.order_id, event = %event, "event order id not contained in order index, dropping");
    }
}

/// Mapping from order id to owning strategy id. One-time registration.
pub struct OrderRegistry {
    index: RwLock<HashMap<OrderId, StrategyId>>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a routing entry. The first registration wins for the lifetime
    /// of the client; a second attempt is rejected without overwriting.
    pub fn register(
        &self,
        order_id: &OrderId,
        strategy_id: &StrategyId,
    ) -> Result<(), ExecutionError> {
        let mut index = self.index.write();
        if index.contains_key(order_id) {
            return Err(ExecutionError::DuplicateOrder(order_id.clone()));
        }
        index.insert(order_id.clone(), strategy_id.clone());
        Ok(())
    }

    /// Pure lookup, safe to call from the consumption path concurrently with
    /// registrations.
    pub fn resolve(&self, order_id: &OrderId) -> Option<StrategyId> {
        self.index.read().get(order_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }
}

impl Default for OrderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Mapping from strategy id to its dispatch handler. One-time registration.
pub struct StrategyDirectory {
    handlers: RwLock<HashMap<StrategyId, EventHandler>>,
}

impl StrategyDirectory {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(
        &self,
        strategy_id: &StrategyId,
        handler: EventHandler,
    ) -> Result<(), ExecutionError> {
        let mut handlers = self.handlers.write();
        if handlers.contains_key(strategy_id) {
            return Err(ExecutionError::DuplicateStrategy(strategy_id.clone()));
        }
        handlers.insert(strategy_id.clone(), handler);
        Ok(())
    }

    pub fn lookup(&self, strategy_id: &StrategyId) -> Option<EventHandler> {
        self.handlers.read().get(strategy_id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl Default for StrategyDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared routing core embedded by every execution client adapter: the order
/// registry, the strategy directory, and the single dispatch chokepoint.
pub struct EventRouter {
    orders: OrderRegistry,
    strategies: StrategyDirectory,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::with_diagnostics(Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            orders: OrderRegistry::new(),
            strategies: StrategyDirectory::new(),
            diagnostics,
        }
    }

    /// Register a strategy's dispatch handler under its derived id.
    pub fn register_strategy(
        &self,
        strategy: Arc<dyn TradeStrategy>,
    ) -> Result<(), ExecutionError> {
        let strategy_id = strategy.strategy_id();
        let handler: EventHandler = Arc::new(move |event| strategy.on_order_event(event));
        self.strategies.register(&strategy_id, handler)
    }

    /// Record the owning strategy for an order, ahead of transmission.
    pub fn register_order(
        &self,
        order: &Order,
        strategy_id: &StrategyId,
    ) -> Result<(), ExecutionError> {
        self.orders.register(&order.id, strategy_id)
    }

    /// Route one inbound event to the single strategy that owns its order.
    ///
    /// Unresolvable events are dropped with a diagnostic; the platform stays
    /// live even when the registry and the venue briefly disagree.
    pub fn dispatch(&self, event: OrderEvent) {
        if self.strategies.is_empty() {
            debug!(event = %event, "event received with no registered strategies");
        }

        let Some(strategy_id) = self.orders.resolve(&event.order_id) else {
            self.diagnostics.unresolved_order_event(&event);
            return;
        };

        match self.strategies.lookup(&strategy_id) {
            Some(handler) => handler(event),
            None => warn!(
                strategy_id = %strategy_id,
                order_id = %event.order_id,
                "order registered to a strategy missing from the directory"
            ),
        }
    }

    pub fn orders(&self) -> &OrderRegistry {
        &self.orders
    }

    pub fn strategies(&self) -> &StrategyDirectory {
        &self.strategies
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}
