//! quantlink - Execution-link layer
//! Connects trading strategies to an external order-execution venue over an
//! opaque message bus: typed lifecycle events in, order commands out.

// Public modules
pub mod bus;
pub mod codec;
pub mod core;
pub mod events;
pub mod execution;
pub mod routing;
pub mod strategy;

// Re-exports
pub use crate::core::{BusConfig, Config, ConnectionError, ExecutionError, ProtocolError, Result};
pub use crate::events::{OrderCommand, OrderEvent, OrderEventKind};
pub use crate::execution::{register_strategy, ExecutionClient, LiveExecClient};
pub use crate::routing::{DiagnosticSink, EventRouter, OrderRegistry, StrategyDirectory};
pub use crate::strategy::TradeStrategy;
