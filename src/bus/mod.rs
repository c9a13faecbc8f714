//! Message bus boundary
//!
//! The venue's event stream arrives over an opaque publish/subscribe
//! transport. The execution client only relies on this contract; concrete
//! backends are the WebSocket session in [`ws`] and the in-process bus in
//! [`memory`] used by tests and backtest wiring.

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod ws;

pub use memory::MemoryBus;
pub use ws::WsBus;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to connect to message bus: {0}")]
    Connect(String),

    #[error("message bus connection closed")]
    Closed,

    #[error("transport send failed: {0}")]
    Send(String),

    #[error("not subscribed to channel: {0}")]
    NotSubscribed(String),

    #[error("liveness probe timed out")]
    PingTimeout,
}

/// Opaque publish/subscribe transport.
///
/// Subscriptions hand back a receiver; the subscriber drives its own
/// consumption loop and stops by unsubscribing (which closes the channel) or
/// dropping the receiver.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Establish the transport session.
    async fn connect(&self) -> Result<(), BusError>;

    /// Tear down the transport session. Safe to call when not connected.
    async fn disconnect(&self);

    /// Route inbound messages on `channel` to the returned receiver.
    async fn subscribe(&self, channel: &str) -> Result<flume::Receiver<Vec<u8>>, BusError>;

    /// Stop routing `channel`; closes the subscriber's receiver.
    async fn unsubscribe(&self, channel: &str) -> Result<(), BusError>;

    /// Publish a payload on `channel`.
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), BusError>;

    /// Lightweight liveness round-trip. A cached connected flag is not
    /// enough: the underlying session can silently die.
    async fn ping(&self) -> Result<(), BusError>;

    fn is_connected(&self) -> bool;
}
