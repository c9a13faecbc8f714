//! In-process message bus
//!
//! Loopback backend for tests and backtest wiring. Supports holding
//! deliveries in flight and releasing them later, which is how teardown
//! ordering is exercised deterministically.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{BusError, MessageBus};

pub struct MemoryBus {
    connected: AtomicBool,
    ping_fails: AtomicBool,
    hold: AtomicBool,
    subscribers: RwLock<HashMap<String, flume::Sender<Vec<u8>>>>,
    held: RwLock<Vec<(String, Vec<u8>)>>,
    published: RwLock<Vec<(String, Vec<u8>)>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            ping_fails: AtomicBool::new(false),
            hold: AtomicBool::new(false),
            subscribers: RwLock::new(HashMap::new()),
            held: RwLock::new(Vec::new()),
            published: RwLock::new(Vec::new()),
        }
    }

    /// When set, published messages are parked instead of delivered, until
    /// [`MemoryBus::release_held`].
    pub fn hold_deliveries(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
    }

    /// Deliver every held message in publish order. Messages whose channel
    /// no longer has a subscriber are discarded.
    pub fn release_held(&self) {
        let held: Vec<_> = self.held.write().drain(..).collect();
        for (channel, payload) in held {
            self.deliver(&channel, payload);
        }
    }

    /// Simulate a session that is still present but no longer responsive.
    pub fn set_ping_fails(&self, fails: bool) {
        self.ping_fails.store(fails, Ordering::SeqCst);
    }

    /// Every payload published through this bus, in order.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.read().clone()
    }

    fn deliver(&self, channel: &str, payload: Vec<u8>) {
        if let Some(tx) = self.subscribers.read().get(channel) {
            // Subscriber may have dropped its receiver; nothing to do then.
            let _ = tx.send(payload);
        }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn connect(&self) -> Result<(), BusError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.subscribers.write().clear();
    }

    async fn subscribe(&self, channel: &str) -> Result<flume::Receiver<Vec<u8>>, BusError> {
        if !self.is_connected() {
            return Err(BusError::Closed);
        }
        let (tx, rx) = flume::unbounded();
        self.subscribers.write().insert(channel.to_string(), tx);
        Ok(rx)
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), BusError> {
        self.subscribers
            .write()
            .remove(channel)
            .map(|_| ())
            .ok_or_else(|| BusError::NotSubscribed(channel.to_string()))
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::Closed);
        }
        self.published
            .write()
            .push((channel.to_string(), payload.to_vec()));

        if self.hold.load(Ordering::SeqCst) {
            self.held
                .write()
                .push((channel.to_string(), payload.to_vec()));
        } else {
            self.deliver(channel, payload.to_vec());
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::Closed);
        }
        if self.ping_fails.load(Ordering::SeqCst) {
            return Err(BusError::PingTimeout);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = MemoryBus::new();
        bus.connect().await.unwrap();

        let rx = bus.subscribe("order_events").await.unwrap();
        bus.publish("order_events", b"hello").await.unwrap();

        assert_eq!(rx.recv_async().await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_receiver() {
        let bus = MemoryBus::new();
        bus.connect().await.unwrap();

        let rx = bus.subscribe("order_events").await.unwrap();
        bus.unsubscribe("order_events").await.unwrap();

        assert!(rx.recv_async().await.is_err());
        assert!(matches!(
            bus.unsubscribe("order_events").await,
            Err(BusError::NotSubscribed(_))
        ));
    }

    #[tokio::test]
    async fn test_held_messages_deliver_on_release() {
        let bus = MemoryBus::new();
        bus.connect().await.unwrap();
        let rx = bus.subscribe("order_events").await.unwrap();

        bus.hold_deliveries(true);
        bus.publish("order_events", b"in flight").await.unwrap();
        assert!(rx.try_recv().is_err());

        bus.release_held();
        assert_eq!(rx.recv_async().await.unwrap(), b"in flight");
    }

    #[tokio::test]
    async fn test_disconnected_bus_refuses_traffic() {
        let bus = MemoryBus::new();
        assert!(matches!(bus.subscribe("x").await, Err(BusError::Closed)));
        assert!(matches!(bus.publish("x", b"y").await, Err(BusError::Closed)));
        assert!(matches!(bus.ping().await, Err(BusError::Closed)));
    }
}
