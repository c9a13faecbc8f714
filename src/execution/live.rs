//! Live execution client
//!
//! Connects the routing core to a running message bus: subscribes the order
//! event channel, decodes every inbound message on a background consumption
//! task, and encodes outbound commands. State machine over
//! {Disconnected, Connected}; the session slot doubles as the state.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bus::MessageBus;
use crate::codec;
use crate::core::config::{BusConfig, ORDER_COMMAND_CHANNEL, ORDER_EVENT_CHANNEL};
use crate::core::error::{ConnectionError, ExecutionError};
use crate::core::types::{Order, StrategyId};
use crate::events::OrderCommand;
use crate::routing::EventRouter;
use crate::strategy::TradeStrategy;

use super::ExecutionClient;

pub struct LiveExecClient {
    config: BusConfig,
    bus: Arc<dyn MessageBus>,
    router: Arc<EventRouter>,
    session: Mutex<Option<Session>>,
}

struct Session {
    stop: watch::Sender<bool>,
    consumer: JoinHandle<()>,
}

impl LiveExecClient {
    pub fn new(config: BusConfig, bus: Arc<dyn MessageBus>) -> Self {
        Self::with_router(config, bus, Arc::new(EventRouter::new()))
    }

    pub fn with_router(config: BusConfig, bus: Arc<dyn MessageBus>, router: Arc<EventRouter>) -> Self {
        Self {
            config,
            bus,
            router,
            session: Mutex::new(None),
        }
    }

    /// Register a strategy with this client (see [`super::register_strategy`]).
    pub fn register_strategy(
        self: &Arc<Self>,
        strategy: Arc<dyn TradeStrategy>,
    ) -> Result<(), ExecutionError> {
        super::register_strategy(Arc::clone(self) as Arc<dyn ExecutionClient>, strategy)
    }

    /// True when a session exists and the transport answers a liveness probe.
    pub async fn is_connected(&self) -> bool {
        if self.session.lock().await.is_none() {
            return false;
        }
        self.bus.ping().await.is_ok()
    }

    /// A session can silently die under us, so gate every command on a live
    /// round-trip probe rather than the session slot alone.
    async fn check_connection(&self) -> Result<(), ConnectionError> {
        if self.session.lock().await.is_none() {
            return Err(ConnectionError::NotConnected);
        }
        self.bus
            .ping()
            .await
            .map_err(|e| ConnectionError::Unreachable(e.to_string()))
    }

    async fn transmit(&self, command: &OrderCommand) -> Result<(), ExecutionError> {
        let raw = codec::encode_command(command);
        self.bus
            .publish(ORDER_COMMAND_CHANNEL, raw.as_bytes())
            .await
            .map_err(|e| ExecutionError::Transport(e.to_string()))
    }
}

#[async_trait]
impl ExecutionClient for LiveExecClient {
    fn router(&self) -> &EventRouter {
        &self.router
    }

    async fn connect(&self) -> Result<(), ExecutionError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            warn!("connect() called while already connected, ignoring");
            return Ok(());
        }

        self.bus
            .connect()
            .await
            .map_err(|e| ConnectionError::Unreachable(e.to_string()))?;
        let events = self
            .bus
            .subscribe(ORDER_EVENT_CHANNEL)
            .await
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let consumer = tokio::spawn(consume(events, Arc::clone(&self.router), stop_rx));
        *session = Some(Session {
            stop: stop_tx,
            consumer,
        });

        info!(
            host = %self.config.host,
            port = self.config.port,
            "connected to execution service"
        );
        Ok(())
    }

    async fn disconnect(&self) {
        let Some(session) = self.session.lock().await.take() else {
            debug!("disconnect() called while already disconnected");
            return;
        };

        // Unsubscribe first so no new work arrives while teardown is in
        // flight; the transport session goes down only after the consumer
        // stopped, preventing a use-after-close on the handle.
        if let Err(e) = self.bus.unsubscribe(ORDER_EVENT_CHANNEL).await {
            warn!(error = %e, "unsubscribe failed during teardown");
        }

        let _ = session.stop.send(true);
        let mut consumer = session.consumer;
        let grace = Duration::from_millis(self.config.grace_ms);
        match tokio::time::timeout(grace, &mut consumer).await {
            Ok(_) => debug!("consumption path quiesced"),
            Err(_) => {
                error!(
                    grace_ms = self.config.grace_ms,
                    "consumption path did not quiesce within grace interval, aborting it"
                );
                consumer.abort();
            }
        }

        self.bus.disconnect().await;
        info!(
            host = %self.config.host,
            port = self.config.port,
            "disconnected from execution service"
        );
    }

    async fn submit_order(
        &self,
        order: &Order,
        strategy_id: &StrategyId,
    ) -> Result<(), ExecutionError> {
        self.check_connection().await?;

        // Registration happens-before transmission: an event arriving the
        // instant after the publish must already be resolvable.
        self.router.register_order(order, strategy_id)?;

        self.transmit(&OrderCommand::Submit {
            order: order.clone(),
        })
        .await?;
        info!(order_id = %order.id, strategy_id = %strategy_id, "submit order transmitted");
        Ok(())
    }

    async fn cancel_order(&self, order: &Order) -> Result<(), ExecutionError> {
        self.check_connection().await?;
        self.transmit(&OrderCommand::Cancel {
            symbol: order.symbol.clone(),
            order_id: order.id.clone(),
            timestamp: Utc::now(),
        })
        .await?;
        info!(order_id = %order.id, "cancel order transmitted");
        Ok(())
    }

    async fn modify_order(
        &self,
        order: &Order,
        new_price: Decimal,
    ) -> Result<(), ExecutionError> {
        self.check_connection().await?;
        self.transmit(&OrderCommand::Modify {
            symbol: order.symbol.clone(),
            order_id: order.id.clone(),
            new_price,
            timestamp: Utc::now(),
        })
        .await?;
        info!(order_id = %order.id, %new_price, "modify order transmitted");
        Ok(())
    }
}

/// Background consumption path: decode each inbound message and funnel it
/// through the dispatch chokepoint. A malformed message is discarded and the
/// session stays up; only the stop signal or a closed subscription ends the
/// loop.
async fn consume(
    events: flume::Receiver<Vec<u8>>,
    router: Arc<EventRouter>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            _ = stop.changed() => break,
            raw = events.recv_async() => match raw {
                Ok(raw) => match codec::decode(&raw) {
                    Ok(event) => router.dispatch(event),
                    Err(e) => warn!(error = %e, "discarding malformed order event"),
                },
                Err(_) => break,
            },
        }
    }
}
