//! WebSocket message bus backend
//!
//! One session per bus: a write half guarded by an async mutex and a read
//! loop task that routes inbound message frames to channel subscribers.
//! Control traffic (subscribe/unsubscribe/publish) is JSON; message frames
//! carry `{channel, data}` with the wire text in `data`.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info};
use url::Url;

use super::{BusError, MessageBus};
use crate::core::config::BusConfig;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

const PING_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Serialize)]
struct ControlFrame<'a> {
    op: &'a str,
    channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a str>,
}

#[derive(Deserialize)]
struct MessageFrame {
    channel: String,
    data: String,
}

pub struct WsBus {
    url: String,
    shared: Arc<Shared>,
    reader: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

struct Shared {
    writer: Mutex<Option<WsSink>>,
    subscribers: RwLock<HashMap<String, flume::Sender<Vec<u8>>>>,
    connected: RwLock<bool>,
    pong: Notify,
}

impl WsBus {
    pub fn new(config: &BusConfig) -> Self {
        Self::from_url(config.endpoint())
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            shared: Arc::new(Shared {
                writer: Mutex::new(None),
                subscribers: RwLock::new(HashMap::new()),
                connected: RwLock::new(false),
                pong: Notify::new(),
            }),
            reader: Mutex::new(None),
        }
    }

    async fn send(&self, msg: Message) -> Result<(), BusError> {
        let mut writer = self.shared.writer.lock().await;
        let sink = writer.as_mut().ok_or(BusError::Closed)?;
        sink.send(msg)
            .await
            .map_err(|e| BusError::Send(e.to_string()))
    }

    async fn send_control(&self, frame: &ControlFrame<'_>) -> Result<(), BusError> {
        let text = serde_json::to_string(frame).map_err(|e| BusError::Send(e.to_string()))?;
        self.send(Message::Text(text)).await
    }
}

#[async_trait]
impl MessageBus for WsBus {
    async fn connect(&self) -> Result<(), BusError> {
        let url = Url::parse(&self.url).map_err(|e| BusError::Connect(e.to_string()))?;
        info!(%url, "connecting to message bus");

        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| BusError::Connect(e.to_string()))?;
        let (write, read) = stream.split();

        *self.shared.writer.lock().await = Some(write);
        *self.shared.connected.write() = true;
        *self.reader.lock().await = Some(tokio::spawn(read_loop(read, Arc::clone(&self.shared))));

        info!("connected to message bus");
        Ok(())
    }

    async fn disconnect(&self) {
        if let Some(mut sink) = self.shared.writer.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
        self.shared.subscribers.write().clear();
        *self.shared.connected.write() = false;
        info!("disconnected from message bus");
    }

    async fn subscribe(&self, channel: &str) -> Result<flume::Receiver<Vec<u8>>, BusError> {
        let (tx, rx) = flume::unbounded();
        // Register the route before the venue can start sending.
        self.shared
            .subscribers
            .write()
            .insert(channel.to_string(), tx);

        self.send_control(&ControlFrame {
            op: "subscribe",
            channel,
            data: None,
        })
        .await?;

        Ok(rx)
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), BusError> {
        if self.shared.subscribers.write().remove(channel).is_none() {
            return Err(BusError::NotSubscribed(channel.to_string()));
        }
        self.send_control(&ControlFrame {
            op: "unsubscribe",
            channel,
            data: None,
        })
        .await
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), BusError> {
        let data = std::str::from_utf8(payload)
            .map_err(|_| BusError::Send("payload is not valid UTF-8".to_string()))?;
        self.send_control(&ControlFrame {
            op: "publish",
            channel,
            data: Some(data),
        })
        .await
    }

    async fn ping(&self) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::Closed);
        }
        let pong = self.shared.pong.notified();
        self.send(Message::Ping(Vec::new())).await?;
        tokio::time::timeout(PING_TIMEOUT, pong)
            .await
            .map_err(|_| BusError::PingTimeout)
    }

    fn is_connected(&self) -> bool {
        *self.shared.connected.read()
    }
}

async fn read_loop(mut read: WsSource, shared: Arc<Shared>) {
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<MessageFrame>(&text) {
                Ok(frame) => {
                    if let Some(tx) = shared.subscribers.read().get(&frame.channel) {
                        let _ = tx.send(frame.data.into_bytes());
                    } else {
                        debug!(channel = %frame.channel, "frame for channel without subscriber");
                    }
                }
                Err(e) => debug!(error = %e, "ignoring unparseable frame"),
            },
            Ok(Message::Ping(data)) => {
                let mut writer = shared.writer.lock().await;
                if let Some(sink) = writer.as_mut() {
                    let _ = sink.send(Message::Pong(data)).await;
                }
            }
            Ok(Message::Pong(_)) => shared.pong.notify_waiters(),
            Ok(Message::Close(_)) => {
                info!("message bus closed the session");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "message bus transport error");
                break;
            }
        }
    }
    *shared.connected.write() = false;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_frame_shapes() {
        let subscribe = serde_json::to_string(&ControlFrame {
            op: "subscribe",
            channel: "order_events",
            data: None,
        })
        .unwrap();
        assert_eq!(subscribe, r#"{"op":"subscribe","channel":"order_events"}"#);

        let publish = serde_json::to_string(&ControlFrame {
            op: "publish",
            channel: "order_commands",
            data: Some("cancel_order:EURUSD.FXCM,O-1,2020-01-01T00:00:00Z"),
        })
        .unwrap();
        assert_eq!(
            publish,
            r#"{"op":"publish","channel":"order_commands","data":"cancel_order:EURUSD.FXCM,O-1,2020-01-01T00:00:00Z"}"#
        );
    }

    #[test]
    fn test_message_frame_parses() {
        let frame: MessageFrame = serde_json::from_str(
            r#"{"channel":"order_events","data":"order_accepted:EURUSD.FXCM,O-1,2020-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(frame.channel, "order_events");
        assert!(frame.data.starts_with("order_accepted:"));
    }
}
