use super::{Transport, TransportEvent, TransportEventSink};
use crate::messaging::MessageRouter;
use crate::types::{DEFAULT_PORT, ResilienceError, Result, SocketMessage};
use async_trait::async_trait;
use futures::SinkExt;
use futures::stream::{SplitSink, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;
use uuid::Uuid;

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// [`Transport`] over a plain JSON-envelope WebSocket.
///
/// Frames are `{"event": "...", "payload": ...}`. Only drops caused by the
/// peer or the network are reported as [`TransportEvent::Disconnected`];
/// a local [`disconnect`](Transport::disconnect) is silent.
pub struct WebSocketTransport {
    scheme: String,
    port: u16,
    path: String,
    ws_write: Arc<RwLock<Option<WsWriter>>>,
    connected: Arc<AtomicBool>,
    sink: Arc<Mutex<Option<TransportEventSink>>>,
    read_task: Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self {
            scheme: "ws".to_string(),
            port: DEFAULT_PORT,
            path: "/".to_string(),
            ws_write: Arc::new(RwLock::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            sink: Arc::new(Mutex::new(None)),
            read_task: Mutex::new(None),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Use `wss://` instead of `ws://`
    pub fn with_tls(mut self) -> Self {
        self.scheme = "wss".to_string();
        self
    }

    /// Build the WebSocket endpoint URL with the auth token as query parameter
    pub fn endpoint_url(&self, host: &str, token: &str) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}://{}:{}{}",
            self.scheme, host, self.port, self.path
        ))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    fn emit(sink: &Mutex<Option<TransportEventSink>>, event: TransportEvent) {
        let Ok(guard) = sink.lock() else {
            return;
        };
        if let Some(tx) = guard.as_ref()
            && tx.send(event).is_err()
        {
            tracing::debug!("Transport event sink closed, dropping event");
        }
    }

    fn abort_read_task(&self) {
        if let Ok(mut task) = self.read_task.lock()
            && let Some(handle) = task.take()
        {
            handle.abort();
        }
    }

    fn spawn_reader(
        &self,
        mut read_half: futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
        connection_id: Uuid,
    ) -> JoinHandle<()> {
        let router = MessageRouter::new();
        let sink = Arc::clone(&self.sink);
        let connected = Arc::clone(&self.connected);
        let ws_write = Arc::clone(&self.ws_write);

        tokio::spawn(async move {
            tracing::info!(%connection_id, "Starting read task");
            let reason = loop {
                match read_half.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = router.route(&text) {
                            Self::emit(&sink, event);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(close_frame) => format!(
                                "server closed connection: code={:?}, reason='{}'",
                                close_frame.code, close_frame.reason
                            ),
                            None => "server closed connection without close frame".to_string(),
                        };
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break format!("read error: {}", e),
                    None => break "stream ended".to_string(),
                }
            };

            tracing::warn!(%connection_id, "Connection dropped: {}", reason);
            connected.store(false, Ordering::SeqCst);
            *ws_write.write().await = None;
            Self::emit(&sink, TransportEvent::Disconnected { reason });
        })
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, host: &str, token: &str) -> Result<()> {
        if self.is_connected() {
            self.disconnect().await?;
        }

        let url = self.endpoint_url(host, token)?;
        let connection_id = Uuid::new_v4();
        tracing::info!(%connection_id, "Connecting to {}:{}", host, self.port);

        let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        let (write_half, read_half) = ws_stream.split();
        *self.ws_write.write().await = Some(write_half);

        let handle = self.spawn_reader(read_half, connection_id);
        if let Ok(mut task) = self.read_task.lock() {
            *task = Some(handle);
        }

        self.connected.store(true, Ordering::SeqCst);
        Self::emit(&self.sink, TransportEvent::Connected);
        tracing::info!(%connection_id, "Connected to WebSocket server");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.abort_read_task();
        self.connected.store(false, Ordering::SeqCst);

        let mut ws_guard = self.ws_write.write().await;
        if let Some(ws) = ws_guard.as_mut()
            && let Err(e) = ws.close().await
        {
            tracing::debug!("Close handshake failed: {}", e);
        }
        *ws_guard = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, event: &str, payload: serde_json::Value) -> Result<()> {
        let json = serde_json::to_string(&SocketMessage::new(event, payload))?;

        let mut ws_guard = self.ws_write.write().await;
        match ws_guard.as_mut() {
            Some(ws) => {
                ws.send(Message::Text(json.into())).await?;
                Ok(())
            }
            None => Err(ResilienceError::NotConnected),
        }
    }

    fn subscribe(&self, sink: TransportEventSink) {
        if let Ok(mut guard) = self.sink.lock() {
            *guard = Some(sink);
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.abort_read_task();
    }
}
