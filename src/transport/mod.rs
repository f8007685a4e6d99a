// Transport module - the physical connection seam and its WebSocket adapter
mod websocket;

pub use websocket::WebSocketTransport;

use crate::types::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Events a transport reports back to the connection manager.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Physical connection established
    Connected,
    /// Physical connection closed or dropped
    Disconnected { reason: String },
    /// Connection attempt rejected by the peer or the network
    ConnectError { message: String },
    /// The transport completed a reconnect on its own
    Reconnected,
    /// Liveness reply
    Pong,
    /// Any other inbound application message
    Message {
        event: String,
        payload: serde_json::Value,
    },
}

/// Sink a transport pushes its events into.
pub type TransportEventSink = mpsc::UnboundedSender<TransportEvent>;

/// One physical connection to the backend.
///
/// Implementations may be driven from any task; events they emit are
/// marshalled onto the manager's loop through the subscribed sink.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens the connection. Resolves once the handshake completed.
    async fn connect(&self, host: &str, token: &str) -> Result<()>;

    /// Closes the connection. Closing an idle transport is a no-op.
    async fn disconnect(&self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Sends a named event.
    async fn send(&self, event: &str, payload: serde_json::Value) -> Result<()>;

    /// Registers the sink for [`TransportEvent`]s, replacing any previous one.
    fn subscribe(&self, sink: TransportEventSink);
}
