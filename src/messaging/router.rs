use super::SocketEvent;
use crate::transport::TransportEvent;
use crate::types::message::SocketMessage;

/// Translates inbound text frames into [`TransportEvent`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageRouter;

impl MessageRouter {
    pub fn new() -> Self {
        Self
    }

    /// Routes a raw text frame. Returns `None` for frames the manager has
    /// no use for or that fail to parse.
    pub fn route(&self, text: &str) -> Option<TransportEvent> {
        match serde_json::from_str::<SocketMessage>(text) {
            Ok(message) => {
                tracing::debug!("Routing inbound event: {}", message.event.as_str());
                self.route_message(message)
            }
            Err(e) => {
                tracing::error!("Failed to parse message: {} - Raw: {}", e, text);
                None
            }
        }
    }

    fn route_message(&self, message: SocketMessage) -> Option<TransportEvent> {
        match message.event {
            SocketEvent::Pong => Some(TransportEvent::Pong),
            SocketEvent::Reconnect => Some(TransportEvent::Reconnected),
            SocketEvent::Disconnect => Some(TransportEvent::Disconnected {
                reason: Self::describe(&message.payload, "server disconnect"),
            }),
            SocketEvent::ConnectError => Some(TransportEvent::ConnectError {
                message: Self::describe(&message.payload, "connect error"),
            }),
            // Server-initiated probes are answered at the frame level
            SocketEvent::Ping | SocketEvent::Connect => None,
            event => Some(TransportEvent::Message {
                event: event.as_str().to_string(),
                payload: message.payload,
            }),
        }
    }

    fn describe(payload: &serde_json::Value, fallback: &str) -> String {
        payload
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| payload.as_str())
            .unwrap_or(fallback)
            .to_string()
    }
}
