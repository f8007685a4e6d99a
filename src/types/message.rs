use serde::{Deserialize, Serialize};

use crate::SocketEvent;

/// Wire envelope used by the WebSocket transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocketMessage {
    pub event: SocketEvent,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl SocketMessage {
    pub fn new(event: impl Into<SocketEvent>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}
