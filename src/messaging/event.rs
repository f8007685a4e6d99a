use crate::types::constants::{room_events, socket_events};
use serde::{Deserialize, Serialize};

/// Type-safe socket events
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SocketEvent {
    /// Connection established
    Connect,

    /// Connection closed
    Disconnect,

    /// Connection attempt rejected
    ConnectError,

    /// Transport finished one of its own reconnects
    Reconnect,

    /// Liveness probe
    Ping,

    /// Liveness reply
    Pong,

    /// Room membership events
    Room(RoomEvent),

    /// Any other application event
    Custom(String),
}

impl SocketEvent {
    /// Parse a string into a SocketEvent
    pub fn from_str(s: &str) -> Self {
        match s {
            socket_events::CONNECT => Self::Connect,
            socket_events::DISCONNECT => Self::Disconnect,
            socket_events::CONNECT_ERROR => Self::ConnectError,
            socket_events::RECONNECT => Self::Reconnect,
            socket_events::PING => Self::Ping,
            socket_events::PONG => Self::Pong,
            _ => match RoomEvent::from_str(s) {
                Some(room) => Self::Room(room),
                None => Self::Custom(s.to_string()),
            },
        }
    }

    /// Convert event to string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connect => socket_events::CONNECT,
            Self::Disconnect => socket_events::DISCONNECT,
            Self::ConnectError => socket_events::CONNECT_ERROR,
            Self::Reconnect => socket_events::RECONNECT,
            Self::Ping => socket_events::PING,
            Self::Pong => socket_events::PONG,
            Self::Room(room) => room.as_str(),
            Self::Custom(s) => s,
        }
    }
}

impl From<&str> for SocketEvent {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for SocketEvent {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

impl From<SocketEvent> for String {
    fn from(event: SocketEvent) -> Self {
        event.as_str().to_string()
    }
}

impl std::fmt::Display for SocketEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Room membership events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomEvent {
    /// Join a chat conversation
    JoinChat,

    /// Leave a chat conversation
    LeaveChat,

    /// Join a live walk-tracking session
    JoinPaseo,
}

impl RoomEvent {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            room_events::JOIN_CHAT => Some(Self::JoinChat),
            room_events::LEAVE_CHAT => Some(Self::LeaveChat),
            room_events::JOIN_PASEO => Some(Self::JoinPaseo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JoinChat => room_events::JOIN_CHAT,
            Self::LeaveChat => room_events::LEAVE_CHAT,
            Self::JoinPaseo => room_events::JOIN_PASEO,
        }
    }
}
