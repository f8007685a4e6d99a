use crate::messaging::RoomEvent;
use serde::{Deserialize, Serialize};

/// Kind of logical room on the realtime connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomKind {
    Chat,
    /// Live walk-tracking session
    LiveTracking,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomRef {
    pub id: String,
    pub kind: RoomKind,
}

impl RoomRef {
    pub fn new(id: impl Into<String>, kind: RoomKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn chat(id: impl Into<String>) -> Self {
        Self::new(id, RoomKind::Chat)
    }

    pub fn live_tracking(id: impl Into<String>) -> Self {
        Self::new(id, RoomKind::LiveTracking)
    }

    fn join_event(&self) -> RoomEvent {
        match self.kind {
            RoomKind::Chat => RoomEvent::JoinChat,
            RoomKind::LiveTracking => RoomEvent::JoinPaseo,
        }
    }
}

/// Remembers the room to restore after every reconnect.
///
/// The reference survives disconnects; only [`clear`](Self::clear) drops
/// it.
#[derive(Debug, Clone, Default)]
pub struct RoomSession {
    current: Option<RoomRef>,
}

impl RoomSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_room(&mut self, room: RoomRef) {
        tracing::debug!("Room set: {} ({:?})", room.id, room.kind);
        self.current = Some(room);
    }

    pub fn current(&self) -> Option<&RoomRef> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// The join to emit for the current room, if any
    pub fn rejoin(&self) -> Option<(RoomEvent, serde_json::Value)> {
        self.current.as_ref().map(|room| {
            tracing::info!("Rejoining {}: {}", room.join_event().as_str(), room.id);
            (room.join_event(), serde_json::Value::String(room.id.clone()))
        })
    }

    /// Clears the room, returning the leave to emit. Only chat rooms have
    /// a leave event.
    pub fn leave(&mut self) -> Option<(RoomEvent, serde_json::Value)> {
        let room = self.current.take()?;
        match room.kind {
            RoomKind::Chat => Some((RoomEvent::LeaveChat, serde_json::Value::String(room.id))),
            RoomKind::LiveTracking => None,
        }
    }
}
