// Messaging module - Socket events and inbound frame routing
pub mod event;
pub mod router;

pub use event::{RoomEvent, SocketEvent};
pub use router::MessageRouter;
