// Module declarations
mod builder;
mod connection;
mod core;
mod event_loop;
mod lifecycle;
mod listener;
mod room;
mod scheduler;
mod state;

// Public API exports
pub use builder::{ConnectionManagerBuilder, ConnectionManagerOptions};
pub use connection::ConnectionState;
pub use core::ConnectionManager;
pub use event_loop::ConnectionSnapshot;
pub use lifecycle::AppLifecycle;
pub use listener::{ConnectionListener, NoopListener};
pub use room::{RoomKind, RoomRef, RoomSession};
pub use scheduler::{
    AttemptPhase, FailureOutcome, ReconnectAttempt, ReconnectScheduler, RequestOrigin,
    RequestOutcome,
};
pub use state::ConnectionStateMachine;
