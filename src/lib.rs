//! # Realtime Resilience
//!
//! Keeps one logical realtime connection alive for a mobile client across
//! flaky networks, network handoffs, app backgrounding and server drops.
//!
//! The [`ConnectionManager`] combines a guarded connection state machine,
//! exponential-backoff reconnects, a ping/pong heartbeat, OS connectivity
//! debouncing and automatic room rejoin behind a single handle.
//!
//! ## Example
//!
//! ```no_run
//! use realtime_resilience::{
//!     ConnectionManager, ManualConnectivityProbe, NetworkCapabilities, StaticAddressResolver,
//!     StaticTokenProvider, WebSocketTransport,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ConnectionManager::builder(
//!         Arc::new(WebSocketTransport::new()),
//!         Arc::new(StaticAddressResolver::new("192.168.0.147")),
//!         Arc::new(StaticTokenProvider::new("secret-token")),
//!         Arc::new(ManualConnectivityProbe::new(Some(NetworkCapabilities::wifi(-60)))),
//!     )
//!     .build()?;
//!
//!     manager.register()?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod heartbeat;
pub mod infrastructure;
pub mod messaging;
pub mod network;
pub mod providers;
pub mod transport;
pub mod types;

pub use client::{
    ConnectionListener, ConnectionManager, ConnectionManagerBuilder, ConnectionManagerOptions,
    ConnectionSnapshot, ConnectionState, NoopListener, RequestOutcome, RoomKind, RoomRef,
};
pub use heartbeat::HeartbeatMonitor;
pub use messaging::{RoomEvent, SocketEvent};
pub use network::{
    ConnectivityProbe, LinkType, ManualConnectivityProbe, NetworkCapabilities, NetworkEvent,
    NetworkEventSender, NetworkQuality, NetworkSnapshot,
};
pub use providers::{AddressResolver, StaticAddressResolver, StaticTokenProvider, TokenProvider};
pub use transport::{Transport, TransportEvent, TransportEventSink, WebSocketTransport};
pub use types::{ResilienceError, Result, SocketMessage};
