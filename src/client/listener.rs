use super::ConnectionState;
use crate::network::{LinkType, NetworkQuality};
use std::time::Duration;

/// Application callbacks.
///
/// Every method runs on the connection loop and must return quickly; hand
/// off to another task for anything slow. All methods default to no-ops.
pub trait ConnectionListener: Send + Sync + 'static {
    /// Network loss confirmed after the verification delay
    fn on_network_lost(&self) {}

    fn on_network_available(&self) {}

    /// A connect sequence completed and the connection is usable
    fn on_reconnected(&self) {}

    fn on_network_type_changed(&self, _link_type: LinkType) {}

    fn on_network_quality_changed(&self, _quality: NetworkQuality) {}

    /// Attempts exhausted; another retry is still scheduled
    fn on_reconnection_failed(&self, _attempts: u32) {}

    /// Attempt `attempt` (> 1) is starting
    fn on_retrying(&self, _attempt: u32, _delay: Duration) {}

    fn on_state_changed(&self, _from: ConnectionState, _to: ConnectionState) {}

    /// Inbound application event from the transport
    fn on_message(&self, _event: &str, _payload: &serde_json::Value) {}
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl ConnectionListener for NoopListener {}
