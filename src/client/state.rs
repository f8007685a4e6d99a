use super::{ConnectionListener, ConnectionState};
use crate::network::{LinkType, NetworkQuality};
use std::sync::Arc;
use std::time::Duration;

/// Owner of [`ConnectionState`] and the only path to the application's
/// callbacks.
///
/// Transitions outside the table in
/// [`ConnectionState::can_transition_to`] are refused and logged.
pub struct ConnectionStateMachine {
    state: ConnectionState,
    listener: Arc<dyn ConnectionListener>,
}

impl ConnectionStateMachine {
    pub fn new(listener: Arc<dyn ConnectionListener>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            listener,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Apply a transition. Returns `true` only if the state changed.
    pub fn transition(&mut self, next: ConnectionState) -> bool {
        let current = self.state;
        if current == next {
            return false;
        }

        if !current.can_transition_to(next) {
            tracing::warn!("Refused state transition {} -> {}", current, next);
            return false;
        }

        self.state = next;
        tracing::debug!("Connection state {} -> {}", current, next);
        self.listener.on_state_changed(current, next);
        true
    }

    pub fn notify_network_lost(&self) {
        tracing::warn!("Network loss confirmed");
        self.listener.on_network_lost();
    }

    pub fn notify_network_available(&self) {
        self.listener.on_network_available();
    }

    pub fn notify_network_type_changed(&self, link_type: LinkType) {
        tracing::info!("Network type changed to {:?}", link_type);
        self.listener.on_network_type_changed(link_type);
    }

    pub fn notify_network_quality_changed(&self, quality: NetworkQuality) {
        tracing::debug!("Network quality changed to {:?}", quality);
        self.listener.on_network_quality_changed(quality);
    }

    pub fn notify_reconnected(&self) {
        self.listener.on_reconnected();
    }

    pub fn notify_reconnection_failed(&self, attempts: u32) {
        tracing::warn!("Reconnection failed after {} attempts, retry still scheduled", attempts);
        self.listener.on_reconnection_failed(attempts);
    }

    pub fn notify_retrying(&self, attempt: u32, delay: Duration) {
        tracing::info!("Retrying connection (attempt {}, backoff {:?})", attempt, delay);
        self.listener.on_retrying(attempt, delay);
    }

    pub fn notify_message(&self, event: &str, payload: &serde_json::Value) {
        self.listener.on_message(event, payload);
    }
}
