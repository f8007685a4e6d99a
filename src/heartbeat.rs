use crate::types::{PING_INTERVAL, PONG_TIMEOUT};
use std::time::Duration;
use tokio::time::Instant;

/// What the loop should do on a heartbeat tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Send a liveness probe and arm the next tick
    SendPing,
    /// No reply within interval + timeout; the monitor stopped itself
    Expired { silent_for: Duration },
}

/// Liveness tracking for an established connection.
///
/// The monitor holds no timers itself: the connection loop arms a tick
/// every [`interval`](Self::interval) while the monitor
/// [`is_running`](Self::is_running) and feeds the result of
/// [`on_tick`](Self::on_tick) back into its own decisions.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    ping_interval: Duration,
    pong_timeout: Duration,
    last_pong_at: Option<Instant>,
    running: bool,
}

impl HeartbeatMonitor {
    pub fn new(ping_interval: Duration, pong_timeout: Duration) -> Self {
        Self {
            ping_interval,
            pong_timeout,
            last_pong_at: None,
            running: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.ping_interval
    }

    /// Longest tolerated silence before the connection is declared dead
    pub fn deadline(&self) -> Duration {
        self.ping_interval + self.pong_timeout
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_pong_at(&self) -> Option<Instant> {
        self.last_pong_at
    }

    /// Start monitoring; the connection counts as fresh at `now`
    pub fn start(&mut self, now: Instant) {
        self.running = true;
        self.last_pong_at = Some(now);
        tracing::debug!("Heartbeat started (interval {:?})", self.ping_interval);
    }

    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!("Heartbeat stopped");
        }
        self.running = false;
    }

    /// Any liveness reply refreshes the deadline, running or not
    pub fn record_pong(&mut self, now: Instant) {
        self.last_pong_at = Some(now);
        tracing::trace!("Pong received");
    }

    pub fn on_tick(&mut self, now: Instant) -> Option<HeartbeatAction> {
        if !self.running {
            return None;
        }

        let last = self.last_pong_at.unwrap_or(now);
        let silent_for = now.saturating_duration_since(last);
        if silent_for > self.deadline() {
            self.running = false;
            tracing::warn!(
                "[Heartbeat] No liveness reply for {:?}, declaring connection dead",
                silent_for
            );
            return Some(HeartbeatAction::Expired { silent_for });
        }

        Some(HeartbeatAction::SendPing)
    }
}

impl Default for HeartbeatMonitor {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(PING_INTERVAL),
            Duration::from_millis(PONG_TIMEOUT),
        )
    }
}
