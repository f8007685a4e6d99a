use super::{ConnectionListener, ConnectionManager, NoopListener};
use crate::network::ConnectivityProbe;
use crate::providers::{AddressResolver, TokenProvider};
use crate::transport::Transport;
use crate::types::constants::*;
use crate::types::{ResilienceError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Timing and retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionManagerOptions {
    pub min_reconnect_interval: Duration,
    pub max_retry_attempts: u32,
    pub max_backoff_delay: Duration,
    pub reconnect_timeout: Duration,
    pub connection_stabilize_delay: Duration,
    pub network_stabilize_delay: Duration,
    pub network_verification_delay: Duration,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    pub background_reconnect_threshold: Duration,
    /// Start connecting on `register()` when the OS reports a network
    pub connect_on_register: bool,
}

impl Default for ConnectionManagerOptions {
    fn default() -> Self {
        Self {
            min_reconnect_interval: Duration::from_millis(MIN_RECONNECT_INTERVAL),
            max_retry_attempts: MAX_RETRY_ATTEMPTS,
            max_backoff_delay: Duration::from_millis(MAX_BACKOFF_DELAY),
            reconnect_timeout: Duration::from_millis(RECONNECT_TIMEOUT),
            connection_stabilize_delay: Duration::from_millis(CONNECTION_STABILIZE_DELAY),
            network_stabilize_delay: Duration::from_millis(NETWORK_STABILIZE_DELAY),
            network_verification_delay: Duration::from_millis(NETWORK_VERIFICATION_DELAY),
            ping_interval: Duration::from_millis(PING_INTERVAL),
            pong_timeout: Duration::from_millis(PONG_TIMEOUT),
            background_reconnect_threshold: Duration::from_millis(BACKGROUND_RECONNECT_THRESHOLD),
            connect_on_register: true,
        }
    }
}

impl ConnectionManagerOptions {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("min_reconnect_interval", self.min_reconnect_interval),
            ("max_backoff_delay", self.max_backoff_delay),
            ("reconnect_timeout", self.reconnect_timeout),
            ("ping_interval", self.ping_interval),
        ];
        for (name, value) in required {
            if value.is_zero() {
                return Err(ResilienceError::Config(format!("{} must be non-zero", name)));
            }
        }

        if self.max_retry_attempts == 0 {
            return Err(ResilienceError::Config(
                "max_retry_attempts must be at least 1".to_string(),
            ));
        }

        if self.max_backoff_delay < self.min_reconnect_interval {
            return Err(ResilienceError::Config(
                "max_backoff_delay must not be below min_reconnect_interval".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for ConnectionManager that wires collaborators together
pub struct ConnectionManagerBuilder {
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn AddressResolver>,
    tokens: Arc<dyn TokenProvider>,
    probe: Arc<dyn ConnectivityProbe>,
    listener: Arc<dyn ConnectionListener>,
    options: ConnectionManagerOptions,
}

impl ConnectionManagerBuilder {
    pub fn new(
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn AddressResolver>,
        tokens: Arc<dyn TokenProvider>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        Self {
            transport,
            resolver,
            tokens,
            probe,
            listener: Arc::new(NoopListener),
            options: ConnectionManagerOptions::default(),
        }
    }

    pub fn listener(mut self, listener: Arc<dyn ConnectionListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn options(mut self, options: ConnectionManagerOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate the options and build the (unregistered) manager
    pub fn build(self) -> Result<ConnectionManager> {
        self.options.validate()?;

        Ok(ConnectionManager::from_parts(
            self.transport,
            self.resolver,
            self.tokens,
            self.probe,
            self.listener,
            self.options,
        ))
    }
}
