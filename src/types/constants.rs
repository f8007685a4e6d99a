/// Socket event names exchanged with the backend (magic strings layer)
pub mod socket_events {
    pub const CONNECT: &str = "connect";
    pub const DISCONNECT: &str = "disconnect";
    pub const CONNECT_ERROR: &str = "connect_error";
    pub const RECONNECT: &str = "reconnect";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
}

/// Room event names
pub mod room_events {
    pub const JOIN_CHAT: &str = "join_chat";
    pub const LEAVE_CHAT: &str = "leave_chat";
    pub const JOIN_PASEO: &str = "join_paseo";
}

/// Minimum spacing between reconnect attempt starts (milliseconds)
pub const MIN_RECONNECT_INTERVAL: u64 = 5000;

/// Attempts allowed before the scheduler reports `Failed`
pub const MAX_RETRY_ATTEMPTS: u32 = 5;

/// Upper bound of the exponential backoff (milliseconds)
pub const MAX_BACKOFF_DELAY: u64 = 60000;

/// Time a connect sequence has to report success (milliseconds)
pub const RECONNECT_TIMEOUT: u64 = 10000;

/// Settling time between transport success and `Connected` (milliseconds)
pub const CONNECTION_STABILIZE_DELAY: u64 = 2000;

/// Settling time after the OS reports a network (milliseconds)
pub const NETWORK_STABILIZE_DELAY: u64 = 3000;

/// Delay before a network loss is confirmed against the OS (milliseconds)
pub const NETWORK_VERIFICATION_DELAY: u64 = 2000;

/// Heartbeat probe interval (milliseconds)
pub const PING_INTERVAL: u64 = 15000;

/// Grace period for a liveness reply on top of the interval (milliseconds)
pub const PONG_TIMEOUT: u64 = 3000;

/// Foreground return within this window reconnects eagerly (milliseconds)
pub const BACKGROUND_RECONNECT_THRESHOLD: u64 = 5 * 60 * 1000;

/// Default backend port for the WebSocket transport
pub const DEFAULT_PORT: u16 = 3000;

/// WiFi RSSI thresholds (dBm)
pub const RSSI_EXCELLENT: i32 = -55;
pub const RSSI_GOOD: i32 = -70;

/// Downstream bandwidth thresholds (kbps)
pub const BANDWIDTH_EXCELLENT_KBPS: u32 = 10_000;
pub const BANDWIDTH_GOOD_KBPS: u32 = 2_000;
