#![allow(dead_code)]
//! Shared fakes for the connection manager integration tests.

use async_trait::async_trait;
use realtime_resilience::{
    AddressResolver, ConnectionListener, ConnectionManager, ConnectionManagerOptions,
    ConnectionState, LinkType, ManualConnectivityProbe, NetworkCapabilities, NetworkQuality,
    ResilienceError, Result, StaticAddressResolver, StaticTokenProvider, TokenProvider, Transport,
    TransportEvent, TransportEventSink,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectMode {
    Succeed,
    Fail(String),
    Hang,
}

/// In-memory transport whose connect behaviour is scripted per test
pub struct FakeTransport {
    mode: Mutex<ConnectMode>,
    connected: AtomicBool,
    auto_pong: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    sent: Mutex<Vec<(String, Value)>>,
    sink: Mutex<Option<TransportEventSink>>,
}

impl FakeTransport {
    pub fn new(mode: ConnectMode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            connected: AtomicBool::new(false),
            auto_pong: AtomicBool::new(true),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
        })
    }

    pub fn set_mode(&self, mode: ConnectMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn set_auto_pong(&self, enabled: bool) {
        self.auto_pong.store(enabled, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_events(&self, event: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload)
            .collect()
    }

    pub fn emit(&self, event: TransportEvent) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            let _ = sink.send(event);
        }
    }

    /// Server side drops the socket
    pub fn drop_connection(&self, reason: &str) {
        self.connected.store(false, Ordering::SeqCst);
        self.emit(TransportEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Transport-level reconnect finished without the manager's help
    pub fn restore(&self) {
        self.connected.store(true, Ordering::SeqCst);
        self.emit(TransportEvent::Reconnected);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, _host: &str, _token: &str) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            ConnectMode::Succeed => {
                self.connected.store(true, Ordering::SeqCst);
                self.emit(TransportEvent::Connected);
                Ok(())
            }
            ConnectMode::Fail(message) => Err(ResilienceError::Connection(message)),
            ConnectMode::Hang => std::future::pending().await,
        }
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, event: &str, payload: Value) -> Result<()> {
        if !self.is_connected() {
            return Err(ResilienceError::NotConnected);
        }
        self.sent
            .lock()
            .unwrap()
            .push((event.to_string(), payload));
        if event == "ping" && self.auto_pong.load(Ordering::SeqCst) {
            self.emit(TransportEvent::Pong);
        }
        Ok(())
    }

    fn subscribe(&self, sink: TransportEventSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }
}

/// Token provider that always fails
pub struct RejectingTokenProvider;

#[async_trait]
impl TokenProvider for RejectingTokenProvider {
    async fn get_token(&self, _force_refresh: bool) -> Result<String> {
        Err(ResilienceError::Auth("session expired".to_string()))
    }
}

/// Listener that records every callback as a short string
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.starts_with(prefix))
            .count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ConnectionListener for RecordingListener {
    fn on_network_lost(&self) {
        self.push("lost".to_string());
    }

    fn on_network_available(&self) {
        self.push("available".to_string());
    }

    fn on_reconnected(&self) {
        self.push("reconnected".to_string());
    }

    fn on_network_type_changed(&self, link_type: LinkType) {
        self.push(format!("type:{:?}", link_type));
    }

    fn on_network_quality_changed(&self, quality: NetworkQuality) {
        self.push(format!("quality:{:?}", quality));
    }

    fn on_reconnection_failed(&self, attempts: u32) {
        self.push(format!("failed:{}", attempts));
    }

    fn on_retrying(&self, attempt: u32, delay: Duration) {
        self.push(format!("retrying:{}:{}", attempt, delay.as_secs()));
    }

    fn on_state_changed(&self, from: ConnectionState, to: ConnectionState) {
        self.push(format!("state:{}->{}", from, to));
    }

    fn on_message(&self, event: &str, payload: &Value) {
        self.push(format!("message:{}:{}", event, payload));
    }
}

pub struct Harness {
    pub manager: ConnectionManager,
    pub transport: Arc<FakeTransport>,
    pub probe: ManualConnectivityProbe,
    pub listener: Arc<RecordingListener>,
}

impl Harness {
    pub fn new(mode: ConnectMode) -> Self {
        Self::with_tokens(mode, Arc::new(StaticTokenProvider::new("token")))
    }

    pub fn with_tokens(mode: ConnectMode, tokens: Arc<dyn TokenProvider>) -> Self {
        let transport = FakeTransport::new(mode);
        let probe = ManualConnectivityProbe::new(Some(NetworkCapabilities::wifi(-50)));
        let listener = Arc::new(RecordingListener::default());
        let resolver: Arc<dyn AddressResolver> = Arc::new(StaticAddressResolver::new("10.0.0.2"));

        let manager = ConnectionManager::builder(
            transport.clone(),
            resolver,
            tokens,
            Arc::new(probe.clone()),
        )
        .listener(listener.clone())
        .options(ConnectionManagerOptions::default())
        .build()
        .unwrap();

        Self {
            manager,
            transport,
            probe,
            listener,
        }
    }
}

/// Let the paused clock run forward, processing everything due on the way
pub async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}
