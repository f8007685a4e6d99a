use super::scheduler::{AttemptPhase, FailureOutcome, RequestOrigin, RequestOutcome};
use super::{
    AppLifecycle, ConnectionManagerOptions, ConnectionState, ConnectionStateMachine,
    ReconnectScheduler, RoomRef, RoomSession,
};
use crate::heartbeat::{HeartbeatAction, HeartbeatMonitor};
use crate::infrastructure::{Backoff, TaskManager, TimerKind, TimerToken};
use crate::network::{ConnectivityProbe, LossVerdict, NetworkEvent, NetworkObserver, NetworkSnapshot};
use crate::providers::{AddressResolver, TokenProvider};
use crate::transport::{Transport, TransportEvent};
use crate::types::{ResilienceError, Result};
use crate::types::constants::socket_events;
use serde::Serialize;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Requests from the public handle, each answered over a oneshot
pub(crate) enum Command {
    RequestReconnect(oneshot::Sender<RequestOutcome>),
    ForceReconnect(oneshot::Sender<RequestOutcome>),
    SetCurrentRoom(RoomRef, oneshot::Sender<()>),
    JoinRoom(RoomRef, oneshot::Sender<()>),
    LeaveRoom(oneshot::Sender<()>),
    SetForeground(bool, oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Result of a spawned connect sequence
pub(crate) struct ConnectOutcome {
    sequence: u64,
    result: Result<()>,
}

/// Read-only view of the loop, republished after every event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub attempts: u32,
    pub in_flight: bool,
    pub room: Option<RoomRef>,
    pub network: Option<NetworkSnapshot>,
    pub foreground: bool,
    pub heartbeat_running: bool,
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            in_flight: false,
            room: None,
            network: None,
            foreground: true,
            heartbeat_running: false,
        }
    }
}

/// External collaborators the loop drives
pub(crate) struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub resolver: Arc<dyn AddressResolver>,
    pub tokens: Arc<dyn TokenProvider>,
    pub probe: Arc<dyn ConnectivityProbe>,
}

/// Everything that feeds the loop
pub(crate) struct LoopInbox {
    pub commands: mpsc::UnboundedReceiver<Command>,
    pub transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    pub network_events: mpsc::UnboundedReceiver<NetworkEvent>,
    timers: mpsc::UnboundedReceiver<TimerToken>,
    outcomes: mpsc::UnboundedReceiver<ConnectOutcome>,
}

/// The single owner of all connection state.
///
/// Every mutation happens inside [`run`](Self::run); other tasks only talk
/// to it through channels.
pub(crate) struct ConnectionLoop {
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn AddressResolver>,
    tokens: Arc<dyn TokenProvider>,
    probe: Arc<dyn ConnectivityProbe>,
    options: ConnectionManagerOptions,

    machine: ConnectionStateMachine,
    scheduler: ReconnectScheduler,
    heartbeat: HeartbeatMonitor,
    observer: NetworkObserver,
    room: RoomSession,
    lifecycle: AppLifecycle,

    timers: TaskManager,
    outcome_tx: mpsc::UnboundedSender<ConnectOutcome>,
    connect_task: Option<JoinHandle<()>>,
    retry_origin: RequestOrigin,
    /// Next connect sequence must drop the old physical connection first
    teardown_next: bool,

    snapshot_tx: Arc<watch::Sender<ConnectionSnapshot>>,
}

impl ConnectionLoop {
    pub(crate) fn new(
        collaborators: Collaborators,
        machine: ConnectionStateMachine,
        options: ConnectionManagerOptions,
        snapshot_tx: Arc<watch::Sender<ConnectionSnapshot>>,
        commands: mpsc::UnboundedReceiver<Command>,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        network_events: mpsc::UnboundedReceiver<NetworkEvent>,
    ) -> (Self, LoopInbox) {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let scheduler = ReconnectScheduler::new(
            Backoff::new(options.min_reconnect_interval, options.max_backoff_delay),
            options.min_reconnect_interval,
            options.max_retry_attempts,
        );
        let heartbeat = HeartbeatMonitor::new(options.ping_interval, options.pong_timeout);

        let event_loop = Self {
            transport: collaborators.transport,
            resolver: collaborators.resolver,
            tokens: collaborators.tokens,
            probe: collaborators.probe,
            options,
            machine,
            scheduler,
            heartbeat,
            observer: NetworkObserver::new(),
            room: RoomSession::new(),
            lifecycle: AppLifecycle::new(),
            timers: TaskManager::new(timer_tx),
            outcome_tx,
            connect_task: None,
            retry_origin: RequestOrigin::ScheduledRetry,
            teardown_next: false,
            snapshot_tx,
        };

        let inbox = LoopInbox {
            commands,
            transport_events,
            network_events,
            timers: timer_rx,
            outcomes: outcome_rx,
        };

        (event_loop, inbox)
    }

    pub(crate) async fn run(mut self, mut inbox: LoopInbox) {
        tracing::info!("Connection loop started");

        if self.options.connect_on_register && self.probe.is_network_available() {
            self.request(RequestOrigin::External);
        }
        self.publish();

        loop {
            tokio::select! {
                command = inbox.commands.recv() => {
                    let flow = match command {
                        Some(command) => self.handle_command(command).await,
                        // Every handle is gone
                        None => {
                            self.teardown().await;
                            ControlFlow::Break(())
                        }
                    };
                    if flow.is_break() {
                        break;
                    }
                }
                Some(event) = inbox.transport_events.recv() => self.handle_transport_event(event),
                Some(event) = inbox.network_events.recv() => self.handle_network_event(event),
                Some(token) = inbox.timers.recv() => self.handle_timer(token),
                Some(outcome) = inbox.outcomes.recv() => self.handle_connect_outcome(outcome),
            }
            self.publish();
        }

        tracing::info!("Connection loop finished");
    }

    fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            state: self.machine.state(),
            attempts: self.scheduler.attempts(),
            in_flight: self.scheduler.is_in_flight(),
            room: self.room.current().cloned(),
            network: self.observer.current(),
            foreground: self.lifecycle.is_foreground(),
            heartbeat_running: self.heartbeat.is_running(),
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::RequestReconnect(reply) => {
                let outcome = self.request(RequestOrigin::External);
                self.publish();
                let _ = reply.send(outcome);
            }
            Command::ForceReconnect(reply) => {
                let outcome = self.force_reconnect("requested by application");
                self.publish();
                let _ = reply.send(outcome);
            }
            Command::SetCurrentRoom(room, reply) => {
                self.room.set_current_room(room);
                self.publish();
                let _ = reply.send(());
            }
            Command::JoinRoom(room, reply) => {
                self.room.set_current_room(room);
                if self.machine.is_connected()
                    && let Some((event, payload)) = self.room.rejoin()
                {
                    self.send(event.as_str(), payload);
                }
                self.publish();
                let _ = reply.send(());
            }
            Command::LeaveRoom(reply) => {
                if let Some((event, payload)) = self.room.leave()
                    && self.machine.is_connected()
                {
                    self.send(event.as_str(), payload);
                }
                self.publish();
                let _ = reply.send(());
            }
            Command::SetForeground(foreground, reply) => {
                self.set_foreground(foreground);
                self.publish();
                let _ = reply.send(());
            }
            Command::Shutdown(reply) => {
                self.teardown().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn set_foreground(&mut self, foreground: bool) {
        let now = Instant::now();
        if !foreground {
            self.lifecycle.enter_background(now);
            self.stop_heartbeat();
            tracing::debug!("App in background, heartbeat paused");
            return;
        }

        let Some(away) = self.lifecycle.enter_foreground(now) else {
            return;
        };

        if self.machine.is_connected() {
            self.start_heartbeat();
        } else if away < self.options.background_reconnect_threshold {
            tracing::info!("Back in foreground after {:?}, reconnecting", away);
            self.request_internal();
        }
    }

    // ----- reconnect scheduling -----

    fn request(&mut self, origin: RequestOrigin) -> RequestOutcome {
        let already_connected = self.machine.is_connected() && self.transport.is_connected();
        let outcome = self
            .scheduler
            .request(Instant::now(), already_connected, origin);

        match outcome {
            RequestOutcome::Started { attempt, sequence } => self.start_attempt(attempt, sequence),
            RequestOutcome::Exhausted { attempts, retry_in } => {
                if !self.timers.is_armed(TimerKind::Retry) {
                    self.arm_retry(retry_in, RequestOrigin::ExhaustedRetry);
                    self.machine.transition(ConnectionState::Failed);
                    self.machine.notify_reconnection_failed(attempts);
                }
            }
            RequestOutcome::InFlight => {
                tracing::debug!("Reconnect already in progress, ignoring");
            }
            RequestOutcome::Throttled { remaining } => {
                tracing::debug!("Too soon to reconnect, {:?} left in window", remaining);
            }
            RequestOutcome::AlreadyConnected => {
                tracing::debug!("Already connected, no reconnect needed");
            }
        }

        outcome
    }

    /// Request on behalf of the loop itself; a throttled request is
    /// deferred to the end of the window instead of dropped.
    ///
    /// A pending backoff retry wins unless the counter was reset, so the
    /// backoff is never shortened.
    fn request_internal(&mut self) {
        if let RequestOutcome::Throttled { remaining } = self.request(RequestOrigin::External) {
            if self.timers.is_armed(TimerKind::Retry) && self.scheduler.attempts() > 0 {
                tracing::debug!("Backoff retry already pending, keeping it");
                return;
            }
            // Not ExhaustedRetry: a spent counter re-enters the exhaustion path
            self.arm_retry(remaining, RequestOrigin::ScheduledRetry);
        }
    }

    fn arm_retry(&mut self, delay: std::time::Duration, origin: RequestOrigin) {
        self.retry_origin = origin;
        self.timers.arm(TimerKind::Retry, delay);
    }

    fn start_attempt(&mut self, attempt: u32, sequence: u64) {
        if self.machine.is_connected() {
            // Transport dropped without telling us
            self.stop_heartbeat();
            self.machine.transition(ConnectionState::Disconnected);
            self.teardown_next = true;
        }

        let target = match self.machine.state() {
            ConnectionState::Disconnected => ConnectionState::Connecting,
            _ => ConnectionState::Reconnecting,
        };
        self.machine.transition(target);

        self.timers.cancel(TimerKind::Retry);
        if attempt > 1 {
            self.machine
                .notify_retrying(attempt, self.scheduler.retry_delay(attempt));
        }

        tracing::info!("Connecting (attempt {})", attempt);
        self.timers
            .arm(TimerKind::ConnectTimeout, self.options.reconnect_timeout);
        self.spawn_connect(sequence);
    }

    fn spawn_connect(&mut self, sequence: u64) {
        self.abort_connect_task();

        let transport = Arc::clone(&self.transport);
        let resolver = Arc::clone(&self.resolver);
        let tokens = Arc::clone(&self.tokens);
        let outcome_tx = self.outcome_tx.clone();
        let teardown_first = std::mem::take(&mut self.teardown_next);

        self.connect_task = Some(tokio::spawn(async move {
            let result: Result<()> = async {
                let host = resolver.resolve_host().await?;
                let token = tokens.get_token(true).await?;
                if teardown_first || transport.is_connected() {
                    transport.disconnect().await?;
                }
                transport.connect(&host, &token).await
            }
            .await;

            let _ = outcome_tx.send(ConnectOutcome { sequence, result });
        }));
    }

    fn abort_connect_task(&mut self) {
        if let Some(handle) = self.connect_task.take() {
            handle.abort();
        }
    }

    fn handle_connect_outcome(&mut self, outcome: ConnectOutcome) {
        match outcome.result {
            Ok(()) => {
                if !self.scheduler.connect_succeeded(outcome.sequence) {
                    tracing::debug!("Ignoring stale connect result #{}", outcome.sequence);
                    return;
                }
                self.timers.cancel(TimerKind::ConnectTimeout);
                tracing::debug!(
                    "Transport connected, waiting {:?} for the link to settle",
                    self.options.connection_stabilize_delay
                );
                self.timers.arm(
                    TimerKind::ConnectionStabilize,
                    self.options.connection_stabilize_delay,
                );
            }
            Err(e) => self.fail_attempt(outcome.sequence, e),
        }
    }

    fn fail_attempt(&mut self, sequence: u64, error: ResilienceError) {
        let Some(failure) = self.scheduler.fail(sequence) else {
            tracing::debug!("Ignoring failure of stale attempt #{}", sequence);
            return;
        };

        self.timers.cancel(TimerKind::ConnectTimeout);
        self.timers.cancel(TimerKind::ConnectionStabilize);
        self.abort_connect_task();
        tracing::warn!("Connect attempt failed: {}", error);

        match failure {
            FailureOutcome::Retry { attempts, retry_in } => {
                self.machine.transition(ConnectionState::Reconnecting);
                tracing::info!("Attempt {} failed, retrying in {:?}", attempts, retry_in);
                self.arm_retry(retry_in, RequestOrigin::ScheduledRetry);
            }
            FailureOutcome::Exhausted { attempts, retry_in } => {
                self.machine.transition(ConnectionState::Failed);
                self.arm_retry(retry_in, RequestOrigin::ExhaustedRetry);
                self.machine.notify_reconnection_failed(attempts);
            }
        }
    }

    fn finish_attempt(&mut self) {
        let sequence = self.scheduler.sequence();
        if !self.transport.is_connected() {
            self.teardown_next = true;
            self.fail_attempt(
                sequence,
                ResilienceError::Connection("connection dropped while stabilizing".to_string()),
            );
            return;
        }

        if self.scheduler.complete(sequence) {
            self.enter_connected();
        }
    }

    fn enter_connected(&mut self) {
        if !self.machine.transition(ConnectionState::Connected) {
            return;
        }

        if let Some((event, payload)) = self.room.rejoin() {
            self.send(event.as_str(), payload);
        }
        self.machine.notify_reconnected();
        self.start_heartbeat();
        tracing::info!("Connection established");
    }

    fn force_reconnect(&mut self, reason: &str) -> RequestOutcome {
        tracing::info!("Forcing reconnect: {}", reason);

        self.timers.cancel_all();
        self.abort_connect_task();
        self.stop_heartbeat();
        self.scheduler.reset();
        self.teardown_next = true;
        self.machine.transition(ConnectionState::Disconnected);

        self.request(RequestOrigin::External)
    }

    // ----- heartbeat -----

    fn start_heartbeat(&mut self) {
        if !self.machine.is_connected() || !self.lifecycle.is_foreground() {
            return;
        }
        self.heartbeat.start(Instant::now());
        self.timers.arm(TimerKind::Heartbeat, self.heartbeat.interval());
    }

    fn stop_heartbeat(&mut self) {
        self.heartbeat.stop();
        self.timers.cancel(TimerKind::Heartbeat);
    }

    fn heartbeat_tick(&mut self) {
        match self.heartbeat.on_tick(Instant::now()) {
            Some(HeartbeatAction::SendPing) => {
                self.send(socket_events::PING, serde_json::json!({}));
                self.timers.arm(TimerKind::Heartbeat, self.heartbeat.interval());
            }
            Some(HeartbeatAction::Expired { .. }) => {
                self.force_reconnect("heartbeat expired");
            }
            None => {}
        }
    }

    /// Drop a half-open connection without waiting for the next attempt
    fn disconnect_transport(&self) {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            if let Err(e) = transport.disconnect().await {
                tracing::warn!("Transport disconnect failed: {}", e);
            }
        });
    }

    fn send(&self, event: &str, payload: serde_json::Value) {
        let transport = Arc::clone(&self.transport);
        let event = event.to_string();
        tokio::spawn(async move {
            if let Err(e) = transport.send(&event, payload).await {
                tracing::error!("Failed to send {}: {}", event, e);
            }
        });
    }

    // ----- inbound events -----

    fn handle_timer(&mut self, token: TimerToken) {
        if !self.timers.accept(token) {
            tracing::trace!("Dropping stale {:?} timer", token.kind);
            return;
        }

        match token.kind {
            TimerKind::Retry => {
                self.request(self.retry_origin);
            }
            TimerKind::ConnectTimeout => {
                self.teardown_next = true;
                self.fail_attempt(self.scheduler.sequence(), ResilienceError::Timeout);
                self.disconnect_transport();
            }
            TimerKind::ConnectionStabilize => self.finish_attempt(),
            TimerKind::NetworkStabilize => {
                if !self.scheduler.is_in_flight() {
                    self.scheduler.reset_count();
                }
                self.request_internal();
            }
            TimerKind::LossVerification => {
                let active = self.probe.active_network();
                match self.observer.verify_loss(active.as_ref()) {
                    LossVerdict::Confirmed => self.machine.notify_network_lost(),
                    LossVerdict::Handoff(_) => {}
                }
            }
            TimerKind::Heartbeat => self.heartbeat_tick(),
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                tracing::debug!("Transport reported connect");
            }
            TransportEvent::Disconnected { reason } => {
                if !self.machine.is_connected() {
                    tracing::debug!(
                        "Transport disconnect while {}: {}",
                        self.machine.state(),
                        reason
                    );
                    return;
                }
                tracing::warn!("Transport disconnected: {}", reason);
                self.stop_heartbeat();
                self.machine.transition(ConnectionState::Disconnected);
                if self.probe.is_network_available() {
                    self.request_internal();
                }
            }
            TransportEvent::ConnectError { message } => {
                if self.scheduler.phase() == AttemptPhase::Connecting {
                    self.teardown_next = true;
                    self.fail_attempt(self.scheduler.sequence(), ResilienceError::Connection(message));
                } else {
                    tracing::debug!("Connect error outside an attempt: {}", message);
                }
            }
            TransportEvent::Reconnected => {
                if self.scheduler.is_in_flight()
                    || self.machine.is_connected()
                    || !self.transport.is_connected()
                {
                    return;
                }
                let staging = match self.machine.state() {
                    ConnectionState::Disconnected => Some(ConnectionState::Connecting),
                    ConnectionState::Failed => Some(ConnectionState::Reconnecting),
                    _ => None,
                };
                if let Some(staging) = staging {
                    self.machine.transition(staging);
                }
                if !self
                    .machine
                    .state()
                    .can_transition_to(ConnectionState::Connected)
                {
                    tracing::warn!(
                        "Ignoring transport reconnect while {}",
                        self.machine.state()
                    );
                    return;
                }

                tracing::info!("Transport restored the connection on its own");
                self.timers.cancel(TimerKind::Retry);
                self.scheduler.reset_count();
                self.enter_connected();
            }
            TransportEvent::Pong => self.heartbeat.record_pong(Instant::now()),
            TransportEvent::Message { event, payload } => {
                self.machine.notify_message(&event, &payload);
            }
        }
    }

    fn handle_network_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Available(capabilities) => {
                let availability = self.observer.on_available(&capabilities);
                self.machine.notify_network_available();
                if let Some(link_type) = availability.type_changed {
                    self.machine.notify_network_type_changed(link_type);
                }
                self.timers.cancel(TimerKind::LossVerification);
                self.timers.arm(
                    TimerKind::NetworkStabilize,
                    self.options.network_stabilize_delay,
                );
            }
            NetworkEvent::Lost => {
                self.observer.on_lost();
                if self.machine.is_connected() {
                    self.stop_heartbeat();
                    self.machine.transition(ConnectionState::Disconnected);
                }
                self.timers.cancel(TimerKind::NetworkStabilize);
                self.timers.arm(
                    TimerKind::LossVerification,
                    self.options.network_verification_delay,
                );
            }
            NetworkEvent::CapabilitiesChanged(capabilities) => {
                if !self.machine.is_connected() {
                    return;
                }
                if let Some(quality) = self.observer.on_capabilities_changed(&capabilities) {
                    self.machine.notify_network_quality_changed(quality);
                }
            }
        }
    }

    async fn teardown(&mut self) {
        tracing::info!("Tearing down connection manager");

        self.timers.cancel_all();
        self.abort_connect_task();
        self.stop_heartbeat();
        self.scheduler.reset();
        self.room.clear();
        self.machine.transition(ConnectionState::Disconnected);

        if let Err(e) = self.transport.disconnect().await {
            tracing::warn!("Transport disconnect during teardown failed: {}", e);
        }
        self.publish();
    }
}

impl Drop for ConnectionLoop {
    fn drop(&mut self) {
        self.abort_connect_task();
    }
}
