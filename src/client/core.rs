use super::event_loop::{Collaborators, Command, ConnectionLoop, ConnectionSnapshot};
use super::scheduler::RequestOutcome;
use super::{
    ConnectionListener, ConnectionManagerBuilder, ConnectionManagerOptions, ConnectionState,
    ConnectionStateMachine, RoomKind, RoomRef,
};
use crate::network::{ConnectivityProbe, NetworkEvent, NetworkEventSender};
use crate::providers::{AddressResolver, TokenProvider};
use crate::transport::Transport;
use crate::types::{ResilienceError, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

struct RunningLoop {
    commands: mpsc::UnboundedSender<Command>,
    network: NetworkEventSender,
    handle: JoinHandle<()>,
}

/// Keeps one logical connection to the realtime backend alive.
///
/// `ConnectionManager` is a thin handle over a background loop task that
/// owns the connection state, the reconnect schedule, the heartbeat and
/// the current room. Network changes, transport events and timer expiries
/// are all serialised through that loop, so the application can call into
/// the handle from anywhere.
///
/// # Example
///
/// ```no_run
/// use realtime_resilience::{
///     ConnectionManager, ManualConnectivityProbe, NetworkCapabilities, NetworkEvent,
///     RoomKind, StaticAddressResolver, StaticTokenProvider, WebSocketTransport,
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let probe = ManualConnectivityProbe::new(Some(NetworkCapabilities::wifi(-60)));
/// let manager = ConnectionManager::builder(
///     Arc::new(WebSocketTransport::new()),
///     Arc::new(StaticAddressResolver::new("192.168.0.147")),
///     Arc::new(StaticTokenProvider::new("secret-token")),
///     Arc::new(probe.clone()),
/// )
/// .build()?;
///
/// manager.register()?;
/// manager.join_room("chat_42", RoomKind::Chat).await?;
///
/// // Forward OS callbacks as they arrive
/// manager.notify_network(NetworkEvent::Lost)?;
///
/// manager.unregister().await?;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn AddressResolver>,
    tokens: Arc<dyn TokenProvider>,
    probe: Arc<dyn ConnectivityProbe>,
    listener: Arc<dyn ConnectionListener>,
    options: ConnectionManagerOptions,

    snapshot_tx: Arc<watch::Sender<ConnectionSnapshot>>,
    running: Mutex<Option<RunningLoop>>,
}

impl ConnectionManager {
    /// Start building a manager around the given collaborators.
    pub fn builder(
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn AddressResolver>,
        tokens: Arc<dyn TokenProvider>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::new(transport, resolver, tokens, probe)
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn AddressResolver>,
        tokens: Arc<dyn TokenProvider>,
        probe: Arc<dyn ConnectivityProbe>,
        listener: Arc<dyn ConnectionListener>,
        options: ConnectionManagerOptions,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(ConnectionSnapshot::default());

        Self {
            transport,
            resolver,
            tokens,
            probe,
            listener,
            options,
            snapshot_tx: Arc::new(snapshot_tx),
            running: Mutex::new(None),
        }
    }

    fn running(&self) -> MutexGuard<'_, Option<RunningLoop>> {
        match self.running.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Start the connection loop and begin watching the transport.
    ///
    /// Connects right away when the OS reports a usable network (unless
    /// `connect_on_register` is off). Calling it on a registered manager is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ResilienceError::Config`] when called outside a tokio runtime.
    pub fn register(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ResilienceError::Config("register() must be called within a tokio runtime".to_string())
        })?;

        let mut running = self.running();
        if let Some(current) = running.as_ref()
            && !current.handle.is_finished()
        {
            tracing::debug!("Connection manager already registered");
            return Ok(());
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (network_tx, network_rx) = mpsc::unbounded_channel();

        self.transport.subscribe(transport_tx);

        let (event_loop, inbox) = ConnectionLoop::new(
            Collaborators {
                transport: Arc::clone(&self.transport),
                resolver: Arc::clone(&self.resolver),
                tokens: Arc::clone(&self.tokens),
                probe: Arc::clone(&self.probe),
            },
            ConnectionStateMachine::new(Arc::clone(&self.listener)),
            self.options.clone(),
            Arc::clone(&self.snapshot_tx),
            command_rx,
            transport_rx,
            network_rx,
        );

        let handle = runtime.spawn(event_loop.run(inbox));
        *running = Some(RunningLoop {
            commands: command_tx,
            network: network_tx,
            handle,
        });

        tracing::info!("Connection manager registered");
        Ok(())
    }

    /// Stop every timer, drop the connection and forget the current room.
    ///
    /// Unregistering an idle manager is a no-op.
    pub async fn unregister(&self) -> Result<()> {
        let Some(running) = self.running().take() else {
            return Ok(());
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if running.commands.send(Command::Shutdown(reply_tx)).is_ok() {
            let _ = reply_rx.await;
        }

        if let Err(e) = running.handle.await
            && !e.is_cancelled()
        {
            tracing::error!("Connection loop ended abnormally: {}", e);
        }

        tracing::info!("Connection manager unregistered");
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.running()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    fn commands(&self) -> Result<mpsc::UnboundedSender<Command>> {
        self.running()
            .as_ref()
            .map(|running| running.commands.clone())
            .ok_or(ResilienceError::NotRegistered)
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let commands = self.commands()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        commands
            .send(make(reply_tx))
            .map_err(|_| ResilienceError::NotRegistered)?;
        reply_rx.await.map_err(|_| ResilienceError::NotRegistered)
    }

    /// Ask for a reconnect.
    ///
    /// The request is dropped while another attempt is in flight, within
    /// the minimum interval of the last attempt, or when already connected.
    /// The returned outcome says which.
    pub async fn request_reconnect(&self) -> Result<RequestOutcome> {
        self.call(Command::RequestReconnect).await
    }

    /// Tear the connection down and connect again from scratch.
    ///
    /// Cancels every pending timer and resets the attempt counter first, so
    /// neither the throttle nor the retry limit applies.
    pub async fn force_reconnect(&self) -> Result<RequestOutcome> {
        self.call(Command::ForceReconnect).await
    }

    /// Remember the room to rejoin after every successful reconnect.
    pub async fn set_current_room(&self, id: impl Into<String>, kind: RoomKind) -> Result<()> {
        let room = RoomRef::new(id, kind);
        self.call(|reply| Command::SetCurrentRoom(room, reply)).await
    }

    /// Remember the room and join it now if connected.
    pub async fn join_room(&self, id: impl Into<String>, kind: RoomKind) -> Result<()> {
        let room = RoomRef::new(id, kind);
        self.call(|reply| Command::JoinRoom(room, reply)).await
    }

    /// Leave and forget the current room.
    pub async fn leave_room(&self) -> Result<()> {
        self.call(Command::LeaveRoom).await
    }

    /// Report the app moving between foreground and background.
    ///
    /// The heartbeat only runs in the foreground. Coming back within the
    /// background threshold while disconnected triggers a reconnect.
    pub async fn set_foreground(&self, foreground: bool) -> Result<()> {
        self.call(|reply| Command::SetForeground(foreground, reply))
            .await
    }

    /// Forward an OS connectivity callback to the loop.
    pub fn notify_network(&self, event: NetworkEvent) -> Result<()> {
        let running = self.running();
        let running = running.as_ref().ok_or(ResilienceError::NotRegistered)?;
        running
            .network
            .send(event)
            .map_err(|_| ResilienceError::NotRegistered)
    }

    /// Sender for platform glue that delivers OS callbacks on its own task.
    pub fn network_sender(&self) -> Result<NetworkEventSender> {
        self.running()
            .as_ref()
            .map(|running| running.network.clone())
            .ok_or(ResilienceError::NotRegistered)
    }

    /// Synchronous OS query, independent of the loop.
    pub fn is_network_available(&self) -> bool {
        self.probe.is_network_available()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.snapshot_tx.borrow().state
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.snapshot_tx.borrow().attempts
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Watch every published snapshot
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.snapshot_tx.subscribe()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(running) = self.running().take() {
            running.handle.abort();
        }
    }
}
