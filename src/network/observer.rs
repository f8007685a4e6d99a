use super::{LinkType, NetworkCapabilities, NetworkQuality, NetworkSnapshot};
use tokio::sync::mpsc;

/// OS connectivity notifications, marshalled onto the connection loop
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    Available(NetworkCapabilities),
    Lost,
    CapabilitiesChanged(NetworkCapabilities),
}

/// Sender handed to platform glue that receives OS callbacks
pub type NetworkEventSender = mpsc::UnboundedSender<NetworkEvent>;

/// Synchronous query of the OS for the current default network
pub trait ConnectivityProbe: Send + Sync + 'static {
    fn active_network(&self) -> Option<NetworkCapabilities>;

    /// An active network with a usable transport
    fn is_network_available(&self) -> bool {
        self.active_network()
            .is_some_and(|network| network.link_type.is_usable())
    }
}

/// What changed when a network became available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub snapshot: NetworkSnapshot,
    /// Set when the link type differs from the previous snapshot
    pub type_changed: Option<LinkType>,
}

/// Outcome of re-checking the OS after a loss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossVerdict {
    /// Still no network
    Confirmed,
    /// Another network took over; transient blip
    Handoff(NetworkSnapshot),
}

/// Classifies connectivity callbacks and filters the noise out of them.
///
/// Holds the last snapshot so type and quality notifications fire only on
/// change. Timing (stabilisation, loss verification) is the loop's job.
#[derive(Debug, Clone, Default)]
pub struct NetworkObserver {
    current: Option<NetworkSnapshot>,
}

impl NetworkObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<NetworkSnapshot> {
        self.current
    }

    pub fn on_available(&mut self, capabilities: &NetworkCapabilities) -> Availability {
        let snapshot = NetworkSnapshot::classify(capabilities);
        let type_changed = match self.current {
            Some(previous) if previous.link_type == snapshot.link_type => None,
            _ => Some(snapshot.link_type),
        };
        tracing::info!(
            "Network available: {:?} ({:?})",
            snapshot.link_type,
            snapshot.quality
        );
        self.current = Some(snapshot);
        Availability {
            snapshot,
            type_changed,
        }
    }

    pub fn on_lost(&mut self) {
        tracing::warn!("Network lost, verifying");
    }

    /// Returns the new quality if it changed
    pub fn on_capabilities_changed(
        &mut self,
        capabilities: &NetworkCapabilities,
    ) -> Option<NetworkQuality> {
        let snapshot = NetworkSnapshot::classify(capabilities);
        let previous = self.current.replace(snapshot);
        match previous {
            Some(previous) if previous.quality == snapshot.quality => None,
            _ => Some(snapshot.quality),
        }
    }

    pub fn verify_loss(&mut self, active: Option<&NetworkCapabilities>) -> LossVerdict {
        match active {
            None => LossVerdict::Confirmed,
            Some(capabilities) => {
                let snapshot = NetworkSnapshot::classify(capabilities);
                tracing::debug!("Network handoff to {:?}, not a loss", snapshot.link_type);
                LossVerdict::Handoff(snapshot)
            }
        }
    }
}
