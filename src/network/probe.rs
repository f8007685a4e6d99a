use super::{ConnectivityProbe, NetworkCapabilities};
use std::sync::{Arc, RwLock};

/// Probe whose answer is pushed in by the embedding platform layer.
///
/// Cloning shares the underlying state, so one clone can live with the OS
/// glue while another is handed to the manager.
#[derive(Debug, Clone, Default)]
pub struct ManualConnectivityProbe {
    active: Arc<RwLock<Option<NetworkCapabilities>>>,
}

impl ManualConnectivityProbe {
    pub fn new(active: Option<NetworkCapabilities>) -> Self {
        Self {
            active: Arc::new(RwLock::new(active)),
        }
    }

    pub fn set_active(&self, active: Option<NetworkCapabilities>) {
        match self.active.write() {
            Ok(mut guard) => *guard = active,
            Err(poisoned) => *poisoned.into_inner() = active,
        }
    }
}

impl ConnectivityProbe for ManualConnectivityProbe {
    fn active_network(&self) -> Option<NetworkCapabilities> {
        match self.active.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
