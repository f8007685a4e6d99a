// Network module - OS connectivity classification and debouncing
mod observer;
mod probe;
mod snapshot;

pub use observer::{
    Availability, ConnectivityProbe, LossVerdict, NetworkEvent, NetworkEventSender,
    NetworkObserver,
};
pub use probe::ManualConnectivityProbe;
pub use snapshot::{LinkType, NetworkCapabilities, NetworkQuality, NetworkSnapshot};
