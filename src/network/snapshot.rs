use crate::types::constants::{
    BANDWIDTH_EXCELLENT_KBPS, BANDWIDTH_GOOD_KBPS, RSSI_EXCELLENT, RSSI_GOOD,
};
use serde::{Deserialize, Serialize};

/// Physical link kind of the active network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkType {
    Wifi,
    Cellular,
    Vpn,
    Ethernet,
    Unknown,
}

impl LinkType {
    /// Whether this link can carry the realtime connection
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Coarse link quality, telemetry only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkQuality {
    Excellent,
    Good,
    Poor,
    Unknown,
}

/// Raw capabilities of a network as reported by the OS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkCapabilities {
    pub link_type: LinkType,
    pub has_internet: bool,
    pub validated: bool,
    pub wifi_rssi_dbm: Option<i32>,
    pub downstream_kbps: Option<u32>,
}

impl NetworkCapabilities {
    pub fn new(link_type: LinkType) -> Self {
        Self {
            link_type,
            has_internet: true,
            validated: true,
            wifi_rssi_dbm: None,
            downstream_kbps: None,
        }
    }

    pub fn wifi(rssi_dbm: i32) -> Self {
        Self::new(LinkType::Wifi).with_rssi(rssi_dbm)
    }

    pub fn cellular(downstream_kbps: u32) -> Self {
        Self::new(LinkType::Cellular).with_downstream_kbps(downstream_kbps)
    }

    pub fn with_rssi(mut self, rssi_dbm: i32) -> Self {
        self.wifi_rssi_dbm = Some(rssi_dbm);
        self
    }

    pub fn with_downstream_kbps(mut self, kbps: u32) -> Self {
        self.downstream_kbps = Some(kbps);
        self
    }

    pub fn without_internet(mut self) -> Self {
        self.has_internet = false;
        self.validated = false;
        self
    }
}

/// Derived view of the active network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub link_type: LinkType,
    pub quality: NetworkQuality,
}

impl NetworkSnapshot {
    pub fn classify(capabilities: &NetworkCapabilities) -> Self {
        Self {
            link_type: capabilities.link_type,
            quality: classify_quality(capabilities),
        }
    }
}

fn classify_quality(capabilities: &NetworkCapabilities) -> NetworkQuality {
    if !capabilities.has_internet {
        return NetworkQuality::Poor;
    }

    match capabilities.link_type {
        LinkType::Wifi => match capabilities.wifi_rssi_dbm {
            Some(rssi) if rssi >= RSSI_EXCELLENT => NetworkQuality::Excellent,
            Some(rssi) if rssi >= RSSI_GOOD => NetworkQuality::Good,
            Some(_) => NetworkQuality::Poor,
            None => NetworkQuality::Unknown,
        },
        LinkType::Cellular | LinkType::Ethernet | LinkType::Vpn => {
            match capabilities.downstream_kbps {
                Some(kbps) if kbps >= BANDWIDTH_EXCELLENT_KBPS => NetworkQuality::Excellent,
                Some(kbps) if kbps >= BANDWIDTH_GOOD_KBPS => NetworkQuality::Good,
                Some(_) => NetworkQuality::Poor,
                None => NetworkQuality::Unknown,
            }
        }
        LinkType::Unknown => NetworkQuality::Unknown,
    }
}
