use crate::state::{ServiceStatus, Snapshot};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    Ok,
    Down,
    Unknown,
}

impl ServiceState {
    pub fn of(status: Option<&ServiceStatus>) -> Self {
        match status.map(|s| s.service_ok) {
            Some(true) => Self::Ok,
            Some(false) => Self::Down,
            None => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Down => "DOWN",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Ok => "status-ok",
            Self::Down => "status-down",
            Self::Unknown => "status-unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub system: SystemHealth,
    pub pihole: PiholeHealth,
    pub pivpn: PivpnHealth,
    pub overall_ok: bool,
    pub last_update: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemHealth {
    pub cpu_percent: Option<f64>,
    pub mem_percent: Option<f64>,
    pub disk_percent: Option<f64>,
    pub temp_c: Option<f64>,
    pub uptime_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PiholeHealth {
    pub status: ServiceState,
    pub stats: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PivpnHealth {
    pub status: ServiceState,
    pub connected_clients: Option<u64>,
}

impl From<&Snapshot> for HealthReport {
    fn from(value: &Snapshot) -> Self {
        let system = value
            .system
            .as_ref()
            .map(|s| SystemHealth {
                cpu_percent: Some(s.cpu_percent),
                mem_percent: Some(s.mem_percent),
                disk_percent: Some(s.disk_percent),
                temp_c: s.temp_c,
                uptime_seconds: s.uptime_seconds,
            })
            .unwrap_or_default();

        let pihole_state = ServiceState::of(value.pihole.as_ref());
        let pivpn_state = ServiceState::of(value.pivpn.as_ref());

        Self {
            system,
            pihole: PiholeHealth {
                status: pihole_state,
                stats: value
                    .pihole
                    .as_ref()
                    .map(|p| p.stats.clone())
                    .unwrap_or_default(),
            },
            pivpn: PivpnHealth {
                status: pivpn_state,
                connected_clients: value.pivpn.as_ref().and_then(|p| p.connected_clients),
            },
            overall_ok: pihole_state == ServiceState::Ok && pivpn_state == ServiceState::Ok,
            last_update: value.system.as_ref().map(|s| s.timestamp.clone()),
            last_error: value.last_error.clone(),
        }
    }
}

impl HealthReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
