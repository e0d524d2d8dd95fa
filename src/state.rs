use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemRecord {
    pub timestamp: String,
    pub cpu_percent: f64,
    pub load_1: f64,
    pub load_5: f64,
    pub load_15: f64,
    pub mem_total: u64,
    pub mem_used: u64,
    pub mem_percent: f64,
    pub disk_total: u64,
    pub disk_used: u64,
    pub disk_percent: f64,
    pub temp_c: Option<f64>,
    pub uptime_seconds: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub service_ok: bool,
    pub stats: BTreeMap<String, Option<f64>>,
    pub connected_clients: Option<u64>,
}

/// `None` parts mean no cycle has completed yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub system: Option<SystemRecord>,
    pub pihole: Option<ServiceStatus>,
    pub pivpn: Option<ServiceStatus>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct SnapshotStore {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::default()));
        Self { tx }
    }

    pub fn publish(&self, snapshot: Snapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }

    pub fn read(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
