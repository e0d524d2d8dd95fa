use crate::config::{PiholeConfig, PivpnConfig};
use crate::runner::CommandRunner;
use crate::state::ServiceStatus;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ServiceProbe {
    pub service_manager_command: Vec<String>,
    pub timeout: Duration,
}

impl ServiceProbe {
    /// True as soon as one of `units` reports `active`.
    pub async fn any_active(&self, runner: &dyn CommandRunner, units: &[String]) -> bool {
        for unit in units {
            if unit.trim().is_empty() {
                continue;
            }
            let mut argv = self.service_manager_command.clone();
            argv.push(unit.clone());
            if runner.run(&argv, self.timeout).await == "active" {
                return true;
            }
        }
        false
    }
}

pub async fn collect_pihole(
    runner: &dyn CommandRunner,
    probe: &ServiceProbe,
    cfg: &PiholeConfig,
) -> ServiceStatus {
    let service_ok = probe.any_active(runner, &cfg.units).await;
    let raw = runner.run(&cfg.status_command, probe.timeout).await;

    ServiceStatus {
        service_ok,
        stats: parse_pihole_stats(&raw, &cfg.stat_keys),
        connected_clients: None,
    }
}

pub async fn collect_pivpn(
    runner: &dyn CommandRunner,
    probe: &ServiceProbe,
    cfg: &PivpnConfig,
) -> ServiceStatus {
    let service_ok = probe.any_active(runner, &cfg.units).await;
    let raw = runner.run(&cfg.clients_command, probe.timeout).await;

    ServiceStatus {
        service_ok,
        stats: BTreeMap::new(),
        connected_clients: count_vpn_clients(&raw, cfg.header_lines),
    }
}

// Non-object input yields an empty map.
pub fn parse_pihole_stats(raw: &str, keys: &[String]) -> BTreeMap<String, Option<f64>> {
    if raw.trim().is_empty() {
        return BTreeMap::new();
    }
    let doc = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(doc)) => doc,
        Ok(_) => {
            debug!("pihole status is not a JSON object");
            return BTreeMap::new();
        }
        Err(err) => {
            debug!(error = %err, "pihole status is not valid JSON");
            return BTreeMap::new();
        }
    };

    keys.iter()
        .map(|key| (key.clone(), doc.get(key).and_then(numeric)))
        .collect()
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        // Older releases print counters as "1,234".
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

// Nothing past the header is unknown, not zero.
pub fn count_vpn_clients(raw: &str, header_lines: usize) -> Option<u64> {
    let lines = raw.lines().filter(|l| !l.trim().is_empty()).count();
    if lines > header_lines {
        Some((lines - header_lines) as u64)
    } else {
        None
    }
}
