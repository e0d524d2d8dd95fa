use crate::state::Snapshot;
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{opts, Gauge, Registry};
use std::fmt::Write as _;

pub struct MetricsView {
    registry: Registry,
}

impl MetricsView {
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let system = snapshot.system.as_ref();

        // Filled with 0 before the first poll.
        let (cpu, load_1, load_5, load_15, mem, disk) = system
            .map(|s| {
                (
                    s.cpu_percent,
                    s.load_1,
                    s.load_5,
                    s.load_15,
                    s.mem_percent,
                    s.disk_percent,
                )
            })
            .unwrap_or_default();
        gauge(&registry, "pi_cpu_percent", "CPU usage in percent", cpu)?;
        gauge(&registry, "pi_load1", "1 minute load average", load_1)?;
        gauge(&registry, "pi_load5", "5 minute load average", load_5)?;
        gauge(&registry, "pi_load15", "15 minute load average", load_15)?;
        gauge(&registry, "pi_mem_percent", "Memory usage in percent", mem)?;
        gauge(&registry, "pi_disk_percent", "Root filesystem usage in percent", disk)?;

        if let Some(temp) = system.and_then(|s| s.temp_c) {
            gauge(&registry, "pi_temp_c", "CPU temperature in Celsius", temp)?;
        }
        if let Some(uptime) = system.and_then(|s| s.uptime_seconds) {
            gauge(&registry, "pi_uptime_seconds", "System uptime in seconds", uptime)?;
        }

        let pihole = snapshot.pihole.as_ref();
        gauge(
            &registry,
            "pihole_service_ok",
            "Pi-hole service active 0/1",
            flag(pihole.map(|p| p.service_ok)),
        )?;
        for (key, v) in pihole.into_iter().flat_map(|p| p.stats.iter()) {
            if let Some(v) = v {
                gauge(&registry, &format!("pihole_{key}"), "Pi-hole status counter", *v)?;
            }
        }

        let pivpn = snapshot.pivpn.as_ref();
        gauge(
            &registry,
            "pivpn_service_ok",
            "PiVPN service active 0/1",
            flag(pivpn.map(|p| p.service_ok)),
        )?;
        if let Some(clients) = pivpn.and_then(|p| p.connected_clients) {
            gauge(
                &registry,
                "pivpn_connected_clients",
                "Clients listed by pivpn",
                clients as f64,
            )?;
        }

        Ok(Self { registry })
    }

    pub fn encode(&self) -> String {
        encode_flat(&self.registry.gather())
    }
}

fn flag(ok: Option<bool>) -> f64 {
    if ok == Some(true) {
        1.0
    } else {
        0.0
    }
}

fn gauge(registry: &Registry, name: &str, help: &str, value: f64) -> Result<(), prometheus::Error> {
    let gauge = Gauge::with_opts(opts!(name, help))?;
    gauge.set(value);
    register(registry, &gauge)
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}

fn encode_flat(families: &[MetricFamily]) -> String {
    let mut out = String::new();
    for mf in families {
        for m in mf.get_metric() {
            let _ = writeln!(out, "{} {}", mf.get_name(), m.get_gauge().get_value());
        }
    }
    out
}
