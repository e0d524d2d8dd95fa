use crate::config::SystemConfig;
use crate::state::SystemRecord;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use sysinfo::{CpuExt, DiskExt, System, SystemExt};
use tracing::debug;

/// Raw sensor values above this are milli-degrees Celsius.
const MILLI_CELSIUS_THRESHOLD: f64 = 200.0;

// Primed so the first CPU reading has a baseline.
pub fn new_sampler() -> System {
    let mut system = System::new();
    system.refresh_cpu();
    system.refresh_disks_list();
    system
}

pub fn collect_system(system: &mut System, cfg: &SystemConfig) -> SystemRecord {
    system.refresh_cpu();
    system.refresh_memory();
    system.refresh_disks();

    let cpu_percent = (system.global_cpu_info().cpu_usage() as f64).clamp(0.0, 100.0);
    let load = system.load_average();

    let mem_total = system.total_memory();
    let mem_used = mem_total.saturating_sub(system.available_memory());
    let mem_percent = percent(mem_used, mem_total);

    let (disk_total, disk_used) = disk_usage(system, &cfg.disk_mount);
    let disk_percent = percent(disk_used, disk_total);

    let temp_c = read_temperature(&cfg.temperature_paths);
    let uptime_seconds = read_uptime(&cfg.uptime_path).or_else(|| {
        let counter = system.uptime();
        (counter > 0).then_some(counter as f64)
    });

    SystemRecord {
        timestamp: humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
        cpu_percent,
        load_1: load.one.max(0.0),
        load_5: load.five.max(0.0),
        load_15: load.fifteen.max(0.0),
        mem_total,
        mem_used,
        mem_percent,
        disk_total,
        disk_used,
        disk_percent,
        temp_c,
        uptime_seconds,
    }
}

fn disk_usage(system: &System, mount: &Path) -> (u64, u64) {
    match system.disks().iter().find(|d| d.mount_point() == mount) {
        Some(disk) => {
            let total = disk.total_space();
            (total, total.saturating_sub(disk.available_space()))
        }
        None => {
            debug!(mount = %mount.display(), "mount point not found");
            (0, 0)
        }
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64) * 100.0
    }
}

/// First path that holds a number wins.
pub fn read_temperature(paths: &[PathBuf]) -> Option<f64> {
    paths.iter().find_map(|path| {
        let raw = fs::read_to_string(path).ok()?;
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(normalize_temperature(v)),
            _ => {
                debug!(path = %path.display(), "unparseable temperature reading");
                None
            }
        }
    })
}

pub fn normalize_temperature(raw: f64) -> f64 {
    if raw > MILLI_CELSIUS_THRESHOLD {
        raw / 1000.0
    } else {
        raw
    }
}

pub fn read_uptime(path: &Path) -> Option<f64> {
    let raw = fs::read_to_string(path).ok()?;
    raw.split_whitespace()
        .next()?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
