use crate::health::ServiceState;
use crate::state::Snapshot;

const STYLE: &str = r#"
    body {
      font-family: system-ui, -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif;
      background: #0f172a;
      color: #e5e7eb;
      margin: 0;
      padding: 0;
    }
    .wrap { max-width: 960px; margin: 0 auto; padding: 1.5rem; }
    h1 { margin-bottom: 0.5rem; }
    .grid {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(260px, 1fr));
      gap: 1rem;
      margin-top: 1rem;
    }
    .card {
      background: #111827;
      border-radius: 0.75rem;
      padding: 1rem 1.25rem;
      box-shadow: 0 10px 25px rgba(0,0,0,0.4);
      border: 1px solid #1f2937;
    }
    .card h2 { margin-top: 0; font-size: 1.05rem; margin-bottom: 0.75rem; }
    .kv { display: flex; justify-content: space-between; margin: 0.2rem 0; font-size: 0.95rem; }
    .label { color: #9ca3af; }
    .value { font-weight: 500; }
    .status-ok { color: #22c55e; font-weight: 600; }
    .status-down { color: #ef4444; font-weight: 600; }
    .status-unknown { color: #f97316; font-weight: 600; }
    .footer { margin-top: 1rem; font-size: 0.8rem; color: #6b7280; }
    a { color: #60a5fa; }
"#;

const NA: &str = "N/A";

pub fn render_dashboard(snapshot: &Snapshot) -> String {
    let sys = snapshot.system.as_ref();
    let pihole = snapshot.pihole.as_ref();
    let pivpn = snapshot.pivpn.as_ref();

    let cpu = format_percent(sys.map(|s| s.cpu_percent));
    let load = match sys {
        Some(s) => format!("{:.2} / {:.2} / {:.2}", s.load_1, s.load_5, s.load_15),
        None => format!("{NA} / {NA} / {NA}"),
    };
    let mem = format_percent(sys.map(|s| s.mem_percent));
    let disk = format_percent(sys.map(|s| s.disk_percent));
    let temp = sys
        .and_then(|s| s.temp_c)
        .map(|t| format!("{t:.1} °C"))
        .unwrap_or_else(|| NA.to_string());
    let uptime = format_uptime(sys.and_then(|s| s.uptime_seconds));

    let pihole_state = ServiceState::of(pihole);
    let pivpn_state = ServiceState::of(pivpn);
    let stat = |key: &str| {
        pihole
            .and_then(|p| p.stats.get(key).copied().flatten())
            .map(format_number)
            .unwrap_or_else(|| NA.to_string())
    };
    let queries = stat("dns_queries_today");
    let blocked = stat("ads_blocked_today");
    let blocked_pct = stat("ads_percentage_today");
    let clients = pivpn
        .and_then(|p| p.connected_clients)
        .map(|c| c.to_string())
        .unwrap_or_else(|| NA.to_string());

    let last_update = sys.map(|s| s.timestamp.as_str()).unwrap_or("never");
    let last_error = snapshot
        .last_error
        .as_deref()
        .map(|e| format!(" • Last error: {}", escape_html(e)))
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8">
  <title>Pi Self Monitor</title>
  <style>{STYLE}</style>
</head>
<body>
<div class="wrap">
  <h1>Pi Self Monitor</h1>
  <div class="footer">
    Last update: {last_update} • Uptime: {uptime}{last_error}
    <br>
    API endpoints: <a href="/health">/health</a> • <a href="/metrics">/metrics</a>
  </div>
  <div class="grid">
    <div class="card">
      <h2>System</h2>
      <div class="kv"><span class="label">CPU usage</span><span class="value">{cpu}</span></div>
      <div class="kv"><span class="label">Load (1/5/15)</span><span class="value">{load}</span></div>
      <div class="kv"><span class="label">Memory</span><span class="value">{mem}</span></div>
      <div class="kv"><span class="label">Disk /</span><span class="value">{disk}</span></div>
      <div class="kv"><span class="label">Temperature</span><span class="value">{temp}</span></div>
    </div>
    <div class="card">
      <h2>Pi-hole</h2>
      <div class="kv"><span class="label">Service</span><span class="value {pihole_class}">{pihole_label}</span></div>
      <div class="kv"><span class="label">Queries today</span><span class="value">{queries}</span></div>
      <div class="kv"><span class="label">Blocked</span><span class="value">{blocked}</span></div>
      <div class="kv"><span class="label">Blocked %</span><span class="value">{blocked_pct}</span></div>
    </div>
    <div class="card">
      <h2>PiVPN</h2>
      <div class="kv"><span class="label">Service</span><span class="value {pivpn_class}">{pivpn_label}</span></div>
      <div class="kv"><span class="label">Connected clients</span><span class="value">{clients}</span></div>
    </div>
  </div>
</div>
</body>
</html>
"#,
        last_update = escape_html(last_update),
        pihole_class = pihole_state.css_class(),
        pihole_label = pihole_state.as_str(),
        pivpn_class = pivpn_state.css_class(),
        pivpn_label = pivpn_state.as_str(),
    )
}

fn format_percent(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.1}%")).unwrap_or_else(|| NA.to_string())
}

pub fn format_uptime(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds else {
        return NA.to_string();
    };
    let total = seconds.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let mins = (total % 3_600) / 60;
    format!("{days}d {hours}h {mins}m")
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v:.2}")
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ServiceStatus, SystemRecord};
    use std::collections::BTreeMap;

    #[test]
    fn uptime_format() {
        assert_eq!(format_uptime(None), "N/A");
        assert_eq!(format_uptime(Some(0.0)), "0d 0h 0m");
        assert_eq!(format_uptime(Some(90_061.9)), "1d 1h 1m");
        assert_eq!(format_uptime(Some(3_599.0)), "0d 0h 59m");
    }

    #[test]
    fn empty_snapshot_renders_placeholders() {
        let html = render_dashboard(&Snapshot::default());
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.contains(r#"<span class="value">N/A</span>"#));
        assert!(!html.contains("0.0%"));
        assert!(html.contains("Last update: never"));
        assert!(html.contains(r#"class="value status-unknown">UNKNOWN"#));
        assert!(!html.contains("Last error"));
    }

    #[test]
    fn populated_snapshot_renders_values() {
        let mut stats = BTreeMap::new();
        stats.insert("dns_queries_today".to_string(), Some(12345.0));
        stats.insert("ads_blocked_today".to_string(), None);
        stats.insert("ads_percentage_today".to_string(), Some(5.4871));
        let snap = Snapshot {
            system: Some(SystemRecord {
                timestamp: "2026-10-19T08:00:00Z".to_string(),
                cpu_percent: 12.34,
                load_1: 0.5,
                load_5: 0.25,
                load_15: 0.125,
                mem_total: 1000,
                mem_used: 420,
                mem_percent: 42.0,
                disk_total: 100,
                disk_used: 77,
                disk_percent: 77.0,
                temp_c: Some(51.26),
                uptime_seconds: Some(90_061.0),
            }),
            pihole: Some(ServiceStatus {
                service_ok: true,
                stats,
                connected_clients: None,
            }),
            pivpn: Some(ServiceStatus {
                service_ok: false,
                stats: BTreeMap::new(),
                connected_clients: Some(4),
            }),
            last_error: Some("pivpn collector panicked: <boom>".to_string()),
        };
        let html = render_dashboard(&snap);

        assert!(html.contains(">12.3%<"));
        assert!(html.contains(">0.50 / 0.25 / 0.12<") || html.contains(">0.50 / 0.25 / 0.13<"));
        assert!(html.contains(">42.0%<"));
        assert!(html.contains(">51.3 °C<"));
        assert!(html.contains("Uptime: 1d 1h 1m"));
        assert!(html.contains(r#"class="value status-ok">OK"#));
        assert!(html.contains(r#"class="value status-down">DOWN"#));
        assert!(html.contains(">12345<"));
        assert!(html.contains(">5.49<"));
        assert!(html.contains(">4<"));
        assert!(html.contains("Last error: pivpn collector panicked: &lt;boom&gt;"));
    }
}
